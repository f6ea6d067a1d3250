use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ============================================================================
// Demand
// ============================================================================

/// Coarse classification of how urgently a heater needs to run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumString,
)]
pub enum Demand {
    #[default]
    NoDemand,
    LowDemand,
    MediumDemand,
    HighDemand,
}

impl Demand {
    /// Classify a water temperature (°C).
    ///
    /// Readings at or outside the open range (0, 100) are treated as sensor
    /// garbage and yield `NoDemand`.
    pub fn from_water_temperature(temp: f64) -> Self {
        if !(temp > 0.0 && temp < 100.0) {
            return Demand::NoDemand;
        }
        if temp >= 42.0 {
            Demand::NoDemand
        } else if temp > 35.0 {
            Demand::LowDemand
        } else if temp >= 25.0 {
            Demand::MediumDemand
        } else {
            Demand::HighDemand
        }
    }

    /// Classify the indoor deviation from the set-point (°C, negative when cold).
    pub fn from_indoor_deviation(temp_diff: f64) -> Self {
        if temp_diff <= -1.0 {
            Demand::HighDemand
        } else if temp_diff <= -0.3 {
            Demand::MediumDemand
        } else if temp_diff < 0.5 {
            Demand::LowDemand
        } else {
            Demand::NoDemand
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Household preset as selected on the climate entity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HvacPreset {
    #[default]
    Normal,
    Eco,
    Away,
    ExtendedAway,
}

impl HvacPreset {
    /// Minutes of boosting needed to bring the water back to target for a
    /// given demand under this preset.
    pub fn demand_minutes(&self, demand: Demand) -> u32 {
        match (self, demand) {
            (_, Demand::NoDemand) => 0,
            (HvacPreset::Normal, Demand::LowDemand) => 30,
            (HvacPreset::Normal, Demand::MediumDemand) => 60,
            (HvacPreset::Normal, Demand::HighDemand) => 90,
            (HvacPreset::Eco, Demand::LowDemand) => 20,
            (HvacPreset::Eco, Demand::MediumDemand) => 45,
            (HvacPreset::Eco, Demand::HighDemand) => 70,
            (HvacPreset::Away | HvacPreset::ExtendedAway, Demand::LowDemand) => 0,
            (HvacPreset::Away | HvacPreset::ExtendedAway, Demand::MediumDemand) => 30,
            (HvacPreset::Away | HvacPreset::ExtendedAway, Demand::HighDemand) => 60,
        }
    }

    pub fn is_away(&self) -> bool {
        matches!(self, HvacPreset::Away | HvacPreset::ExtendedAway)
    }
}

// ============================================================================
// Offset adjustments
// ============================================================================

/// Named auxiliary corrections applied on top of the price offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum OffsetAdjustment {
    PeakHour,
    TemporarilyLowerOffset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(20.0, Demand::HighDemand)]
    #[case(24.9, Demand::HighDemand)]
    #[case(25.0, Demand::MediumDemand)]
    #[case(35.0, Demand::MediumDemand)]
    #[case(35.5, Demand::LowDemand)]
    #[case(41.9, Demand::LowDemand)]
    #[case(42.0, Demand::NoDemand)]
    #[case(60.0, Demand::NoDemand)]
    #[case(0.0, Demand::NoDemand)]
    #[case(-5.0, Demand::NoDemand)]
    #[case(100.0, Demand::NoDemand)]
    #[case(f64::NAN, Demand::NoDemand)]
    fn test_water_demand_classification(#[case] temp: f64, #[case] expected: Demand) {
        assert_eq!(Demand::from_water_temperature(temp), expected);
    }

    #[rstest]
    #[case(-1.5, Demand::HighDemand)]
    #[case(-0.5, Demand::MediumDemand)]
    #[case(0.0, Demand::LowDemand)]
    #[case(0.8, Demand::NoDemand)]
    fn test_indoor_demand_classification(#[case] diff: f64, #[case] expected: Demand) {
        assert_eq!(Demand::from_indoor_deviation(diff), expected);
    }

    #[test]
    fn test_demand_minutes_grow_with_demand() {
        for preset in [HvacPreset::Normal, HvacPreset::Eco, HvacPreset::Away] {
            assert_eq!(preset.demand_minutes(Demand::NoDemand), 0);
            assert!(
                preset.demand_minutes(Demand::HighDemand)
                    >= preset.demand_minutes(Demand::MediumDemand)
            );
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(HvacPreset::from_str("away").unwrap(), HvacPreset::Away);
        assert_eq!(HvacPreset::from_str("Extended_Away").unwrap(), HvacPreset::ExtendedAway);
        assert!(HvacPreset::ExtendedAway.is_away());
        assert!(!HvacPreset::Eco.is_away());
    }
}
