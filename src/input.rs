use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{EvChargingSnapshot, ForecastTemperature, HvacPreset};
use crate::prices::PriceUpdate;

/// Snapshot of everything the host feeds in, as written by the host
/// integration to a JSON file. Missing sections leave the current values
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInputs {
    #[serde(default)]
    pub prices: Option<PriceUpdate>,
    /// Entity id -> raw state string.
    #[serde(default)]
    pub sensors: BTreeMap<String, String>,
    #[serde(default)]
    pub water_temperature: Option<String>,
    #[serde(default)]
    pub forecast: Vec<ForecastTemperature>,
    /// `None` means no EV-charging integration.
    #[serde(default)]
    pub ev_charging: Option<EvChargingSnapshot>,
    #[serde(default)]
    pub preset: Option<HvacPreset>,
    #[serde(default)]
    pub set_point: Option<f64>,
    #[serde(default)]
    pub addon_running: bool,
    #[serde(default)]
    pub lower_offset_requested: bool,
}

impl HostInputs {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid host input snapshot")
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading host inputs from {}", path.display()))?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_snapshot() {
        let inputs = HostInputs::from_json(
            r#"{
                "prices": { "today": [1.0, 2.0], "state": 1.5 },
                "sensors": { "sensor.hall": "21.3" },
                "preset": "eco"
            }"#,
        )
        .unwrap();

        let prices = inputs.prices.unwrap();
        assert_eq!(prices.today, vec![1.0, 2.0]);
        assert!(prices.tomorrow.is_empty());
        assert_eq!(inputs.sensors["sensor.hall"], "21.3");
        assert_eq!(inputs.preset, Some(HvacPreset::Eco));
        assert!(inputs.ev_charging.is_none());
        assert!(!inputs.addon_running);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(HostInputs::from_json("not json").is_err());
    }
}
