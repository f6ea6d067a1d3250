use chrono::{DateTime, Duration, FixedOffset};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{parse_reading, Average, Gradient, SensorError};
use crate::domain::{ClimateSensors, HvacPreset, TrendReading};

const DEFAULT_TREND_MAX_AGE_SECONDS: i64 = 7200;

/// Static wiring of the house climate sensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseSensorsConfig {
    pub indoor_sensors: Vec<String>,
    pub outdoor_sensors: Vec<String>,
    pub set_point: f64,
    /// Allowed deviation when the house is warm.
    pub tolerance_min: f64,
    /// Allowed deviation when the house is cold.
    pub tolerance_max: f64,
    pub trend_max_age_seconds: i64,
    pub trend_max_samples: usize,
}

impl Default for HouseSensorsConfig {
    fn default() -> Self {
        Self {
            indoor_sensors: vec![],
            outdoor_sensors: vec![],
            set_point: 21.0,
            tolerance_min: 0.2,
            tolerance_max: 0.2,
            trend_max_age_seconds: DEFAULT_TREND_MAX_AGE_SECONDS,
            trend_max_samples: 20,
        }
    }
}

#[derive(Debug)]
struct HouseState {
    indoors: Average,
    outdoors: Average,
    indoor_trend: Gradient,
    outdoor_trend: Gradient,
    set_point: f64,
    tolerances: (f64, f64),
    preset: HvacPreset,
    addon_running: bool,
}

/// Indoor and outdoor aggregates for one house.
#[derive(Debug)]
pub struct HouseSensors {
    state: RwLock<HouseState>,
}

impl HouseSensors {
    pub fn new(config: &HouseSensorsConfig) -> Self {
        let max_age = Duration::try_seconds(config.trend_max_age_seconds.max(0))
            .unwrap_or_else(|| {
                warn!(
                    seconds = config.trend_max_age_seconds,
                    "trend window out of range, using default"
                );
                Duration::seconds(DEFAULT_TREND_MAX_AGE_SECONDS)
            });
        Self {
            state: RwLock::new(HouseState {
                indoors: Average::new(config.indoor_sensors.iter().cloned()),
                outdoors: Average::new(config.outdoor_sensors.iter().cloned()),
                indoor_trend: Gradient::new(max_age, config.trend_max_samples),
                outdoor_trend: Gradient::new(max_age, config.trend_max_samples),
                set_point: config.set_point,
                tolerances: (config.tolerance_min, config.tolerance_max),
                preset: HvacPreset::default(),
                addon_running: false,
            }),
        }
    }

    /// Route a raw state change to the aggregate tracking `entity`. The
    /// trend is fed with the new average once the average is published.
    pub fn update_sensor(
        &self,
        entity: &str,
        raw: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<(), SensorError> {
        let value = match parse_reading(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(entity, raw, "ignoring sensor update");
                return Err(e);
            }
        };

        let mut state = self.state.write();
        if state.indoors.tracks(entity) {
            state.indoors.set_value(entity, value)?;
            let avg = state.indoors.value();
            if state.indoors.initialized_percentage() > 0.2 {
                state.indoor_trend.add_reading(avg, now);
            }
        } else if state.outdoors.tracks(entity) {
            state.outdoors.set_value(entity, value)?;
            let avg = state.outdoors.value();
            if state.outdoors.initialized_percentage() > 0.2 {
                state.outdoor_trend.add_reading(avg, now);
            }
        } else {
            return Err(SensorError::UnknownSensor(entity.to_string()));
        }
        debug!(entity, value, "sensor updated");
        Ok(())
    }

    pub fn set_set_point(&self, set_point: f64) {
        if set_point.is_finite() {
            self.state.write().set_point = set_point;
        }
    }

    pub fn set_preset(&self, preset: HvacPreset) {
        self.state.write().preset = preset;
    }

    pub fn set_addon_running(&self, running: bool) {
        self.state.write().addon_running = running;
    }

    pub fn outdoor_trend(&self) -> TrendReading {
        self.state.read().outdoor_trend.reading()
    }
}

impl ClimateSensors for HouseSensors {
    fn outdoor_average(&self) -> f64 {
        self.state.read().outdoors.value()
    }

    fn indoor_average(&self) -> f64 {
        self.state.read().indoors.value()
    }

    fn indoor_min(&self) -> f64 {
        self.state.read().indoors.min()
    }

    fn set_point(&self) -> f64 {
        self.state.read().set_point
    }

    fn tolerances(&self) -> (f64, f64) {
        self.state.read().tolerances
    }

    fn indoor_trend(&self, now: DateTime<FixedOffset>) -> TrendReading {
        self.state.write().indoor_trend.reading_at(now)
    }

    fn addon_running(&self) -> bool {
        self.state.read().addon_running
    }

    fn preset(&self) -> HvacPreset {
        self.state.read().preset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 8, 0, 0)
            .unwrap()
    }

    fn house() -> HouseSensors {
        HouseSensors::new(&HouseSensorsConfig {
            indoor_sensors: vec!["sensor.hall".into(), "sensor.kitchen".into()],
            outdoor_sensors: vec!["sensor.outdoor".into()],
            ..Default::default()
        })
    }

    #[test]
    fn test_updates_are_routed() {
        let house = house();
        house.update_sensor("sensor.hall", "20.0", now()).unwrap();
        house.update_sensor("sensor.kitchen", "21.0", now()).unwrap();
        house.update_sensor("sensor.outdoor", "-3.5", now()).unwrap();

        assert_eq!(house.indoor_average(), 20.5);
        assert_eq!(house.indoor_min(), 20.0);
        assert_eq!(house.outdoor_average(), -3.5);
        assert!((house.temp_diff() + 0.5).abs() < 1e-9);
        assert_eq!(house.min_indoors_diff(), -1.0);
    }

    #[test]
    fn test_bad_updates_are_rejected() {
        let house = house();
        assert!(house.update_sensor("sensor.garage", "20.0", now()).is_err());
        assert!(house.update_sensor("sensor.hall", "unknown", now()).is_err());
        assert_eq!(house.indoor_average(), 0.0);
    }

    #[test]
    fn test_indoor_trend_follows_average() {
        let house = house();
        house.update_sensor("sensor.hall", "20.0", now()).unwrap();
        house
            .update_sensor("sensor.hall", "20.5", now() + Duration::minutes(30))
            .unwrap();

        let trend = house.indoor_trend(now() + Duration::minutes(30));
        assert_eq!(trend.samples, 2);
        assert!((trend.gradient - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_indoor_trend_goes_stale() {
        let house = HouseSensors::new(&HouseSensorsConfig {
            indoor_sensors: vec!["sensor.hall".into()],
            trend_max_age_seconds: 3600,
            trend_max_samples: 4,
            ..Default::default()
        });
        for (i, raw) in ["20.0", "20.2", "20.4", "20.6"].iter().enumerate() {
            house
                .update_sensor("sensor.hall", raw, now() + Duration::minutes(10 * i as i64))
                .unwrap();
        }

        let fresh = house.indoor_trend(now() + Duration::minutes(30));
        assert_eq!(fresh.samples, 4);
        assert!(fresh.is_clean);

        // no reports for hours, the old samples no longer back a trend
        let stale = house.indoor_trend(now() + Duration::hours(15));
        assert_eq!(stale.samples, 0);
        assert!(!stale.is_clean);
        assert_eq!(stale.gradient, 0.0);
    }

    #[test]
    fn test_oversized_trend_window_falls_back() {
        let house = HouseSensors::new(&HouseSensorsConfig {
            indoor_sensors: vec!["sensor.hall".into()],
            trend_max_age_seconds: i64::MAX,
            ..Default::default()
        });
        house.update_sensor("sensor.hall", "20.0", now()).unwrap();

        assert_eq!(house.indoor_trend(now() + Duration::hours(3)).samples, 0);
    }
}
