use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::HvacPreset;

/// Snapshot of a temperature trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    /// Slope in °C per hour.
    pub gradient: f64,
    pub samples: usize,
    /// True when enough fresh samples back the gradient.
    pub is_clean: bool,
}

/// Read-only view of the house climate used by the house heater.
pub trait ClimateSensors: Send + Sync {
    fn outdoor_average(&self) -> f64;
    fn indoor_average(&self) -> f64;
    /// Coldest indoor sensor.
    fn indoor_min(&self) -> f64;
    /// Target indoor temperature after preset adjustments.
    fn set_point(&self) -> f64;
    /// Allowed deviation from the set-point as `(min, max)` in °C. `min`
    /// applies when the house is warm, `max` when it is cold.
    fn tolerances(&self) -> (f64, f64);
    /// Indoor trend as of `now`; samples older than the trend window no
    /// longer count.
    fn indoor_trend(&self, now: DateTime<FixedOffset>) -> TrendReading;
    /// Whether the electrical add-on heater is currently running.
    fn addon_running(&self) -> bool;
    fn preset(&self) -> HvacPreset;

    /// Indoor average minus set-point; positive when the house is warm.
    fn temp_diff(&self) -> f64 {
        self.indoor_average() - self.set_point()
    }

    fn min_indoors_diff(&self) -> f64 {
        self.indoor_min() - self.set_point()
    }
}
