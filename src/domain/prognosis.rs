//! Weather prognosis as consumed by the offset engine.
//!
//! The engine never talks to a weather service directly; it reads a
//! sequence of forecast deltas through [`PrognosisProvider`].

use chrono::{DateTime, FixedOffset};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One forecast entry: the expected outdoor temperature change at
/// `timestamp` relative to the temperature measured now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrognosisPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub delta_temp_from_now: f64,
    /// Hours between the moment the forecast was taken and `timestamp`.
    pub time_delta_hours: f64,
}

/// Absolute forecast temperature, as delivered by a weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTemperature {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature_c: f64,
}

#[cfg_attr(test, mockall::automock)]
pub trait PrognosisProvider: Send + Sync {
    /// Latest known prognosis, ordered by timestamp.
    fn prognosis(&self) -> Vec<PrognosisPoint>;
}

/// Prognosis held in memory and replaced by the host when a new forecast
/// arrives.
#[derive(Debug, Default)]
pub struct StaticPrognosis {
    points: RwLock<Vec<PrognosisPoint>>,
}

impl StaticPrognosis {
    pub fn new(points: Vec<PrognosisPoint>) -> Self {
        Self {
            points: RwLock::new(points),
        }
    }

    pub fn replace(&self, points: Vec<PrognosisPoint>) {
        *self.points.write() = points;
    }

    /// Rebuild the prognosis from absolute forecast temperatures relative to
    /// the current outdoor average. Entries in the past are dropped.
    pub fn update_from_forecast(
        &self,
        now: DateTime<FixedOffset>,
        current_outdoor: f64,
        forecast: &[ForecastTemperature],
    ) {
        let points = prognosis_from_forecast(now, current_outdoor, forecast);
        debug!(points = points.len(), "weather prognosis updated");
        self.replace(points);
    }
}

impl PrognosisProvider for StaticPrognosis {
    fn prognosis(&self) -> Vec<PrognosisPoint> {
        self.points.read().clone()
    }
}

pub fn prognosis_from_forecast(
    now: DateTime<FixedOffset>,
    current_outdoor: f64,
    forecast: &[ForecastTemperature],
) -> Vec<PrognosisPoint> {
    forecast
        .iter()
        .filter(|f| f.timestamp >= now && f.temperature_c.is_finite())
        .map(|f| PrognosisPoint {
            timestamp: f.timestamp,
            delta_temp_from_now: ((f.temperature_c - current_outdoor) * 10.0).round() / 10.0,
            time_delta_hours: (f.timestamp - now).num_minutes() as f64 / 60.0,
        })
        .collect()
}
