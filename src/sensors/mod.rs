//! Aggregation of raw temperature readings into the values the heaters
//! consume: multi-sensor averages and time-windowed trends.

pub mod average;
pub mod gradient;
pub mod house;

pub use average::Average;
pub use gradient::Gradient;
pub use house::{HouseSensors, HouseSensorsConfig};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SensorError {
    #[error("unparseable sensor value: {0:?}")]
    Unparseable(String),
    #[error("non-finite reading from {0}")]
    NonFinite(String),
    #[error("unknown sensor {0}")]
    UnknownSensor(String),
}

/// Parse a state string as published by the host (e.g. `"21.5"`).
pub fn parse_reading(raw: &str) -> Result<f64, SensorError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SensorError::Unparseable(raw.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SensorError::Unparseable(raw.to_string()))
    }
}
