use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::debug;

use super::{parse_reading, SensorError};

/// Share of sensors that must have reported before an average is published.
const MIN_INITIALIZED_SHARE: f64 = 0.2;

/// Rolling aggregate over a fixed set of named temperature sensors.
#[derive(Debug, Clone, Default)]
pub struct Average {
    values: BTreeMap<String, Option<f64>>,
    value: f64,
    median: f64,
    min: f64,
    max: f64,
}

impl Average {
    pub fn new<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: entities.into_iter().map(|e| (e.into(), None)).collect(),
            ..Default::default()
        }
    }

    pub fn tracks(&self, entity: &str) -> bool {
        self.values.contains_key(entity)
    }

    pub fn sensors_count(&self) -> usize {
        self.values.len()
    }

    pub fn initialized_percentage(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.values().filter(|v| v.is_some()).count() as f64 / self.values.len() as f64
    }

    /// Record a raw state string for one sensor.
    pub fn update_value(&mut self, entity: &str, raw: &str) -> Result<(), SensorError> {
        let value = parse_reading(raw)?;
        self.set_value(entity, value)
    }

    pub fn set_value(&mut self, entity: &str, value: f64) -> Result<(), SensorError> {
        if !value.is_finite() {
            return Err(SensorError::NonFinite(entity.to_string()));
        }
        let slot = self
            .values
            .get_mut(entity)
            .ok_or_else(|| SensorError::UnknownSensor(entity.to_string()))?;
        *slot = Some(value);
        self.recalculate();
        Ok(())
    }

    fn recalculate(&mut self) {
        if self.initialized_percentage() <= MIN_INITIALIZED_SHARE {
            debug!(
                initialized = self.initialized_percentage(),
                "too few sensors reported to calculate an average"
            );
            self.value = 0.0;
            return;
        }

        let sorted: Vec<f64> = self
            .values
            .values()
            .flatten()
            .copied()
            .sorted_by(f64::total_cmp)
            .collect();
        let n = sorted.len();
        self.min = sorted[0];
        self.max = sorted[n - 1];
        self.value = sorted.iter().sum::<f64>() / n as f64;
        self.median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn all_values(&self) -> Vec<f64> {
        self.values.values().flatten().copied().collect()
    }
}
