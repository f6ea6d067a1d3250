use anyhow::Result;
use chrono::Duration;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

use crate::controller::house_heater::HouseHeaterOptions;
use crate::controller::water_heater::WaterOptions;
use crate::sensors::HouseSensorsConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub heating: HeatingConfig,
    pub water: WaterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub tick_seconds: u64,
    /// JSON snapshot written by the host integration.
    pub input_path: PathBuf,
    pub demand_update_seconds: i64,
    pub event_capacity: usize,
}

impl ControllerConfig {
    /// How long a heater's demand is cached.
    pub fn demand_update(&self) -> Duration {
        seconds(
            "controller.demand_update_seconds",
            self.demand_update_seconds,
            Duration::minutes(1),
        )
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 30,
            input_path: PathBuf::from("data/host_inputs.json"),
            demand_update_seconds: 60,
            event_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ToleranceConfig {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatingConfig {
    /// Largest offset magnitude in either direction.
    pub tolerance: i32,
    pub outdoor_temp_stop_heating: f64,
    pub set_point: f64,
    pub indoor_tolerances: ToleranceConfig,
    pub breach_wait_seconds: i64,
    pub indoor_sensors: Vec<String>,
    pub outdoor_sensors: Vec<String>,
    pub trend_max_age_seconds: i64,
    pub trend_max_samples: usize,
}

impl Default for HeatingConfig {
    fn default() -> Self {
        Self {
            tolerance: 3,
            outdoor_temp_stop_heating: 15.0,
            set_point: 21.0,
            indoor_tolerances: ToleranceConfig { min: 0.2, max: 0.3 },
            breach_wait_seconds: 900,
            indoor_sensors: vec![],
            outdoor_sensors: vec![],
            trend_max_age_seconds: 7200,
            trend_max_samples: 20,
        }
    }
}

impl HeatingConfig {
    pub fn house_heater(&self) -> HouseHeaterOptions {
        HouseHeaterOptions {
            outdoor_temp_stop_heating: self.outdoor_temp_stop_heating,
            breach_wait: seconds(
                "heating.breach_wait_seconds",
                self.breach_wait_seconds,
                HouseHeaterOptions::default().breach_wait,
            ),
        }
    }

    pub fn house_sensors(&self) -> HouseSensorsConfig {
        HouseSensorsConfig {
            indoor_sensors: self.indoor_sensors.clone(),
            outdoor_sensors: self.outdoor_sensors.clone(),
            set_point: self.set_point,
            tolerance_min: self.indoor_tolerances.min,
            tolerance_max: self.indoor_tolerances.max,
            trend_max_age_seconds: self.trend_max_age_seconds,
            trend_max_samples: self.trend_max_samples,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub non_boost_hours: Vec<u32>,
    pub boost_timeout_seconds: i64,
    pub wait_timer_seconds: i64,
    pub target_temp: f64,
    pub low_temp_threshold: f64,
    pub away_low_temp_threshold: f64,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            non_boost_hours: vec![],
            boost_timeout_seconds: 1800,
            wait_timer_seconds: 2700,
            target_temp: 47.0,
            low_temp_threshold: 40.0,
            away_low_temp_threshold: 30.0,
        }
    }
}

impl WaterConfig {
    pub fn options(&self) -> WaterOptions {
        let non_boost_hours: HashSet<u32> = self
            .non_boost_hours
            .iter()
            .copied()
            .filter(|h| {
                if *h > 23 {
                    warn!(hour = *h, "ignoring invalid non-boost hour");
                }
                *h <= 23
            })
            .collect();
        let defaults = WaterOptions::default();
        WaterOptions {
            non_boost_hours,
            boost_timeout: seconds(
                "water.boost_timeout_seconds",
                self.boost_timeout_seconds,
                defaults.boost_timeout,
            ),
            wait_timer: seconds(
                "water.wait_timer_seconds",
                self.wait_timer_seconds,
                defaults.wait_timer,
            ),
            target_temp: self.target_temp,
            low_temp_threshold: self.low_temp_threshold,
            away_low_temp_threshold: self.away_low_temp_threshold,
        }
    }
}

/// Configured seconds as a duration. Negative values count as zero; values
/// chrono cannot represent fall back to `fallback`.
fn seconds(setting: &'static str, value: i64, fallback: Duration) -> Duration {
    Duration::try_seconds(value.max(0)).unwrap_or_else(|| {
        warn!(setting, value, "duration out of range, using default");
        fallback
    })
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("HVAC__").split("__"))
    }

    pub fn load() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }
}
