use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use strum::Display;

use crate::controller::wait_timer::WaitTimer;

/// Where the boost cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BoostState {
    Idle,
    PreHeating,
    Boosting,
}

/// Boost bookkeeping owned by the water heater.
#[derive(Debug, Clone)]
pub struct WaterBoosterModel {
    pub try_heat_water: bool,
    /// Runs while boosting; the boost ends when it times out.
    pub heat_water_timer: WaitTimer,
    pub pre_heating: bool,
    pub latest_boost_call: Option<DateTime<FixedOffset>>,
    /// `None` means no boost is needed.
    pub next_water_heater_start: Option<DateTime<FixedOffset>>,
}

impl WaterBoosterModel {
    pub fn new(boost_timeout: Duration) -> Self {
        Self {
            try_heat_water: false,
            heat_water_timer: WaitTimer::new(boost_timeout),
            pre_heating: false,
            latest_boost_call: None,
            next_water_heater_start: None,
        }
    }

    /// Boosting wins over pre-heating.
    pub fn state(&self) -> BoostState {
        if self.try_heat_water {
            BoostState::Boosting
        } else if self.pre_heating {
            BoostState::PreHeating
        } else {
            BoostState::Idle
        }
    }

    pub(super) fn start_boost(&mut self, now: DateTime<FixedOffset>, timeout: Option<Duration>) {
        self.try_heat_water = true;
        self.pre_heating = false;
        self.latest_boost_call = Some(now);
        match timeout {
            Some(timeout) => self.heat_water_timer.update_with(now, timeout),
            None => self.heat_water_timer.update(now),
        }
    }

    pub(super) fn stop_boost(&mut self) {
        self.try_heat_water = false;
        self.pre_heating = false;
        self.heat_water_timer.reset();
    }
}
