//! # Water Heater
//!
//! Decides when the hot-water tank gets a boost. Each cycle walks the
//! `Idle -> PreHeating -> Boosting -> Idle` machine:
//!
//! - the cheapest hour of the known horizon boosts directly for an hour
//! - otherwise pre-heating starts once the planned start has been reached
//! - pre-heating escalates to boosting when the wait timer allows it
//! - a boost ends on its own timeout or when the power peak is threatened
//!
//! The cheapest-hour path is evaluated before the planner.

pub mod model;
pub mod next_start;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Timelike};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::events::{EventBus, HvacEvent};
use super::heater::Heater;
use super::wait_timer::WaitTimer;
use crate::domain::{ClimateSensors, Demand, EvChargingFacade};
use crate::offset::OffsetView;
use crate::prices::PriceSource;
use crate::sensors::{parse_reading, Gradient};

pub use model::{BoostState, WaterBoosterModel};
pub use next_start::{is_water_peak, next_predicted_demand, DemandQuery};

/// Length of a boost started in the cheapest hour, seconds.
const PEAK_BOOST_SECONDS: i64 = 3600;
/// Announce a planned start this many minutes before it.
const UPCOMING_WARNING_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct WaterOptions {
    /// Hours of day (0..23) in which no boost may be planned.
    pub non_boost_hours: HashSet<u32>,
    pub boost_timeout: Duration,
    /// Pause after a boost before the next may start.
    pub wait_timer: Duration,
    pub target_temp: f64,
    pub low_temp_threshold: f64,
    pub away_low_temp_threshold: f64,
}

impl Default for WaterOptions {
    fn default() -> Self {
        Self {
            non_boost_hours: HashSet::new(),
            boost_timeout: Duration::minutes(30),
            wait_timer: Duration::minutes(45),
            target_temp: 47.0,
            low_temp_threshold: 40.0,
            away_low_temp_threshold: 30.0,
        }
    }
}

#[derive(Debug)]
struct WaterState {
    current_temp: Option<f64>,
    demand: Demand,
    trend: Gradient,
    model: WaterBoosterModel,
    wait_timer: WaitTimer,
    warned_for: Option<DateTime<FixedOffset>>,
}

pub struct WaterHeater {
    state: Mutex<WaterState>,
    prices: Arc<dyn PriceSource>,
    offsets: Arc<dyn OffsetView>,
    ev_charging: Arc<dyn EvChargingFacade>,
    climate: Arc<dyn ClimateSensors>,
    bus: EventBus,
    options: WaterOptions,
}

impl WaterHeater {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        offsets: Arc<dyn OffsetView>,
        ev_charging: Arc<dyn EvChargingFacade>,
        climate: Arc<dyn ClimateSensors>,
        bus: EventBus,
        options: WaterOptions,
    ) -> Self {
        let state = WaterState {
            current_temp: None,
            demand: Demand::NoDemand,
            trend: Gradient::new(Duration::seconds(3600), 10),
            model: WaterBoosterModel::new(options.boost_timeout),
            wait_timer: WaitTimer::new(options.wait_timer),
            warned_for: None,
        };
        Self {
            state: Mutex::new(state),
            prices,
            offsets,
            ev_charging,
            climate,
            bus,
            options,
        }
    }

    /// Take a raw temperature state from the host. Garbage cancels any
    /// pending boost request.
    pub fn update_temperature(&self, raw: &str, now: DateTime<FixedOffset>) {
        match parse_reading(raw) {
            Ok(value) => self.record_temperature(value, now),
            Err(e) => {
                warn!(error = %e, "unable to set water temperature");
                self.state.lock().model.try_heat_water = false;
            }
        }
    }

    pub fn record_temperature(&self, value: f64, now: DateTime<FixedOffset>) {
        let mut state = self.state.lock();
        state.trend.add_reading(value, now);
        if state.current_temp == Some(value) {
            return;
        }

        state.current_temp = Some(value);
        state.demand = Demand::from_water_temperature(value);
        debug!(temp = value, demand = %state.demand, "water temperature changed");
        self.bus.broadcast(HvacEvent::WaterTempChanged);
        self.operate(&mut state, now);
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.state.lock().current_temp
    }

    /// Water temperature trend in °C per hour.
    pub fn temperature_trend(&self) -> f64 {
        self.state.lock().trend.gradient()
    }

    /// True while a boost is requested.
    pub fn water_boost(&self) -> bool {
        self.state.lock().model.try_heat_water
    }

    /// True when the water is getting warmer or about to be.
    pub fn water_heating(&self) -> bool {
        let state = self.state.lock();
        state.trend.gradient() > 0.0 || state.model.pre_heating
    }

    pub fn boost_state(&self) -> BoostState {
        self.state.lock().model.state()
    }

    pub fn latest_boost_call(&self) -> Option<DateTime<FixedOffset>> {
        self.state.lock().model.latest_boost_call
    }

    pub fn model(&self) -> WaterBoosterModel {
        self.state.lock().model.clone()
    }

    /// Planned start of the next boost. Warns once per planned start when it
    /// is less than ten minutes away.
    pub fn next_water_heater_start(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        let mut state = self.state.lock();
        let next = self.predict_next_start(&state, now);
        if let Some(start) = next {
            let soon = start < now + Duration::minutes(UPCOMING_WARNING_MINUTES);
            if soon && state.warned_for != Some(start) {
                info!(%start, "water heater about to start");
                self.bus.broadcast(HvacEvent::UpcomingWaterHeaterWarning { start });
                state.warned_for = Some(start);
            }
        }
        state.model.next_water_heater_start = next;
        next
    }

    fn predict_next_start(
        &self,
        state: &WaterState,
        now: DateTime<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        if state.model.try_heat_water || state.model.pre_heating {
            return None;
        }
        let temp = state.current_temp?;
        let today = self.prices.prices_today();
        let tomorrow = self.prices.prices_tomorrow();
        let query = DemandQuery {
            prices_today: &today,
            prices_tomorrow: &tomorrow,
            min_price: self.ev_charging.min_price(),
            demand_minutes: self.climate.preset().demand_minutes(state.demand),
            temp,
            temp_trend: state.trend.gradient(),
            target_temp: self.options.target_temp,
            low_temp: self.options.low_temp_threshold,
            non_boost_hours: &self.options.non_boost_hours,
        };
        next_predicted_demand(&query, now)
    }

    fn operate(&self, state: &mut WaterState, now: DateTime<FixedOffset>) {
        if state.current_temp.is_none() {
            return;
        }
        if self.climate.preset().is_away() {
            self.operate_away(state, now);
        } else {
            self.operate_home(state, now);
        }
    }

    fn operate_home(&self, state: &mut WaterState, now: DateTime<FixedOffset>) {
        let minute = now.minute();
        let breach = self.ev_charging.is_installed() && self.ev_charging.above_stop_threshold();

        if breach && state.model.try_heat_water && (20..55).contains(&minute) {
            info!("peak is being breached, turning off water heating");
            self.set_boost(state, false, None, now);
        } else if !state.model.try_heat_water
            && state.demand != Demand::NoDemand
            && state.wait_timer.is_timeout(now)
            && !self.options.non_boost_hours.contains(&now.hour())
            && is_water_peak(
                &self.prices.prices_today(),
                &self.prices.prices_tomorrow(),
                now,
            )
        {
            info!(hour = now.hour(), "cheapest hour, boosting water");
            self.set_boost(state, true, Some(Duration::seconds(PEAK_BOOST_SECONDS)), now);
        } else if self.is_below_start_threshold(now)
            && state
                .current_temp
                .is_some_and(|t| t <= self.options.low_temp_threshold)
        {
            if let Some(start) = self.predict_next_start(state, now) {
                if start <= now {
                    debug!(%start, "planned water boost reached, pre-heating");
                    state.model.pre_heating = true;
                }
            }
        }

        self.toggle_boost(state, now);
    }

    fn operate_away(&self, state: &mut WaterState, now: DateTime<FixedOffset>) {
        if self.ev_charging.is_installed()
            && self.ev_charging.exact_threshold() >= 100.0
            && state.model.try_heat_water
        {
            info!("peak threshold reached while away, turning off water heating");
            self.set_boost(state, false, None, now);
        }

        let minute = now.minute();
        let temp = state.current_temp.unwrap_or_default();
        if self.offsets.current_offset(now) > 0
            && minute > 20
            && minute < 50
            && temp > 0.0
            && temp <= self.options.away_low_temp_threshold
        {
            state.model.pre_heating = true;
        }

        self.toggle_boost(state, now);
    }

    fn is_below_start_threshold(&self, now: DateTime<FixedOffset>) -> bool {
        self.offsets.current_offset(now) >= 0
            && now.minute() >= 30
            && self.ev_charging.below_start_threshold()
    }

    fn toggle_boost(&self, state: &mut WaterState, now: DateTime<FixedOffset>) {
        if state.model.try_heat_water {
            if state.model.heat_water_timer.is_timeout(now) {
                self.set_boost(state, false, None, now);
            }
        } else if state.model.pre_heating && state.wait_timer.is_timeout(now) {
            self.set_boost(state, true, None, now);
        }
    }

    fn set_boost(
        &self,
        state: &mut WaterState,
        boost: bool,
        timeout: Option<Duration>,
        now: DateTime<FixedOffset>,
    ) {
        if boost {
            state.model.start_boost(now, timeout);
            info!(until = ?state.model.heat_water_timer.deadline(), "water boost started");
        } else {
            state.wait_timer.update(now);
            state.model.stop_boost();
            info!("water boost stopped");
        }
        self.bus.broadcast(HvacEvent::UpdateOperation);
    }
}

#[async_trait]
impl Heater for WaterHeater {
    fn name(&self) -> &'static str {
        "water heater"
    }

    fn demand(&self) -> Demand {
        self.state.lock().demand
    }

    async fn update_operation(&self, now: DateTime<FixedOffset>) -> Result<()> {
        let mut state = self.state.lock();
        self.operate(&mut state, now);
        Ok(())
    }
}
