//! # House Heater Coordinator
//!
//! Turns the hourly price offset into the offset actually applied to the
//! heat pump, correcting for indoor deviation and trend. At most one
//! adjustment runs at a time; concurrent callers queue on the lock.

pub mod temperature;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::heater::Heater;
use super::wait_timer::WaitTimer;
use crate::domain::{ClimateSensors, Demand, EvChargingFacade, OffsetAdjustment};
use crate::offset::OffsetView;

pub use temperature::{
    adjusted_tolerances, temp_trend_offset, tempdiff_inverted, CalculatedOffsetModel,
};

/// Offset applied while heating is switched off or floored at a price peak.
pub const OFFSET_MIN_VALUE: i32 = -10;
/// Steps taken off the nominal offset by the temporary lowering.
const TEMPORARY_LOWER_STEPS: i32 = 2;

#[derive(Debug, Clone)]
pub struct HouseHeaterOptions {
    /// Outdoor temperature above which heating is floored.
    pub outdoor_temp_stop_heating: f64,
    /// Minimum time between two temporary lowerings.
    pub breach_wait: Duration,
}

impl Default for HouseHeaterOptions {
    fn default() -> Self {
        Self {
            outdoor_temp_stop_heating: 15.0,
            breach_wait: Duration::minutes(15),
        }
    }
}

#[derive(Debug)]
struct CoordinatorState {
    current_adjusted_offset: i32,
    aux_adjustments: HashMap<OffsetAdjustment, i32>,
    calculated: CalculatedOffsetModel,
    lower_timer: WaitTimer,
}

pub struct HouseHeaterCoordinator {
    state: Mutex<CoordinatorState>,
    offsets: Arc<dyn OffsetView>,
    sensors: Arc<dyn ClimateSensors>,
    ev_charging: Arc<dyn EvChargingFacade>,
    options: HouseHeaterOptions,
    lower_requested: AtomicBool,
}

impl HouseHeaterCoordinator {
    pub fn new(
        offsets: Arc<dyn OffsetView>,
        sensors: Arc<dyn ClimateSensors>,
        ev_charging: Arc<dyn EvChargingFacade>,
        options: HouseHeaterOptions,
    ) -> Self {
        let aux_adjustments = HashMap::from([
            (OffsetAdjustment::PeakHour, 0),
            (OffsetAdjustment::TemporarilyLowerOffset, 0),
        ]);
        let lower_timer = WaitTimer::new(options.breach_wait);
        Self {
            state: Mutex::new(CoordinatorState {
                current_adjusted_offset: 0,
                aux_adjustments,
                calculated: CalculatedOffsetModel::default(),
                lower_timer,
            }),
            offsets,
            sensors,
            ev_charging,
            options,
            lower_requested: AtomicBool::new(false),
        }
    }

    pub async fn current_adjusted_offset(&self) -> i32 {
        self.state.lock().await.current_adjusted_offset
    }

    pub async fn aux_offset_adjustments(&self) -> HashMap<OffsetAdjustment, i32> {
        self.state.lock().await.aux_adjustments.clone()
    }

    /// Components of the latest adjustment cycle.
    pub async fn calculated_offset_model(&self) -> CalculatedOffsetModel {
        self.state.lock().await.calculated
    }

    /// Ask for a one-shot lowering on the next cycle whose debounce allows it.
    pub fn request_temporary_lower(&self) {
        self.lower_requested.store(true, Ordering::SeqCst);
    }

    fn turn_off_all_heat(&self) -> bool {
        self.sensors.outdoor_average() > self.options.outdoor_temp_stop_heating
    }

    /// Offset to apply for the hour containing `now`, and whether the
    /// actuator should be updated even if the value is unchanged.
    pub async fn adjusted_offset(
        &self,
        current_offset: i32,
        now: DateTime<FixedOffset>,
    ) -> (i32, bool) {
        let mut state = self.state.lock().await;

        let outdoor = self.sensors.outdoor_average();
        let max_lower = self.offsets.max_price_lower(self.sensors.temp_diff(), now);
        if (self.turn_off_all_heat() || max_lower) && outdoor >= 0.0 {
            state.aux_adjustments.insert(
                OffsetAdjustment::PeakHour,
                if max_lower { OFFSET_MIN_VALUE } else { 0 },
            );
            state.current_adjusted_offset = OFFSET_MIN_VALUE;
            debug!(outdoor, max_lower, "heating floored");
            return (OFFSET_MIN_VALUE, true);
        }
        state.aux_adjustments.insert(OffsetAdjustment::PeakHour, 0);

        let calculated = self.calculated_offset_data(current_offset, now);
        let (calculated, force_update) = self.temporarily_lower(&mut state, calculated, now);
        state.calculated = calculated;

        let tolerance = self.offsets.tolerance().max(0);
        let target = calculated.sum().clamp(-tolerance, tolerance);
        if state.current_adjusted_offset != target {
            debug!(
                from = state.current_adjusted_offset,
                to = target,
                offset = calculated.current_offset,
                temp_diff = calculated.current_temp_diff,
                trend = calculated.current_temp_trend_offset,
                "adjusted offset changed"
            );
            state.current_adjusted_offset = target;
        }

        (state.current_adjusted_offset, force_update)
    }

    fn calculated_offset_data(
        &self,
        current_offset: i32,
        now: DateTime<FixedOffset>,
    ) -> CalculatedOffsetModel {
        let (min, max) = self.sensors.tolerances();
        let tolerances = adjusted_tolerances(current_offset, min, max);
        let temp_diff = tempdiff_inverted(
            self.sensors.temp_diff(),
            self.sensors.min_indoors_diff(),
            tolerances,
        );

        let trend = self.sensors.indoor_trend(now);
        let trend_offset = temp_trend_offset(
            trend.is_clean,
            temp_diff,
            self.sensors.indoor_average(),
            trend.gradient,
            self.sensors.set_point(),
        );

        CalculatedOffsetModel {
            current_offset,
            current_temp_diff: temp_diff,
            current_temp_trend_offset: trend_offset,
        }
    }

    fn temporarily_lower(
        &self,
        state: &mut CoordinatorState,
        calculated: CalculatedOffsetModel,
        now: DateTime<FixedOffset>,
    ) -> (CalculatedOffsetModel, bool) {
        if !state.lower_timer.is_timeout(now) {
            return (calculated, false);
        }

        let breach = self.ev_charging.is_installed() && self.ev_charging.above_stop_threshold();
        let addon = self.sensors.addon_running();
        let manual = self.lower_requested.swap(false, Ordering::SeqCst);
        if !(breach || addon || manual) {
            state
                .aux_adjustments
                .insert(OffsetAdjustment::TemporarilyLowerOffset, 0);
            return (calculated, false);
        }

        info!(breach, addon, manual, "temporarily lowering offset");
        state.aux_adjustments.insert(
            OffsetAdjustment::TemporarilyLowerOffset,
            -TEMPORARY_LOWER_STEPS,
        );
        state.lower_timer.update(now);
        (calculated.lowered(TEMPORARY_LOWER_STEPS), true)
    }
}

#[async_trait]
impl Heater for HouseHeaterCoordinator {
    fn name(&self) -> &'static str {
        "house heater"
    }

    fn demand(&self) -> Demand {
        Demand::from_indoor_deviation(self.sensors.temp_diff())
    }

    async fn update_operation(&self, _now: DateTime<FixedOffset>) -> Result<()> {
        Ok(())
    }
}
