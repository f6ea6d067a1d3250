//! # Price Offset Engine
//!
//! Turns day-ahead prices into an hourly heating offset:
//!
//! 1. per-day normalization of the price shape ([`normalize`])
//! 2. weather-prognosis adjustment of today's hours ([`weather`])
//! 3. single-hour anomaly removal and rise anticipation ([`smoothing`])
//!
//! Results are memoized on the inputs (prices, tolerance, prognosis), not
//! on time. Every failure is logged and answered with the last good result.

pub mod normalize;
pub mod peakfinder;
pub mod smoothing;
pub mod weather;

use chrono::{DateTime, FixedOffset, Timelike};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{PrognosisPoint, PrognosisProvider};

pub use normalize::offset_per_day;
pub use peakfinder::identify_peaks;
pub use smoothing::{find_single_anomalies, smooth_transitions};
pub use weather::weather_adjusted_inverted;

/// Tolerance used when a non-positive one is configured.
pub const DEFAULT_TOLERANCE: i32 = 3;

/// Hour of day -> offset step.
pub type DayOffsets = BTreeMap<u32, i32>;

/// Computation errors inside the offset pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OffsetError {
    #[error("no prices for the day")]
    EmptyDay,
    #[error("non-finite price at hour {hour}")]
    NonFinitePrice { hour: usize },
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(i32),
    #[error("non-finite prognosis entry at {0}")]
    NonFiniteForecast(DateTime<FixedOffset>),
    #[error("cannot resolve start of day for {0}")]
    InvalidTimestamp(DateTime<FixedOffset>),
}

/// Offsets for today and, once published, tomorrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPair {
    pub today: DayOffsets,
    pub tomorrow: DayOffsets,
}

/// Day-ahead price lists hold 23 to 25 hours depending on DST.
pub(crate) fn is_full_day(len: usize) -> bool {
    (23..=25).contains(&len)
}

/// What the heaters need to know about the offset plan.
#[cfg_attr(test, mockall::automock)]
pub trait OffsetView: Send + Sync {
    fn tolerance(&self) -> i32;
    /// Calculated offset for the hour containing `now`.
    fn current_offset(&self, now: DateTime<FixedOffset>) -> i32;
    /// Whether heating should be floored because `now` is a price peak
    /// and the house is already warm enough.
    fn max_price_lower(&self, temp_diff: f64, now: DateTime<FixedOffset>) -> bool;
}

/// Inputs a calculation was made from; equal inputs mean equal results.
#[derive(Debug, Clone, PartialEq)]
struct OffsetInputs {
    prices: Vec<f64>,
    prices_tomorrow: Vec<f64>,
    tolerance: i32,
    prognosis: Vec<PrognosisPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct OffsetModel {
    pub raw_offsets: OffsetPair,
    pub calculated_offsets: Arc<OffsetPair>,
    pub tolerance: i32,
    pub prognosis: Vec<PrognosisPoint>,
    pub peaks_today: BTreeSet<usize>,
    pub peaks_tomorrow: BTreeSet<usize>,
    accepted: Option<OffsetInputs>,
}

/// Serializable view of the current offset plan.
#[derive(Debug, Clone, Serialize)]
pub struct OffsetsExport {
    pub today: DayOffsets,
    pub tomorrow: DayOffsets,
    pub raw_today: DayOffsets,
    pub peaks_today: Vec<usize>,
    pub peaks_tomorrow: Vec<usize>,
    pub tolerance: i32,
}

pub struct PriceOffsetEngine {
    model: Mutex<OffsetModel>,
    prognosis: Arc<dyn PrognosisProvider>,
    recomputations: AtomicU64,
}

impl PriceOffsetEngine {
    pub fn new(tolerance: i32, prognosis: Arc<dyn PrognosisProvider>) -> Self {
        let tolerance = if tolerance > 0 {
            tolerance
        } else {
            warn!(
                tolerance,
                fallback = DEFAULT_TOLERANCE,
                "non-positive hvac tolerance, using default"
            );
            DEFAULT_TOLERANCE
        };
        let model = OffsetModel {
            tolerance,
            ..Default::default()
        };
        Self {
            model: Mutex::new(model),
            prognosis,
            recomputations: AtomicU64::new(0),
        }
    }

    /// Offsets for today and tomorrow.
    ///
    /// Recomputes only when prices, tolerance or prognosis differ from the
    /// last accepted inputs; otherwise the cached result is handed out.
    pub fn get_offset(
        &self,
        prices: &[f64],
        prices_tomorrow: &[f64],
        now: DateTime<FixedOffset>,
    ) -> Arc<OffsetPair> {
        let prognosis = self.prognosis.prognosis();
        let mut model = self.model.lock();
        let inputs = OffsetInputs {
            prices: prices.to_vec(),
            prices_tomorrow: prices_tomorrow.to_vec(),
            tolerance: model.tolerance,
            prognosis,
        };

        if model.accepted.as_ref() == Some(&inputs) {
            return Arc::clone(&model.calculated_offsets);
        }

        self.recomputations.fetch_add(1, Ordering::Relaxed);
        model.recompute(inputs, now);
        Arc::clone(&model.calculated_offsets)
    }

    /// Change the maximum offset magnitude. Takes effect on the next
    /// [`get_offset`](Self::get_offset).
    pub fn set_tolerance(&self, tolerance: i32) {
        if tolerance <= 0 {
            warn!(tolerance, "ignoring non-positive hvac tolerance");
            return;
        }
        self.model.lock().tolerance = tolerance;
    }

    /// Number of full recalculations performed so far.
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }

    /// Copy of the current model.
    pub fn model(&self) -> OffsetModel {
        self.model.lock().clone()
    }

    pub fn export(&self) -> OffsetsExport {
        let model = self.model.lock();
        OffsetsExport {
            today: model.calculated_offsets.today.clone(),
            tomorrow: model.calculated_offsets.tomorrow.clone(),
            raw_today: model.raw_offsets.today.clone(),
            peaks_today: model.peaks_today.iter().copied().collect(),
            peaks_tomorrow: model.peaks_tomorrow.iter().copied().collect(),
            tolerance: model.tolerance,
        }
    }
}

impl OffsetView for PriceOffsetEngine {
    fn tolerance(&self) -> i32 {
        self.model.lock().tolerance
    }

    fn current_offset(&self, now: DateTime<FixedOffset>) -> i32 {
        self.model
            .lock()
            .calculated_offsets
            .today
            .get(&now.hour())
            .copied()
            .unwrap_or(0)
    }

    fn max_price_lower(&self, temp_diff: f64, now: DateTime<FixedOffset>) -> bool {
        temp_diff >= 0.0 && self.model.lock().peaks_today.contains(&(now.hour() as usize))
    }
}

impl OffsetModel {
    fn recompute(&mut self, inputs: OffsetInputs, now: DateTime<FixedOffset>) {
        self.prognosis = inputs.prognosis.clone();
        self.peaks_today = identify_peaks(&inputs.prices);
        self.peaks_tomorrow = identify_peaks(&inputs.prices_tomorrow);

        let tomorrow: &[f64] = if is_full_day(inputs.prices_tomorrow.len()) {
            &inputs.prices_tomorrow
        } else {
            if !inputs.prices_tomorrow.is_empty() {
                debug!(
                    len = inputs.prices_tomorrow.len(),
                    "ignoring incomplete price list for tomorrow"
                );
            }
            &[]
        };

        if is_full_day(inputs.prices.len()) {
            match self.update_offset(&inputs.prices, tomorrow, None) {
                Ok(raw) => self.raw_offsets = raw,
                Err(e) => warn!(error = %e, "could not calculate raw offsets, keeping previous"),
            }
        } else {
            error!(
                len = inputs.prices.len(),
                "price list for today must hold 23 to 25 hours, cannot calculate offsets"
            );
        }

        match weather_adjusted_inverted(&self.raw_offsets.today, &inputs.prognosis, now) {
            Ok(inverted) => {
                let adjusted: DayOffsets = inverted.into_iter().map(|(h, v)| (h, -v)).collect();
                match self.update_offset(&inputs.prices, tomorrow, Some(adjusted)) {
                    Ok(calculated) => self.calculated_offsets = Arc::new(calculated),
                    Err(e) => warn!(error = %e, "could not smooth offsets, keeping previous"),
                }
            }
            Err(e) => {
                warn!(error = %e, "unable to calculate prognosis offsets, using raw offsets");
                self.calculated_offsets = Arc::new(self.raw_offsets.clone());
            }
        }

        info!(
            tolerance = inputs.tolerance,
            hours_today = self.calculated_offsets.today.len(),
            hours_tomorrow = self.calculated_offsets.tomorrow.len(),
            "offsets recalculated"
        );
        self.accepted = Some(inputs);
    }

    fn update_offset(
        &self,
        prices: &[f64],
        prices_tomorrow: &[f64],
        weather_adjusted_today: Option<DayOffsets>,
    ) -> Result<OffsetPair, OffsetError> {
        let today = match weather_adjusted_today {
            Some(adjusted) => adjusted,
            None => offset_per_day(prices, self.tolerance)?,
        };
        let tomorrow = if prices_tomorrow.is_empty() {
            DayOffsets::new()
        } else {
            offset_per_day(prices_tomorrow, self.tolerance).unwrap_or_else(|e| {
                warn!(error = %e, "could not calculate offsets for tomorrow");
                DayOffsets::new()
            })
        };
        smooth_transitions(&today, &tomorrow, self.tolerance)
    }
}
