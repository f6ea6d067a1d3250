//! Pure temperature corrections used by the house heater.

use serde::Serialize;

/// Differences smaller than this are treated as noise.
const DEADBAND: f64 = 0.2;
/// Largest lead the trend correction may add in either direction.
const MAX_TREND_OFFSET: i32 = 2;
/// Prediction horizon of the indoor trend, hours.
const TREND_HORIZON_HOURS: f64 = 1.0;

/// Offset components of one adjustment cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalculatedOffsetModel {
    pub current_offset: i32,
    pub current_temp_diff: i32,
    pub current_temp_trend_offset: i32,
}

impl CalculatedOffsetModel {
    pub fn sum(&self) -> i32 {
        self.current_offset + self.current_temp_diff + self.current_temp_trend_offset
    }

    /// Copy with the nominal offset lowered by `steps`.
    pub fn lowered(&self, steps: i32) -> Self {
        Self {
            current_offset: self.current_offset - steps,
            ..*self
        }
    }
}

/// Widen the indoor tolerances while the price offset already pushes in
/// one direction. Returns `(min, max)`; neither drops below 0.1.
pub fn adjusted_tolerances(offset: i32, min: f64, max: f64) -> (f64, f64) {
    let min = if offset < 0 {
        min + f64::from(offset.abs()) / 10.0
    } else {
        min
    };
    let max = if offset > 0 {
        max + f64::from(offset) / 15.0
    } else {
        max
    };
    (min.max(0.1), max.max(0.1))
}

/// Offset steps that counter the indoor deviation: a warm house gives a
/// negative correction, a cold one a positive.
///
/// `tolerances` are already adjusted `(min, max)`; `min` scales a warm
/// deviation and `max` a cold one. No lowering happens while the coldest
/// room is below the cold tolerance.
pub fn tempdiff_inverted(temp_diff: f64, min_indoors_diff: f64, tolerances: (f64, f64)) -> i32 {
    if !temp_diff.is_finite() || temp_diff.abs() < DEADBAND {
        return 0;
    }
    let (min, max) = tolerances;
    let tolerance = if temp_diff > 0.0 { min } else { max };
    if tolerance <= 0.0 {
        return 0;
    }

    let steps = (temp_diff.abs() / tolerance).floor() as i32;
    let ret = if temp_diff > 0.0 { -steps } else { steps };

    if ret < 0 && min_indoors_diff < -max {
        return 0;
    }
    ret
}

/// Small leading correction from where the indoor temperature is heading.
///
/// Only used with a clean trend. The lead is whatever part of the predicted
/// deviation `temp_diff_offset` does not already cover.
pub fn temp_trend_offset(
    is_clean: bool,
    temp_diff_offset: i32,
    indoor: f64,
    gradient: f64,
    set_point: f64,
) -> i32 {
    if !is_clean || !gradient.is_finite() {
        return 0;
    }
    let predicted = indoor + gradient * TREND_HORIZON_HOURS;
    let diff = predicted - set_point;
    if diff.abs() < DEADBAND {
        return 0;
    }

    let lead = ((-diff).round_ties_even() as i32).clamp(-MAX_TREND_OFFSET, MAX_TREND_OFFSET);
    if lead.signum() == temp_diff_offset.signum() {
        if lead.abs() <= temp_diff_offset.abs() {
            return 0;
        }
        return lead - temp_diff_offset;
    }
    lead
}
