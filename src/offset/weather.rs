use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike};

use super::{DayOffsets, OffsetError};
use crate::domain::PrognosisPoint;

/// A forecast is matched to an hour when it lies exactly this far ahead.
pub const PROGNOSIS_LOOKAHEAD_SECONDS: i64 = 10_800;

/// Each 2.5 °C of forecast change is worth one offset step.
const DEGREES_PER_STEP: f64 = 2.5;

/// Adjust today's offsets by the weather prognosis.
///
/// The returned map is sign-inverted: every hour becomes
/// `-(offset + adjustment)`, and hours in the past or without a matching
/// forecast become `-offset`. Callers invert it back before smoothing.
pub fn weather_adjusted_inverted(
    today: &DayOffsets,
    prognosis: &[PrognosisPoint],
    now: DateTime<FixedOffset>,
) -> Result<DayOffsets, OffsetError> {
    let midnight = now
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(*now.offset())
        .single()
        .ok_or(OffsetError::InvalidTimestamp(now))?;

    let mut ret = DayOffsets::new();
    for (&hour, &offset) in today {
        let hour_start = midnight + Duration::hours(i64::from(hour));
        let adjustment = match lookahead_prognosis(prognosis, hour_start) {
            Some(point) if hour >= now.hour() => prognosis_adjustment(point)?,
            _ => 0,
        };
        ret.insert(hour, -(offset + adjustment));
    }
    Ok(ret)
}

fn lookahead_prognosis(
    prognosis: &[PrognosisPoint],
    hour_start: DateTime<FixedOffset>,
) -> Option<&PrognosisPoint> {
    prognosis
        .iter()
        .find(|p| (p.timestamp - hour_start).num_seconds() == PROGNOSIS_LOOKAHEAD_SECONDS)
}

/// Offset steps to subtract for a forecast; forecasts further ahead weigh
/// less and vanish beyond eleven hours.
fn prognosis_adjustment(point: &PrognosisPoint) -> Result<i32, OffsetError> {
    if !point.delta_temp_from_now.is_finite() || !point.time_delta_hours.is_finite() {
        return Err(OffsetError::NonFiniteForecast(point.timestamp));
    }
    let divisor = ((11.0 - point.time_delta_hours) / 10.0).max(0.0);
    let steps = (point.delta_temp_from_now / DEGREES_PER_STEP * divisor).round_ties_even() as i32;
    Ok(-steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
            .unwrap()
    }

    fn point(hour: u32, delta: f64, time_delta: f64) -> PrognosisPoint {
        PrognosisPoint {
            timestamp: at(hour, 0),
            delta_temp_from_now: delta,
            time_delta_hours: time_delta,
        }
    }

    fn flat(value: i32) -> DayOffsets {
        (0..24).map(|h| (h, value)).collect()
    }

    #[test]
    fn test_no_prognosis_only_inverts() {
        let ret = weather_adjusted_inverted(&flat(2), &[], at(6, 0)).unwrap();
        assert!(ret.values().all(|v| *v == -2));
    }

    #[test]
    fn test_warmer_forecast_lowers_offset() {
        // 5 degrees warmer at 13:00, forecast taken 1 hour ahead -> divisor 1.0
        let prognosis = vec![point(13, 5.0, 1.0)];
        let ret = weather_adjusted_inverted(&flat(1), &prognosis, at(9, 30)).unwrap();

        // hour 10 matches 13:00; adjustment -2, inverted -(1 - 2) = 1
        assert_eq!(ret[&10], 1);
        assert_eq!(ret[&11], -1);
    }

    #[test]
    fn test_past_hours_are_not_adjusted() {
        let prognosis = vec![point(8, 5.0, 1.0)];
        let ret = weather_adjusted_inverted(&flat(1), &prognosis, at(9, 0)).unwrap();
        assert_eq!(ret[&5], -1);
    }

    #[test]
    fn test_far_forecasts_are_discounted() {
        let prognosis = vec![point(15, 5.0, 12.0)];
        let ret = weather_adjusted_inverted(&flat(0), &prognosis, at(9, 0)).unwrap();
        assert_eq!(ret[&12], 0);
    }

    #[test]
    fn test_inexact_timestamp_is_ignored() {
        let mut p = point(13, 5.0, 1.0);
        p.timestamp = at(13, 30);
        let ret = weather_adjusted_inverted(&flat(0), &[p], at(9, 0)).unwrap();
        assert!(ret.values().all(|v| *v == 0));
    }

    #[test]
    fn test_non_finite_forecast_fails() {
        let prognosis = vec![point(13, f64::NAN, 1.0)];
        let err = weather_adjusted_inverted(&flat(0), &prognosis, at(9, 0)).unwrap_err();
        assert!(matches!(err, OffsetError::NonFiniteForecast(_)));
    }
}
