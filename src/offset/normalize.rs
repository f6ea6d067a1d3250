use super::{DayOffsets, OffsetError};

/// Below this spread a day counts as flat.
const FLAT_DAY_EPSILON: f64 = 1e-9;

/// Turn one day of prices into heating offsets.
///
/// Each hour's deviation from the day mean is scaled so that the most
/// extreme hour lands exactly on `tolerance`, then negated: expensive hours
/// get negative offsets, cheap hours positive ones. A flat day yields zero
/// everywhere.
pub fn offset_per_day(prices: &[f64], tolerance: i32) -> Result<DayOffsets, OffsetError> {
    if prices.is_empty() {
        return Err(OffsetError::EmptyDay);
    }
    if tolerance <= 0 {
        return Err(OffsetError::InvalidTolerance(tolerance));
    }
    if let Some(hour) = prices.iter().position(|p| !p.is_finite()) {
        return Err(OffsetError::NonFinitePrice { hour });
    }

    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    let deviations: Vec<f64> = prices.iter().map(|p| p - mean).collect();
    let extreme = deviations.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));

    if extreme < FLAT_DAY_EPSILON {
        return Ok((0..prices.len() as u32).map(|hour| (hour, 0)).collect());
    }

    let factor = extreme / f64::from(tolerance);
    Ok(deviations
        .iter()
        .enumerate()
        .map(|(hour, deviation)| (hour as u32, (-deviation / factor).round_ties_even() as i32))
        .collect())
}
