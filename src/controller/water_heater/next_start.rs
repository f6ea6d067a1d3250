//! Planning of the next water boost.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::debug;

/// Everything the planner looks at for one prediction.
#[derive(Debug, Clone)]
pub struct DemandQuery<'a> {
    pub prices_today: &'a [f64],
    pub prices_tomorrow: &'a [f64],
    /// Prices at or below this count as cheap.
    pub min_price: f64,
    /// Boost length needed for the current demand.
    pub demand_minutes: u32,
    pub temp: f64,
    /// Water temperature trend, °C per hour.
    pub temp_trend: f64,
    pub target_temp: f64,
    /// Temperature by which the boost must have started.
    pub low_temp: f64,
    pub non_boost_hours: &'a HashSet<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    start: DateTime<FixedOffset>,
    price: f64,
}

fn start_of_day(now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(*now.offset())
        .single()
}

/// Hourly slots from the current hour through tomorrow, minus non-boost
/// hours.
fn horizon(query: &DemandQuery<'_>, now: DateTime<FixedOffset>) -> Vec<Slot> {
    let Some(midnight) = start_of_day(now) else {
        return vec![];
    };
    let tomorrow_start = midnight + Duration::hours(query.prices_today.len() as i64);

    let today = query
        .prices_today
        .iter()
        .enumerate()
        .skip(now.hour() as usize)
        .map(|(h, p)| (h as u32, midnight + Duration::hours(h as i64), *p));
    let tomorrow = query
        .prices_tomorrow
        .iter()
        .enumerate()
        .map(|(h, p)| (h as u32, tomorrow_start + Duration::hours(h as i64), *p));

    today
        .chain(tomorrow)
        .filter(|(hour, _, price)| !query.non_boost_hours.contains(hour) && price.is_finite())
        .map(|(_, start, price)| Slot { start, price })
        .collect()
}

/// Start of the earliest cheap hour (price at or below `min_price`) in
/// which a boost still starts in time, or `None` when no boost is needed or
/// no such hour exists in the horizon.
///
/// The water is expected to reach `low_temp` at the rate given by the
/// (negative part of the) trend; a boost of `demand_minutes` has to start
/// before that. The current hour always counts as in time.
pub fn next_predicted_demand(
    query: &DemandQuery<'_>,
    now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    if query.demand_minutes == 0 || !query.temp.is_finite() || query.temp >= query.target_temp {
        return None;
    }

    let slots = horizon(query, now);
    if slots.is_empty() {
        debug!("no hours left to plan a water boost in");
        return None;
    }

    let cooling = query.temp_trend.min(0.0);
    let deadline = if query.temp <= query.low_temp {
        Some(now)
    } else if cooling == 0.0 {
        None
    } else {
        let hours = (query.temp - query.low_temp) / -cooling;
        Duration::try_seconds((hours * 3600.0) as i64).and_then(|d| now.checked_add_signed(d))
    };
    let latest_start = deadline
        .and_then(|d| d.checked_sub_signed(Duration::minutes(i64::from(query.demand_minutes))));
    let in_time =
        |s: &Slot| s.start <= now || latest_start.map_or(true, |latest| s.start <= latest);

    let Some(chosen) = slots
        .iter()
        .find(|s| s.price <= query.min_price && in_time(*s))
    else {
        debug!(
            min_price = query.min_price,
            hours = slots.len(),
            "no cheap hour to start a water boost in"
        );
        return None;
    };

    debug!(start = %chosen.start, price = chosen.price, "next water boost planned");
    Some(chosen.start)
}

/// Whether the current hour is the cheapest of the known horizon, or the
/// next hour is and the price step down is small enough to start now.
pub fn is_water_peak(
    prices_today: &[f64],
    prices_tomorrow: &[f64],
    now: DateTime<FixedOffset>,
) -> bool {
    let prices = prices_today
        .iter()
        .chain(prices_tomorrow)
        .copied()
        .collect_vec();
    let Some(min) = prices
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .min_by(f64::total_cmp)
    else {
        return false;
    };

    let hour = now.hour() as usize;
    let Some(current) = prices.get(hour).copied() else {
        return false;
    };
    if current == min {
        return true;
    }
    match prices.get(hour + 1) {
        Some(next) if *next == min && current > 0.0 => next / current >= 0.7 && now.minute() >= 30,
        _ => false,
    }
}
