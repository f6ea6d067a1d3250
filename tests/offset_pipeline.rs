//! End-to-end behaviour of the price offset pipeline.

use chrono::{DateTime, FixedOffset, TimeZone};
use hvac_price_control::domain::{PrognosisPoint, StaticPrognosis};
use hvac_price_control::offset::{OffsetView, PriceOffsetEngine};
use std::sync::Arc;

fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
        .unwrap()
}

#[test]
fn test_price_spike_gets_most_negative_offset() {
    let engine = PriceOffsetEngine::new(4, Arc::new(StaticPrognosis::default()));
    let mut prices = vec![10.0; 24];
    prices[14] = 100.0;

    let offsets = engine.get_offset(&prices, &[], at(6, 0));
    let raw = engine.model().raw_offsets.today;

    let min_hour = raw.iter().min_by_key(|(_, v)| **v).map(|(h, _)| *h);
    assert_eq!(min_hour, Some(14));
    assert!(raw[&14] < 0);
    assert!(offsets.today[&14] < 0);
    assert!(offsets.today.values().all(|v| v.abs() <= 4));
    assert!(engine.max_price_lower(0.0, at(14, 10)));
    assert!(!engine.max_price_lower(-0.5, at(14, 10)));
}

#[test]
fn test_flat_day_gives_no_correction() {
    let engine = PriceOffsetEngine::new(3, Arc::new(StaticPrognosis::default()));

    let offsets = engine.get_offset(&[10.0; 24], &[10.0; 24], at(13, 0));

    assert!(offsets.today.values().all(|v| *v == 0));
    assert_eq!(offsets.tomorrow.len(), 24);
    assert_eq!(engine.current_offset(at(13, 30)), 0);
}

#[test]
fn test_warmer_forecast_lowers_offset() {
    let prognosis = Arc::new(StaticPrognosis::new(vec![PrognosisPoint {
        timestamp: at(13, 0),
        delta_temp_from_now: 5.0,
        time_delta_hours: 3.0,
    }]));
    let engine = PriceOffsetEngine::new(3, prognosis);

    let offsets = engine.get_offset(&[10.0; 24], &[], at(8, 0));

    assert!(offsets.today[&10] < 0);
    assert_eq!(offsets.today[&9], 0);
    assert_eq!(offsets.today[&11], 0);
}

#[test]
fn test_new_prognosis_invalidates_cache() {
    let prognosis = Arc::new(StaticPrognosis::default());
    let engine = PriceOffsetEngine::new(3, prognosis.clone());
    let prices = vec![10.0; 24];

    engine.get_offset(&prices, &[], at(8, 0));
    engine.get_offset(&prices, &[], at(8, 0));
    assert_eq!(engine.recomputations(), 1);

    prognosis.replace(vec![PrognosisPoint {
        timestamp: at(13, 0),
        delta_temp_from_now: -5.0,
        time_delta_hours: 3.0,
    }]);
    let offsets = engine.get_offset(&prices, &[], at(8, 0));

    assert_eq!(engine.recomputations(), 2);
    assert!(offsets.today[&10] > 0);
}

#[test]
fn test_dst_day_keeps_its_length() {
    let engine = PriceOffsetEngine::new(3, Arc::new(StaticPrognosis::default()));
    let short_day: Vec<f64> = (0..23).map(|h| 10.0 + h as f64).collect();

    let offsets = engine.get_offset(&short_day, &[], at(2, 0));

    assert_eq!(offsets.today.len(), 23);
}

#[test]
fn test_short_price_list_keeps_previous_offsets() {
    let engine = PriceOffsetEngine::new(3, Arc::new(StaticPrognosis::default()));
    let mut prices = vec![10.0; 24];
    prices[18] = 40.0;
    let good = engine.get_offset(&prices, &[], at(6, 0));

    let stale = engine.get_offset(&[10.0; 12], &[], at(6, 0));

    assert_eq!(good.today, stale.today);
}
