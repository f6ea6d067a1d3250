//! Full control cycles driven by host snapshots.

use chrono::{DateTime, FixedOffset, TimeZone};
use hvac_price_control::config::Config;
use hvac_price_control::controller::house_heater::OFFSET_MIN_VALUE;
use hvac_price_control::controller::{BoostState, HvacController};
use hvac_price_control::domain::{Demand, OffsetAdjustment};
use hvac_price_control::input::HostInputs;

fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
        .unwrap()
}

fn controller() -> HvacController {
    let mut cfg = Config::default();
    cfg.heating.indoor_sensors = vec!["sensor.hall".into(), "sensor.kitchen".into()];
    cfg.heating.outdoor_sensors = vec!["sensor.outdoor".into()];
    HvacController::new(&cfg)
}

fn snapshot(outdoor: &str, water: &str) -> HostInputs {
    let mut today: Vec<String> = (0..24).map(|h| format!("{:.2}", 0.5 + h as f64 / 100.0)).collect();
    today[17] = "2.50".into();
    today[3] = "0.10".into();
    HostInputs::from_json(&format!(
        r#"{{
            "prices": {{ "today": [{}], "currency": "SEK", "state": 0.5 }},
            "sensors": {{
                "sensor.hall": "21.2",
                "sensor.kitchen": "21.0",
                "sensor.outdoor": "{outdoor}"
            }},
            "water_temperature": "{water}",
            "preset": "normal"
        }}"#,
        today.join(", ")
    ))
    .unwrap()
}

#[tokio::test]
async fn test_peak_hour_floors_heating_when_mild() {
    let controller = controller();
    controller.apply_inputs(snapshot("5.0", "45.0"), at(17, 5));

    let report = controller.tick(at(17, 5)).await;

    assert!(report.offsets.peaks_today.contains(&17));
    assert_eq!(report.adjusted_offset, OFFSET_MIN_VALUE);
    assert!(report.force_update);
    assert_eq!(
        controller.house.aux_offset_adjustments().await[&OffsetAdjustment::PeakHour],
        OFFSET_MIN_VALUE
    );
}

#[tokio::test]
async fn test_peak_hour_keeps_heating_when_freezing() {
    let controller = controller();
    controller.apply_inputs(snapshot("-8.0", "45.0"), at(17, 5));

    let report = controller.tick(at(17, 5)).await;

    assert!(report.adjusted_offset >= -3);
    assert_eq!(report.adjusted_offset, report.offset.clamp(-3, 3));
}

#[tokio::test]
async fn test_cheap_hour_boosts_water() {
    let controller = controller();
    controller.apply_inputs(snapshot("-2.0", "30.0"), at(3, 10));

    let report = controller.tick(at(3, 10)).await;

    assert!(report.water_boost);
    assert_eq!(report.water_state, BoostState::Boosting);
    assert_eq!(report.next_water_heater_start, None);
    assert_eq!(report.demands["water heater"], Demand::MediumDemand);
}
