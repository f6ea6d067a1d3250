pub mod events;
pub mod heater;
pub mod house_heater;
pub mod wait_timer;
pub mod water_heater;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, Timelike};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{
    ClimateSensors, Demand, ForecastTemperature, SharedEvCharging, StaticPrognosis,
};
use crate::input::HostInputs;
use crate::offset::{OffsetsExport, PriceOffsetEngine};
use crate::prices::{PriceBoard, PriceSource};
use crate::sensors::HouseSensors;

pub use events::{EventBus, HvacEvent};
pub use heater::Heater;
pub use house_heater::{CalculatedOffsetModel, HouseHeaterCoordinator};
pub use wait_timer::{TimerState, WaitTimer};
pub use water_heater::{BoostState, WaterHeater};

/// Outcome of one control cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub timestamp: DateTime<FixedOffset>,
    /// Price offset for the current hour.
    pub offset: i32,
    /// Offset actually applied to the heat pump.
    pub adjusted_offset: i32,
    pub force_update: bool,
    pub calculated: CalculatedOffsetModel,
    pub water_boost: bool,
    pub water_state: BoostState,
    pub next_water_heater_start: Option<DateTime<FixedOffset>>,
    pub demands: BTreeMap<&'static str, Demand>,
    pub offsets: OffsetsExport,
}

#[derive(Debug)]
struct DemandSlot {
    timer: WaitTimer,
    demand: Demand,
}

#[derive(Debug, Default)]
struct TickState {
    forecast: Vec<ForecastTemperature>,
    current_offset: Option<i32>,
}

/// All components of one installation, wired together.
pub struct HvacController {
    pub bus: EventBus,
    pub prices: Arc<PriceBoard>,
    pub prognosis: Arc<StaticPrognosis>,
    pub engine: Arc<PriceOffsetEngine>,
    pub sensors: Arc<HouseSensors>,
    pub ev_charging: Arc<SharedEvCharging>,
    pub house: Arc<HouseHeaterCoordinator>,
    pub water: Arc<WaterHeater>,
    heaters: Vec<Arc<dyn Heater>>,
    demands: Mutex<Vec<DemandSlot>>,
    last: Mutex<TickState>,
}

impl HvacController {
    pub fn new(cfg: &Config) -> Self {
        let bus = EventBus::new(cfg.controller.event_capacity);
        let prices = Arc::new(PriceBoard::new(bus.clone()));
        let prognosis = Arc::new(StaticPrognosis::default());
        let engine = Arc::new(PriceOffsetEngine::new(
            cfg.heating.tolerance,
            prognosis.clone(),
        ));
        let sensors = Arc::new(HouseSensors::new(&cfg.heating.house_sensors()));
        let ev_charging = Arc::new(SharedEvCharging::default());

        let house = Arc::new(HouseHeaterCoordinator::new(
            engine.clone(),
            sensors.clone(),
            ev_charging.clone(),
            cfg.heating.house_heater(),
        ));
        let water = Arc::new(WaterHeater::new(
            prices.clone(),
            engine.clone(),
            ev_charging.clone(),
            sensors.clone(),
            bus.clone(),
            cfg.water.options(),
        ));

        let heaters: Vec<Arc<dyn Heater>> = vec![house.clone(), water.clone()];
        let refresh = cfg.controller.demand_update();
        let demands = heaters
            .iter()
            .map(|_| DemandSlot {
                timer: WaitTimer::new(refresh),
                demand: Demand::NoDemand,
            })
            .collect();

        Self {
            bus,
            prices,
            prognosis,
            engine,
            sensors,
            ev_charging,
            house,
            water,
            heaters,
            demands: Mutex::new(demands),
            last: Mutex::new(TickState::default()),
        }
    }

    /// Push a host snapshot into the components. Bad sensor values are
    /// logged and skipped.
    pub fn apply_inputs(&self, inputs: HostInputs, now: DateTime<FixedOffset>) {
        if let Some(update) = inputs.prices {
            self.prices.update(update);
        }

        for (entity, raw) in &inputs.sensors {
            if let Err(e) = self.sensors.update_sensor(entity, raw, now) {
                warn!(entity = %entity, error = %e, "sensor update rejected");
            }
        }
        if let Some(set_point) = inputs.set_point {
            self.sensors.set_set_point(set_point);
        }
        if let Some(preset) = inputs.preset {
            self.sensors.set_preset(preset);
        }
        self.sensors.set_addon_running(inputs.addon_running);
        self.ev_charging.update(inputs.ev_charging);

        if inputs.lower_offset_requested {
            self.house.request_temporary_lower();
        }

        // a new prognosis invalidates the cached offsets, so only rebuild
        // it when the forecast itself changed
        {
            let mut last = self.last.lock();
            if last.forecast != inputs.forecast {
                self.prognosis.update_from_forecast(
                    now,
                    self.sensors.outdoor_average(),
                    &inputs.forecast,
                );
                last.forecast = inputs.forecast;
            }
        }

        if let Some(raw) = inputs.water_temperature {
            self.water.update_temperature(&raw, now);
        }
    }

    /// Cached demand per heater, refreshed at most once per
    /// `demand_update_seconds`.
    pub fn demands(&self, now: DateTime<FixedOffset>) -> BTreeMap<&'static str, Demand> {
        let mut slots = self.demands.lock();
        self.heaters
            .iter()
            .zip(slots.iter_mut())
            .map(|(heater, slot)| {
                if slot.timer.is_timeout(now) {
                    slot.demand = heater.demand();
                    slot.timer.update(now);
                }
                (heater.name(), slot.demand)
            })
            .collect()
    }

    pub async fn tick(&self, now: DateTime<FixedOffset>) -> TickReport {
        let today = self.prices.prices_today();
        let tomorrow = self.prices.prices_tomorrow();
        let offsets = self.engine.get_offset(&today, &tomorrow, now);
        let offset = offsets.today.get(&now.hour()).copied().unwrap_or(0);

        let changed = {
            let mut last = self.last.lock();
            let changed = last.current_offset != Some(offset);
            last.current_offset = Some(offset);
            changed
        };
        if changed {
            debug!(offset, "current offset changed");
            self.bus.broadcast(HvacEvent::OffsetsChanged);
        }

        let (adjusted_offset, force_update) = self.house.adjusted_offset(offset, now).await;

        let demands = self.demands(now);
        for heater in &self.heaters {
            if let Err(e) = heater.update_operation(now).await {
                warn!(heater = heater.name(), error = %e, "update operation failed");
            }
        }

        TickReport {
            timestamp: now,
            offset,
            adjusted_offset,
            force_update,
            calculated: self.house.calculated_offset_model().await,
            water_boost: self.water.water_boost(),
            water_state: self.water.boost_state(),
            next_water_heater_start: self.water.next_water_heater_start(now),
            demands,
            offsets: self.engine.export(),
        }
    }

    /// Control loop: read the host snapshot and run a cycle every tick.
    /// Offset changes also wake the water heater between ticks.
    pub async fn run(&self, cfg: &crate::config::ControllerConfig) -> Result<()> {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cfg.tick_seconds.max(1)));
        let mut events = self.bus.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Local::now().fixed_offset();
                    match HostInputs::read(&cfg.input_path).await {
                        Ok(inputs) => self.apply_inputs(inputs, now),
                        Err(e) => warn!(error = %e, "host inputs unavailable, using previous values"),
                    }
                    let report = self.tick(now).await;
                    info!(
                        offset = report.offset,
                        adjusted_offset = report.adjusted_offset,
                        force_update = report.force_update,
                        water_boost = report.water_boost,
                        water_state = %report.water_state,
                        "control tick"
                    );
                    match serde_json::to_string(&report) {
                        Ok(json) => debug!(report = %json, "tick report"),
                        Err(e) => warn!(error = %e, "unable to serialize tick report"),
                    }
                }
                event = events.recv() => match event {
                    Ok(HvacEvent::OffsetsChanged) => {
                        let now = Local::now().fixed_offset();
                        if let Err(e) = self.water.update_operation(now).await {
                            warn!(error = %e, "water heater update failed");
                        }
                    }
                    Ok(event) => debug!(%event, "event"),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "event listener lagging"),
                    Err(RecvError::Closed) => anyhow::bail!("event bus closed"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceUpdate;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
            .unwrap()
    }

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.heating.indoor_sensors = vec!["sensor.hall".into()];
        cfg.heating.outdoor_sensors = vec!["sensor.outdoor".into()];
        cfg
    }

    fn inputs(prices: Vec<f64>) -> HostInputs {
        HostInputs {
            prices: Some(PriceUpdate {
                today: prices,
                tomorrow: vec![],
                currency: "SEK".into(),
                state: 1.0,
            }),
            sensors: BTreeMap::from([
                ("sensor.hall".to_string(), "21.0".to_string()),
                ("sensor.outdoor".to_string(), "-4.0".to_string()),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tick_applies_price_offset() {
        let controller = HvacController::new(&config());
        let mut prices = vec![1.0; 24];
        prices[14] = 0.2;
        prices[15] = 0.2;
        controller.apply_inputs(inputs(prices), at(13, 5));

        let report = controller.tick(at(13, 5)).await;

        assert_eq!(report.offset, 1);
        assert_eq!(report.adjusted_offset, 1);
        assert_eq!(report.offsets.today.len(), 24);
        assert_eq!(report.demands["house heater"], Demand::LowDemand);
    }

    #[tokio::test]
    async fn test_offset_change_is_broadcast() {
        let controller = HvacController::new(&config());
        let mut rx = controller.bus.subscribe();
        controller.apply_inputs(inputs(vec![1.0; 24]), at(8, 0));

        controller.tick(at(8, 0)).await;
        controller.tick(at(8, 1)).await;

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == HvacEvent::OffsetsChanged)
                .count(),
            1
        );
        assert!(events.contains(&HvacEvent::PricesChanged));
    }

    #[test]
    fn test_demands_are_cached() {
        let controller = HvacController::new(&config());
        controller.apply_inputs(inputs(vec![1.0; 24]), at(8, 0));
        assert_eq!(controller.demands(at(8, 0))["house heater"], Demand::LowDemand);

        let mut cold = inputs(vec![1.0; 24]);
        cold.sensors.insert("sensor.hall".into(), "19.0".into());
        controller.apply_inputs(cold, at(8, 0));

        assert_eq!(controller.demands(at(8, 0))["house heater"], Demand::LowDemand);
        assert_eq!(controller.demands(at(8, 2))["house heater"], Demand::HighDemand);
    }
}
