use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::controller::events::{EventBus, HvacEvent};

/// Read interface of the day-ahead price feed.
#[cfg_attr(test, mockall::automock)]
pub trait PriceSource: Send + Sync {
    fn prices_today(&self) -> Vec<f64>;
    /// Empty until tomorrow's prices are published.
    fn prices_tomorrow(&self) -> Vec<f64>;
    fn current_price(&self) -> f64;
}

/// One update as published by the price integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub today: Vec<f64>,
    #[serde(default)]
    pub tomorrow: Vec<f64>,
    #[serde(default)]
    pub currency: String,
    /// Price of the current hour.
    pub state: f64,
}

#[derive(Debug, Default)]
struct PriceState {
    today: Vec<f64>,
    tomorrow: Vec<f64>,
    currency: String,
    state: f64,
}

/// Latest day-ahead prices, announcing changes on the event bus.
#[derive(Debug)]
pub struct PriceBoard {
    state: RwLock<PriceState>,
    bus: EventBus,
}

impl PriceBoard {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: RwLock::new(PriceState::default()),
            bus,
        }
    }

    /// Store an update. Returns true, and broadcasts `PricesChanged`, when
    /// either price list differs from what was held before.
    pub fn update(&self, update: PriceUpdate) -> bool {
        if !(23..=25).contains(&update.today.len()) {
            error!(len = update.today.len(), "price list for today has unexpected length");
        }

        let changed = {
            let mut state = self.state.write();
            let mut changed = false;
            if state.today != update.today {
                state.today = update.today;
                changed = true;
            }
            if state.tomorrow != update.tomorrow {
                state.tomorrow = update.tomorrow;
                changed = true;
            }
            state.currency = update.currency;
            state.state = update.state;
            changed
        };

        if changed {
            debug!("day-ahead prices changed");
            self.bus.broadcast(HvacEvent::PricesChanged);
        }
        changed
    }

    pub fn currency(&self) -> String {
        self.state.read().currency.clone()
    }
}

impl PriceSource for PriceBoard {
    fn prices_today(&self) -> Vec<f64> {
        self.state.read().today.clone()
    }

    fn prices_tomorrow(&self) -> Vec<f64> {
        self.state.read().tomorrow.clone()
    }

    fn current_price(&self) -> f64 {
        self.state.read().state
    }
}
