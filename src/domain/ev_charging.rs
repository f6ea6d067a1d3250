use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Read interface of the EV-charging peak manager running next to us.
///
/// It owns the monthly power-peak bookkeeping; we only read its verdicts.
#[cfg_attr(test, mockall::automock)]
pub trait EvChargingFacade: Send + Sync {
    fn is_installed(&self) -> bool;
    /// Price at or below which energy counts as cheap.
    fn min_price(&self) -> f64;
    /// Predicted percentage of the current power peak.
    fn exact_threshold(&self) -> f64;
    fn above_stop_threshold(&self) -> bool;
    fn below_start_threshold(&self) -> bool;
}

/// Facade used when no EV-charging integration is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvCharging;

impl EvChargingFacade for NoEvCharging {
    fn is_installed(&self) -> bool {
        false
    }

    fn min_price(&self) -> f64 {
        0.0
    }

    fn exact_threshold(&self) -> f64 {
        0.0
    }

    fn above_stop_threshold(&self) -> bool {
        false
    }

    fn below_start_threshold(&self) -> bool {
        true
    }
}

/// Values published by the EV-charging integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvChargingSnapshot {
    pub min_price: f64,
    pub exact_threshold: f64,
    pub stop_threshold: f64,
    pub start_threshold: f64,
}

/// Latest [`EvChargingSnapshot`], replaced by the host. Behaves like
/// [`NoEvCharging`] until the first snapshot arrives.
#[derive(Debug, Default)]
pub struct SharedEvCharging {
    snapshot: RwLock<Option<EvChargingSnapshot>>,
}

impl SharedEvCharging {
    pub fn update(&self, snapshot: Option<EvChargingSnapshot>) {
        *self.snapshot.write() = snapshot;
    }

    fn current(&self) -> Option<EvChargingSnapshot> {
        *self.snapshot.read()
    }
}

impl EvChargingFacade for SharedEvCharging {
    fn is_installed(&self) -> bool {
        self.current().is_some()
    }

    fn min_price(&self) -> f64 {
        self.current().map_or(NoEvCharging.min_price(), |s| s.min_price)
    }

    fn exact_threshold(&self) -> f64 {
        self.current()
            .map_or(NoEvCharging.exact_threshold(), |s| s.exact_threshold)
    }

    fn above_stop_threshold(&self) -> bool {
        self.current()
            .map_or(NoEvCharging.above_stop_threshold(), |s| {
                s.exact_threshold > s.stop_threshold + 5.0
            })
    }

    fn below_start_threshold(&self) -> bool {
        self.current()
            .map_or(NoEvCharging.below_start_threshold(), |s| {
                s.exact_threshold < s.start_threshold
            })
    }
}
