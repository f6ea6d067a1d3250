use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tracing::trace;

/// Notifications for downstream recomputation. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Display)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HvacEvent {
    #[strum(serialize = "prices changed")]
    PricesChanged,
    #[strum(serialize = "offsets changed")]
    OffsetsChanged,
    #[strum(serialize = "update operation")]
    UpdateOperation,
    #[strum(serialize = "watertemp change")]
    WaterTempChanged,
    #[strum(serialize = "upcoming water heater warning")]
    UpcomingWaterHeaterWarning { start: DateTime<FixedOffset> },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HvacEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HvacEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn broadcast(&self, event: HvacEvent) {
        trace!(%event, "broadcast");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
