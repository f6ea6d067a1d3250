use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::domain::Demand;

/// Capability shared by everything the controller drives.
#[async_trait]
pub trait Heater: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current demand, derived from live sensor values.
    fn demand(&self) -> Demand;

    /// Run one decision cycle.
    async fn update_operation(&self, now: DateTime<FixedOffset>) -> Result<()>;
}
