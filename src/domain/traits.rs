//! # Domain Traits
//!
//! Abstract interfaces for the outbound side of the bridge.

use async_trait::async_trait;

use crate::domain::types::ChangeRecord;

/// Destination for parsed change records (e.g., Event Fabric).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submit one record. `Ok` carries the service response body, `Err` a description of the
    /// rejection or transport failure.
    async fn submit(&self, record: &ChangeRecord) -> Result<String, String>;
}
