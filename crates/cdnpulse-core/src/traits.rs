use crate::error::{FetchError, SinkError};
use crate::observation::Snapshot;
use crate::payload::Payload;
use crate::types::{Category, ChannelId, QueryWindow};
use async_trait::async_trait;

/// Source of per-channel CDN statistics
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch one category for one channel over the given window.
    ///
    /// Issues a single request; implementations must not retry.
    async fn fetch(
        &self,
        category: Category,
        channel: &ChannelId,
        window: &QueryWindow,
    ) -> Result<Payload, FetchError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Destination for completed snapshots
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Deliver one complete snapshot
    async fn publish(&self, snapshot: &Snapshot) -> Result<(), SinkError>;

    /// Name used in logs
    fn name(&self) -> &str;
}
