//! Injected side-effect boundaries.

use async_trait::async_trait;
use ordex_core::TradeRecord;

/// Outbound notification channel (messaging service, log, test capture).
///
/// Implementations must tolerate being called concurrently. Failures are
/// logged by the gate and never fail the underlying operation: by the time
/// a notification is sent, the venue has already acknowledged.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> anyhow::Result<()>;
}

/// Durable record of trade state transitions.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn save_trade(&self, record: &TradeRecord) -> anyhow::Result<()>;
}

/// Sink that drops notifications. Used when no channel is configured.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Store that forgets everything. Used when persistence is disabled.
pub struct NullStore;

#[async_trait]
impl PersistenceStore for NullStore {
    async fn save_trade(&self, _record: &TradeRecord) -> anyhow::Result<()> {
        Ok(())
    }
}
