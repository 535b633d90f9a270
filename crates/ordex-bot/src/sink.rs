//! Injected collaborators for the confirmation gate.
//!
//! Notification transport and durable persistence are out of scope for
//! this binary; the gate still requires both, so it gets a log-backed
//! sink and a no-op store.

use async_trait::async_trait;
use ordex_core::TradeRecord;
use ordex_gate::{NotificationSink, PersistenceStore};

/// Emits every notification as a structured log line.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        tracing::info!(target: "ordex::notify", %message, "notification");
        Ok(())
    }
}

/// Accepts trade snapshots without persisting them.
#[derive(Debug, Default)]
pub struct DiscardStore;

#[async_trait]
impl PersistenceStore for DiscardStore {
    async fn save_trade(&self, record: &TradeRecord) -> anyhow::Result<()> {
        tracing::debug!(
            trade_id = %record.trade_id,
            status = %record.status,
            "trade snapshot discarded (persistence disabled)"
        );
        Ok(())
    }
}
