//! REST-backed state snapshots for feed gap recovery.

use async_trait::async_trait;
use ordex_exchange::ExchangeApi;
use ordex_ws::SnapshotProvider;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Re-fetches open orders and positions for every tracked symbol.
///
/// Trades register their symbol while active; a gap on any topic rebuilds
/// the full set because a missed message could belong to any of them.
pub struct RestSnapshot {
    exchange: Arc<dyn ExchangeApi>,
    symbols: RwLock<HashSet<String>>,
}

impl RestSnapshot {
    pub fn new(exchange: Arc<dyn ExchangeApi>) -> Self {
        Self {
            exchange,
            symbols: RwLock::new(HashSet::new()),
        }
    }

    pub fn track(&self, symbol: &str) {
        self.symbols.write().insert(symbol.to_string());
    }

    pub fn untrack(&self, symbol: &str) {
        self.symbols.write().remove(symbol);
    }
}

#[async_trait]
impl SnapshotProvider for RestSnapshot {
    async fn resync(&self, topic: &str) -> anyhow::Result<()> {
        let symbols: Vec<String> = self.symbols.read().iter().cloned().collect();
        tracing::info!(topic, symbols = symbols.len(), "rebuilding state from REST");

        for symbol in &symbols {
            let orders = self.exchange.open_orders(symbol).await?;
            let position = self.exchange.get_position(symbol).await?;
            tracing::info!(
                symbol,
                open_orders = orders.len(),
                has_position = position.is_some(),
                "snapshot refreshed"
            );
        }
        Ok(())
    }
}
