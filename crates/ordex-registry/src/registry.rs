//! TTL-cached table of instrument rules.

use crate::error::{RegistryError, RegistryResult};
use crate::rules::InstrumentRule;
use ordex_exchange::ExchangeApi;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a fetched table stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Table {
    rules: HashMap<String, InstrumentRule>,
    fetched_at: Instant,
}

/// Cached instrument-rule lookups with wholesale refresh.
///
/// The table is replaced atomically: readers either see the complete old
/// table or the complete new one, never a partial refresh. When a refresh
/// fails and a stale table exists, the stale table keeps serving (trading
/// rules change rarely; a stale answer beats no answer).
pub struct QuantizationRegistry {
    exchange: Arc<dyn ExchangeApi>,
    table: RwLock<Option<Arc<Table>>>,
    // Serializes refreshes so concurrent lookups on an expired table fetch
    // the instrument list once, not once per caller.
    refresh_lock: tokio::sync::Mutex<()>,
    ttl: Duration,
}

impl QuantizationRegistry {
    pub fn new(exchange: Arc<dyn ExchangeApi>) -> Self {
        Self::with_ttl(exchange, DEFAULT_TTL)
    }

    pub fn with_ttl(exchange: Arc<dyn ExchangeApi>, ttl: Duration) -> Self {
        Self {
            exchange,
            table: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            ttl,
        }
    }

    /// Look up the rules for one symbol, refreshing the table if stale.
    pub async fn rule(&self, symbol: &str) -> RegistryResult<InstrumentRule> {
        let table = self.fresh_table().await?;
        table
            .rules
            .get(symbol)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSymbol(symbol.to_string()))
    }

    /// Like [`rule`](Self::rule), but also rejects suspended instruments.
    pub async fn tradable_rule(&self, symbol: &str) -> RegistryResult<InstrumentRule> {
        let rule = self.rule(symbol).await?;
        if !rule.is_trading() {
            return Err(RegistryError::NotTrading(
                symbol.to_string(),
                format!("{:?}", rule.status),
            ));
        }
        Ok(rule)
    }

    /// Force a refresh regardless of TTL. Used at startup so the first
    /// trade does not pay the fetch latency.
    pub async fn refresh(&self) -> RegistryResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_swap().await.map(|_| ())
    }

    pub fn cached_symbols(&self) -> usize {
        self.table
            .read()
            .as_ref()
            .map(|t| t.rules.len())
            .unwrap_or(0)
    }

    async fn fresh_table(&self) -> RegistryResult<Arc<Table>> {
        if let Some(table) = self.current_if_fresh() {
            return Ok(table);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while this one waited.
        if let Some(table) = self.current_if_fresh() {
            return Ok(table);
        }

        match self.fetch_and_swap().await {
            Ok(table) => Ok(table),
            Err(err) => {
                // Stale-serve: fall back to the expired table if any.
                if let Some(stale) = self.table.read().as_ref().cloned() {
                    tracing::warn!(
                        error = %err,
                        age_secs = stale.fetched_at.elapsed().as_secs(),
                        "instrument refresh failed, serving stale table"
                    );
                    return Ok(stale);
                }
                Err(err)
            }
        }
    }

    fn current_if_fresh(&self) -> Option<Arc<Table>> {
        let guard = self.table.read();
        let table = guard.as_ref()?;
        (table.fetched_at.elapsed() < self.ttl).then(|| Arc::clone(table))
    }

    async fn fetch_and_swap(&self) -> RegistryResult<Arc<Table>> {
        let raw = self
            .exchange
            .instruments_info()
            .await
            .map_err(RegistryError::NoData)?;
        let rules: HashMap<String, InstrumentRule> = raw
            .iter()
            .map(|r| (r.symbol.clone(), InstrumentRule::from_raw(r)))
            .collect();
        tracing::info!(symbols = rules.len(), "instrument table refreshed");
        let table = Arc::new(Table {
            rules,
            fetched_at: Instant::now(),
        });
        *self.table.write() = Some(Arc::clone(&table));
        Ok(table)
    }
}
