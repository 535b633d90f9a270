//! Circuit breaker shared by every venue caller.
//!
//! Five consecutive failures open the circuit; while open, calls are
//! rejected immediately with `ExchangeError::CircuitOpen`. After the
//! cooldown one probe is let through (half-open): success closes the
//! circuit and resets the failure count, failure re-opens it and restarts
//! the cooldown.

use crate::api::{ExchangeApi, TradingStopUpdate};
use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{OpenOrder, OrderAck, PositionInfo, RawInstrument, Ticker, WalletBalance};
use async_trait::async_trait;
use ordex_core::{EntryOrderSpec, ExitOrderSpec, HedgeOrderSpec};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Failure-counting circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
            failure_threshold,
            cooldown,
        }
    }

    /// Current state, promoting Open to HalfOpen once the cooldown expires.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Whether a call may proceed right now. In HalfOpen this admits the
    /// probe call.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        inner.state != BreakerState::Open
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == BreakerState::HalfOpen {
            tracing::info!("circuit breaker closed after successful probe");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        match inner.state {
            BreakerState::HalfOpen => {
                // Probe failed: back to Open, cooldown restarts.
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!("circuit breaker probe failed, re-opening");
            }
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    fn refresh(&self, inner: &mut BreakerInner) {
        if inner.state == BreakerState::Open {
            if let Some(opened) = inner.opened_at {
                if opened.elapsed() >= self.cooldown {
                    inner.state = BreakerState::HalfOpen;
                    tracing::info!("circuit breaker half-open, admitting probe");
                }
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

/// Wraps an `ExchangeApi` so every call passes through one shared breaker.
///
/// All consumers hold the same `GuardedExchange`, so failures seen by any
/// caller protect every other caller.
pub struct GuardedExchange {
    inner: Arc<dyn ExchangeApi>,
    breaker: Arc<CircuitBreaker>,
}

impl GuardedExchange {
    pub fn new(inner: Arc<dyn ExchangeApi>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    async fn guarded<T, F>(&self, fut: F) -> ExchangeResult<T>
    where
        F: std::future::Future<Output = ExchangeResult<T>>,
    {
        if !self.breaker.can_execute() {
            return Err(ExchangeError::CircuitOpen);
        }
        match fut.await {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(err) => {
                // Business rejections are the venue answering, not the venue
                // being unreachable. Only transport-class failures trip the
                // breaker.
                if matches!(err, ExchangeError::Transport(_)) {
                    self.breaker.record_failure();
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ExchangeApi for GuardedExchange {
    async fn server_time_ms(&self) -> ExchangeResult<i64> {
        self.guarded(self.inner.server_time_ms()).await
    }

    async fn instruments_info(&self) -> ExchangeResult<Vec<RawInstrument>> {
        self.guarded(self.inner.instruments_info()).await
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        self.guarded(self.inner.get_ticker(symbol)).await
    }

    async fn wallet_balance(&self, coin: &str) -> ExchangeResult<WalletBalance> {
        self.guarded(self.inner.wallet_balance(coin)).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> ExchangeResult<()> {
        self.guarded(self.inner.set_leverage(symbol, leverage)).await
    }

    async fn place_entry(&self, spec: &EntryOrderSpec) -> ExchangeResult<OrderAck> {
        self.guarded(self.inner.place_entry(spec)).await
    }

    async fn place_exit(&self, spec: &ExitOrderSpec) -> ExchangeResult<OrderAck> {
        self.guarded(self.inner.place_exit(spec)).await
    }

    async fn place_hedge(&self, spec: &HedgeOrderSpec) -> ExchangeResult<OrderAck> {
        self.guarded(self.inner.place_hedge(spec)).await
    }

    async fn cancel_all(&self, symbol: &str) -> ExchangeResult<()> {
        self.guarded(self.inner.cancel_all(symbol)).await
    }

    async fn get_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Option<OpenOrder>> {
        self.guarded(self.inner.get_order(symbol, order_id)).await
    }

    async fn open_orders(&self, symbol: &str) -> ExchangeResult<Vec<OpenOrder>> {
        self.guarded(self.inner.open_orders(symbol)).await
    }

    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<PositionInfo>> {
        self.guarded(self.inner.get_position(symbol)).await
    }

    async fn set_trading_stop(
        &self,
        symbol: &str,
        update: &TradingStopUpdate,
    ) -> ExchangeResult<()> {
        self.guarded(self.inner.set_trading_stop(symbol, update))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn test_success_resets_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        // Zero cooldown: immediately eligible for a probe.
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.can_execute());

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_failed_probe_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        // Cooldown is zero so the state report promotes straight back to
        // HalfOpen, but the failure count shows the probe was rejected.
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }
}
