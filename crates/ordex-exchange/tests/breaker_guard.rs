//! Breaker behaviour observed through the guarded venue wrapper.

use async_trait::async_trait;
use ordex_core::{EntryOrderSpec, ExitOrderSpec, HedgeOrderSpec};
use ordex_exchange::types::{
    OpenOrder, OrderAck, PositionInfo, RawInstrument, Ticker, WalletBalance,
};
use ordex_exchange::{
    CircuitBreaker, ExchangeApi, ExchangeError, ExchangeResult, GuardedExchange, TradingStopUpdate,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Venue whose ticker endpoint can be switched between healthy and
/// unreachable. Every other method is unused by these tests.
#[derive(Default)]
struct FlakyVenue {
    ticker_calls: AtomicUsize,
    unreachable: AtomicBool,
}

#[async_trait]
impl ExchangeApi for FlakyVenue {
    async fn server_time_ms(&self) -> ExchangeResult<i64> {
        unimplemented!()
    }
    async fn instruments_info(&self) -> ExchangeResult<Vec<RawInstrument>> {
        unimplemented!()
    }
    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ExchangeError::Transport("connection reset".into()));
        }
        Ok(Ticker {
            symbol: symbol.to_string(),
            last_price: Decimal::from(50000),
            mark_price: None,
        })
    }
    async fn wallet_balance(&self, _: &str) -> ExchangeResult<WalletBalance> {
        unimplemented!()
    }
    async fn set_leverage(&self, _: &str, _: Decimal) -> ExchangeResult<()> {
        // Business rejection, not a transport failure.
        Err(ExchangeError::Business {
            code: 10001,
            message: "leverage not modified".into(),
        })
    }
    async fn place_entry(&self, _: &EntryOrderSpec) -> ExchangeResult<OrderAck> {
        unimplemented!()
    }
    async fn place_exit(&self, _: &ExitOrderSpec) -> ExchangeResult<OrderAck> {
        unimplemented!()
    }
    async fn place_hedge(&self, _: &HedgeOrderSpec) -> ExchangeResult<OrderAck> {
        unimplemented!()
    }
    async fn cancel_all(&self, _: &str) -> ExchangeResult<()> {
        unimplemented!()
    }
    async fn get_order(&self, _: &str, _: &str) -> ExchangeResult<Option<OpenOrder>> {
        unimplemented!()
    }
    async fn open_orders(&self, _: &str) -> ExchangeResult<Vec<OpenOrder>> {
        unimplemented!()
    }
    async fn get_position(&self, _: &str) -> ExchangeResult<Option<PositionInfo>> {
        unimplemented!()
    }
    async fn set_trading_stop(&self, _: &str, _: &TradingStopUpdate) -> ExchangeResult<()> {
        unimplemented!()
    }
}

fn guarded(venue: Arc<FlakyVenue>, cooldown: Duration) -> GuardedExchange {
    GuardedExchange::new(venue, Arc::new(CircuitBreaker::new(5, cooldown)))
}

#[tokio::test]
async fn test_sixth_call_rejected_without_reaching_venue() {
    let venue = Arc::new(FlakyVenue::default());
    venue.unreachable.store(true, Ordering::SeqCst);
    let guard = guarded(venue.clone(), Duration::from_secs(60));

    for _ in 0..5 {
        let err = guard.get_ticker("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Transport(_)));
    }
    assert_eq!(venue.ticker_calls.load(Ordering::SeqCst), 5);

    // The circuit is open now: the call is rejected before it leaves the
    // process.
    let err = guard.get_ticker("BTCUSDT").await.unwrap_err();
    assert!(matches!(err, ExchangeError::CircuitOpen));
    assert_eq!(venue.ticker_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_probe_after_cooldown_closes_circuit() {
    let venue = Arc::new(FlakyVenue::default());
    venue.unreachable.store(true, Ordering::SeqCst);
    let guard = guarded(venue.clone(), Duration::from_millis(20));

    for _ in 0..5 {
        let _ = guard.get_ticker("BTCUSDT").await;
    }
    assert!(matches!(
        guard.get_ticker("BTCUSDT").await.unwrap_err(),
        ExchangeError::CircuitOpen
    ));

    venue.unreachable.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Half-open probe succeeds and the circuit stays closed after it.
    guard.get_ticker("BTCUSDT").await.unwrap();
    guard.get_ticker("BTCUSDT").await.unwrap();
    assert_eq!(venue.ticker_calls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_business_rejections_leave_circuit_closed() {
    let venue = Arc::new(FlakyVenue::default());
    let guard = guarded(venue.clone(), Duration::from_secs(60));

    for _ in 0..10 {
        let err = guard.set_leverage("BTCUSDT", Decimal::from(10)).await;
        assert!(matches!(err, Err(ExchangeError::Business { .. })));
    }
    // The venue answered every time, so the breaker never opened.
    guard.get_ticker("BTCUSDT").await.unwrap();
}
