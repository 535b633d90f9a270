//! End-to-end lifecycle runs against a scripted venue.

use async_trait::async_trait;
use ordex_core::{
    EntryOrderSpec, ExitOrderSpec, HedgeOrderSpec, Price, TradeRecord, TradeSignal, TradeStatus,
};
use ordex_exchange::types::{
    LotSizeFilter, OpenOrder, OrderAck, PositionInfo, PriceFilter, RawInstrument, Ticker,
    WalletBalance,
};
use ordex_exchange::{ExchangeApi, ExchangeResult, TradingStopUpdate};
use ordex_gate::{ConfirmationGate, NotificationSink, PersistenceStore, TimelineLogger};
use ordex_registry::QuantizationRegistry;
use ordex_trade::{TradeConfig, TradeLifecycle, TradeSlots};
use ordex_ws::TradingPause;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Scripted venue: every call acks, positions come from a script that is
/// drained one entry per `get_position` call (the last entry repeats).
#[derive(Default)]
struct ScriptedVenue {
    position_script: Mutex<VecDeque<Option<(Decimal, Decimal)>>>,
    ticker_price: Mutex<Decimal>,
    max_order_qty: Mutex<Decimal>,
    place_entry_calls: AtomicUsize,
    place_exit_calls: AtomicUsize,
    place_hedge_calls: AtomicUsize,
    cancel_all_calls: AtomicUsize,
    set_leverage_calls: AtomicUsize,
    trading_stop_calls: AtomicUsize,
}

impl ScriptedVenue {
    fn new(ticker: Decimal) -> Self {
        let venue = Self::default();
        *venue.ticker_price.lock() = ticker;
        *venue.max_order_qty.lock() = dec!(100);
        venue
    }

    fn set_max_order_qty(&self, qty: Decimal) {
        *self.max_order_qty.lock() = qty;
    }

    fn script_positions(&self, entries: impl IntoIterator<Item = Option<(Decimal, Decimal)>>) {
        let mut script = self.position_script.lock();
        script.clear();
        script.extend(entries);
    }

    fn set_ticker(&self, price: Decimal) {
        *self.ticker_price.lock() = price;
    }

    fn next_position(&self) -> Option<(Decimal, Decimal)> {
        let mut script = self.position_script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap_or(None)
        } else {
            script.front().copied().unwrap_or(None)
        }
    }

    fn ack() -> OrderAck {
        OrderAck {
            order_id: "mock-order".into(),
            order_link_id: String::new(),
        }
    }
}

#[async_trait]
impl ExchangeApi for ScriptedVenue {
    async fn server_time_ms(&self) -> ExchangeResult<i64> {
        Ok(1_700_000_000_000)
    }

    async fn instruments_info(&self) -> ExchangeResult<Vec<RawInstrument>> {
        Ok(vec![RawInstrument {
            symbol: "BTCUSDT".into(),
            status: "Trading".into(),
            price_filter: PriceFilter {
                tick_size: dec!(0.5),
            },
            lot_size_filter: LotSizeFilter {
                qty_step: dec!(0.001),
                min_order_qty: dec!(0.001),
                max_order_qty: *self.max_order_qty.lock(),
                min_notional_value: Some(dec!(5)),
            },
            leverage_filter: None,
        }])
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker {
            symbol: symbol.into(),
            last_price: *self.ticker_price.lock(),
            mark_price: None,
        })
    }

    async fn wallet_balance(&self, coin: &str) -> ExchangeResult<WalletBalance> {
        Ok(WalletBalance {
            coin: coin.into(),
            wallet_balance: dec!(1000),
            available_to_withdraw: None,
        })
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: Decimal) -> ExchangeResult<()> {
        self.set_leverage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn place_entry(&self, _spec: &EntryOrderSpec) -> ExchangeResult<OrderAck> {
        self.place_entry_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::ack())
    }

    async fn place_exit(&self, _spec: &ExitOrderSpec) -> ExchangeResult<OrderAck> {
        self.place_exit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::ack())
    }

    async fn place_hedge(&self, _spec: &HedgeOrderSpec) -> ExchangeResult<OrderAck> {
        self.place_hedge_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::ack())
    }

    async fn cancel_all(&self, _symbol: &str) -> ExchangeResult<()> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_order(&self, _: &str, _: &str) -> ExchangeResult<Option<OpenOrder>> {
        Ok(None)
    }

    async fn open_orders(&self, _: &str) -> ExchangeResult<Vec<OpenOrder>> {
        Ok(Vec::new())
    }

    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<PositionInfo>> {
        Ok(self.next_position().map(|(size, avg)| PositionInfo {
            symbol: symbol.into(),
            side: "Buy".into(),
            size,
            avg_price: Some(avg),
            leverage: None,
            liq_price: None,
            unrealised_pnl: None,
        }))
    }

    async fn set_trading_stop(&self, _: &str, _: &TradingStopUpdate) -> ExchangeResult<()> {
        self.trading_stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CaptureSink {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for CaptureSink {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct CaptureStore {
    statuses: Mutex<Vec<TradeStatus>>,
}

#[async_trait]
impl PersistenceStore for CaptureStore {
    async fn save_trade(&self, record: &TradeRecord) -> anyhow::Result<()> {
        self.statuses.lock().push(record.status);
        Ok(())
    }
}

struct Harness {
    venue: Arc<ScriptedVenue>,
    gate: Arc<ConfirmationGate>,
    sink: Arc<CaptureSink>,
    store: Arc<CaptureStore>,
    lifecycle: TradeLifecycle,
}

fn harness(venue: ScriptedVenue) -> Harness {
    let venue = Arc::new(venue);
    let sink = Arc::new(CaptureSink::default());
    let store = Arc::new(CaptureStore::default());
    let gate = Arc::new(ConfirmationGate::new(
        Arc::new(TimelineLogger::new()),
        sink.clone(),
        store.clone(),
    ));
    let registry = Arc::new(QuantizationRegistry::new(venue.clone()));
    let mut config = TradeConfig::default();
    config.poll_interval_ms = 1;
    config.fill_poll_attempts = 20;
    let lifecycle = TradeLifecycle::new(
        venue.clone(),
        registry,
        gate.clone(),
        Arc::new(TradingPause::new()),
        Arc::new(TradeSlots::new(config.max_concurrent_trades)),
        config,
    );
    Harness {
        venue,
        gate,
        sink,
        store,
        lifecycle,
    }
}

fn long_signal() -> TradeSignal {
    TradeSignal {
        symbol: "BTCUSDT".into(),
        direction: ordex_core::Direction::Long,
        entries: vec![Price::new(dec!(50000))],
        leverage: dec!(10),
        take_profits: vec![Price::new(dec!(51500))],
        stop_loss: Some(Price::new(dec!(49000))),
        source_id: "sig-1".into(),
    }
}

#[tokio::test]
async fn test_scenario_always_acking_venue_reaches_running_then_closes() {
    let venue = ScriptedVenue::new(dec!(50000));
    // One empty poll, then filled at exactly the signal entry, held for a
    // few monitor polls, then flat.
    venue.script_positions([
        None,
        Some((dec!(0.004), dec!(50000))),
        Some((dec!(0.004), dec!(50000))),
        Some((dec!(0.004), dec!(50000))),
        None,
    ]);
    let h = harness(venue);
    // In profit, but below every strategy trigger.
    h.venue.set_ticker(dec!(50250));

    let record = h
        .lifecycle
        .run(long_signal(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, TradeStatus::Closed);
    assert_eq!(
        record.original_entry_price().unwrap(),
        Price::new(dec!(50000))
    );

    // The persisted history proves the trade passed through EntryFilled
    // and Running on its way to Closed.
    let statuses = h.store.statuses.lock().clone();
    let filled_at = statuses
        .iter()
        .position(|s| *s == TradeStatus::EntryFilled)
        .expect("EntryFilled persisted");
    let running_at = statuses
        .iter()
        .position(|s| *s == TradeStatus::Running)
        .expect("Running persisted");
    assert!(filled_at < running_at);
    assert_eq!(statuses.last(), Some(&TradeStatus::Closed));

    // Dual entries: exactly two post-only entry orders.
    assert_eq!(h.venue.place_entry_calls.load(Ordering::SeqCst), 2);

    // Every notification in the run passed through the gate in order.
    assert!(h.gate.timeline().compliance_report().is_compliant());
    assert!(!h.sink.messages.lock().is_empty());
}

#[tokio::test]
async fn test_scenario_trailing_arms_and_cancels_exactly_once() {
    let venue = ScriptedVenue::new(dec!(50000));
    // Fill, then stay open for ~60 monitor polls at +6.1%, then flat.
    let mut script: Vec<Option<(Decimal, Decimal)>> =
        vec![Some((dec!(0.004), dec!(50000))); 60];
    script.push(None);
    venue.script_positions(script);
    let h = harness(venue);
    h.venue.set_ticker(dec!(53050));

    let record = h
        .lifecycle
        .run(long_signal(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, TradeStatus::Closed);
    assert!(record.trailing_activated);
    // Armed once: the resting take-profits were cancelled exactly once
    // despite dozens of polls above the arm threshold.
    assert_eq!(h.venue.cancel_all_calls.load(Ordering::SeqCst), 1);
    assert!(h.gate.timeline().compliance_report().is_compliant());
}

#[tokio::test]
async fn test_stop_loss_with_exhausted_reentries_closes() {
    let venue = ScriptedVenue::new(dec!(50000));
    // Four passes (initial entry plus three re-entries), each fill-poll /
    // open-monitor-poll / flat. The venue keeps reporting the average at
    // 50000 while the ticker sits 3% below, so every stop-out qualifies
    // for a re-entry until the attempt cap is spent.
    let fill = Some((dec!(0.004), dec!(50000)));
    venue.script_positions([
        fill, fill, None, fill, fill, None, fill, fill, None, fill, fill, None,
    ]);
    let h = harness(venue);
    h.venue.set_ticker(dec!(48500));

    let record = h
        .lifecycle
        .run(long_signal(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, TradeStatus::Closed);
    // Three re-entries were attempted before closing for good: the first
    // entry pass plus three re-entry passes, two orders each.
    assert_eq!(record.reentry_count, 3);
    assert_eq!(h.venue.place_entry_calls.load(Ordering::SeqCst), 8);

    let statuses = h.store.statuses.lock().clone();
    assert!(statuses.contains(&TradeStatus::SlHit));
    assert!(statuses.contains(&TradeStatus::ReentryAttempt));
}

#[tokio::test]
async fn test_invalid_signal_rejected_with_notification() {
    let h = harness(ScriptedVenue::new(dec!(50000)));
    let mut signal = long_signal();
    signal.entries.clear();

    let err = h
        .lifecycle
        .run(signal, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ordex_trade::TradeError::SignalRejected(_)));

    // Exactly one explanatory notification, recorded as a local decision.
    assert_eq!(h.sink.messages.lock().len(), 1);
    assert!(h.gate.timeline().verify_sequence("signal_sig-1").is_ok());
    // No orders were attempted.
    assert_eq!(h.venue.place_entry_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsizable_signal_rejected_before_any_venue_call() {
    // The instrument's quantity cap is so tight that the minimum-notional
    // raise gets clamped back below the notional floor: sizing fails.
    let venue = ScriptedVenue::new(dec!(100));
    venue.set_max_order_qty(dec!(0.002));
    let h = harness(venue);
    let mut signal = long_signal();
    signal.entries = vec![Price::new(dec!(100))];
    signal.take_profits = vec![Price::new(dec!(103))];
    signal.stop_loss = Some(Price::new(dec!(98)));

    let err = h
        .lifecycle
        .run(signal, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ordex_trade::TradeError::Registry(_)));

    // Rejected before the trade existed: no leverage call, no orders, no
    // persisted record, just the one explanatory notification.
    assert_eq!(h.venue.set_leverage_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.venue.place_entry_calls.load(Ordering::SeqCst), 0);
    assert!(h.store.statuses.lock().is_empty());
    assert_eq!(h.sink.messages.lock().len(), 1);
    assert!(h.gate.timeline().verify_sequence("signal_sig-1").is_ok());
}

#[tokio::test]
async fn test_fill_timeout_drives_error_then_closed() {
    let venue = ScriptedVenue::new(dec!(50000));
    venue.script_positions([None]);
    let h = harness(venue);

    let record = h
        .lifecycle
        .run(long_signal(), CancellationToken::new())
        .await
        .unwrap();

    // The trade failed but still reached Closed through the error path.
    assert_eq!(record.status, TradeStatus::Closed);
    let statuses = h.store.statuses.lock().clone();
    assert!(statuses.contains(&TradeStatus::Error));
    // Cleanup cancelled resting orders.
    assert!(h.venue.cancel_all_calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_shutdown_cancels_cooperatively() {
    let venue = ScriptedVenue::new(dec!(50000));
    // Position never fills; the task would poll for a long time.
    venue.script_positions([None]);
    let h = harness(venue);

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let err = h
        .lifecycle
        .run(long_signal(), shutdown)
        .await
        .unwrap_err();
    assert!(matches!(err, ordex_trade::TradeError::Cancelled));
}
