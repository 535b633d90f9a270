//! Application wiring and run loop.
//!
//! Builds every shared component once, then drives two loops: the feed
//! task (connect, subscribe, reconnect with backoff) and the main loop
//! that turns `signal` topic messages into trade tasks.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::sink::{DiscardStore, LogSink};
use crate::snapshot::RestSnapshot;
use ordex_core::TradeSignal;
use ordex_exchange::{CircuitBreaker, ExchangeApi, ExchangeClient, GuardedExchange};
use ordex_gate::{ConfirmationGate, TimelineLogger};
use ordex_registry::QuantizationRegistry;
use ordex_trade::{TradeLifecycle, TradeResult, TradeSlots};
use ordex_ws::{FeedConfig, FeedConnection, FeedMessage, GapDetector, SequenceTracker, TradingPause};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connections that die after living at least this long reset the
/// reconnect backoff.
const STABLE_CONNECTION: Duration = Duration::from_secs(60);

/// Main application: owns the wiring, drives the run loop.
pub struct Application {
    config: AppConfig,
    exchange: Arc<dyn ExchangeApi>,
    registry: Arc<QuantizationRegistry>,
    gate: Arc<ConfirmationGate>,
    pause: Arc<TradingPause>,
    snapshots: Arc<RestSnapshot>,
    gap: Arc<GapDetector>,
    lifecycle: Arc<TradeLifecycle>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = ExchangeClient::new(config.client_config()?)?;
        let breaker = Arc::new(CircuitBreaker::default());
        let exchange: Arc<dyn ExchangeApi> =
            Arc::new(GuardedExchange::new(Arc::new(client), breaker));

        let registry = Arc::new(QuantizationRegistry::new(exchange.clone()));
        let timeline = Arc::new(TimelineLogger::new());
        let gate = Arc::new(ConfirmationGate::new(
            timeline,
            Arc::new(LogSink),
            Arc::new(DiscardStore),
        ));

        let pause = Arc::new(TradingPause::new());
        let snapshots = Arc::new(RestSnapshot::new(exchange.clone()));
        let gap = Arc::new(GapDetector::new(
            Arc::new(SequenceTracker::new()),
            pause.clone(),
            snapshots.clone(),
        ));

        let slots = Arc::new(TradeSlots::new(config.trade.max_concurrent_trades));
        let lifecycle = Arc::new(TradeLifecycle::new(
            exchange.clone(),
            registry.clone(),
            gate.clone(),
            pause.clone(),
            slots,
            config.trade.clone(),
        ));

        Ok(Self {
            config,
            exchange,
            registry,
            gate,
            pause,
            snapshots,
            gap,
            lifecycle,
        })
    }

    /// Run until ctrl-c. Active trades are given the shutdown token and
    /// awaited before returning.
    pub async fn run(&self) -> AppResult<()> {
        // Warm the instrument table so the first trade does not pay the
        // fetch latency. A failure here is not fatal; the first lookup
        // retries.
        if let Err(err) = self.registry.refresh().await {
            warn!(error = %err, "initial instrument refresh failed");
        } else {
            info!(symbols = self.registry.cached_symbols(), "instrument table warmed");
        }

        let shutdown = CancellationToken::new();
        let (feed_tx, mut feed_rx) = mpsc::channel::<FeedMessage>(256);
        let feed_task = tokio::spawn(Self::feed_loop(
            self.config.clone(),
            self.gap.clone(),
            feed_tx,
            shutdown.clone(),
        ));

        let mut trades: JoinSet<(String, TradeResult<ordex_core::TradeRecord>)> = JoinSet::new();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    shutdown.cancel();
                    break;
                }
                msg = feed_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_feed_message(msg, &shutdown, &mut trades),
                        None => {
                            error!("feed channel closed");
                            shutdown.cancel();
                            break;
                        }
                    }
                }
                Some(joined) = trades.join_next(), if !trades.is_empty() => {
                    self.handle_trade_result(joined);
                }
            }
        }

        // Drain in-flight trades; each observes the cancelled token and
        // stops issuing orders.
        while let Some(joined) = trades.join_next().await {
            self.handle_trade_result(joined);
        }
        let _ = feed_task.await;

        info!("application stopped");
        Ok(())
    }

    fn handle_feed_message(
        &self,
        msg: FeedMessage,
        shutdown: &CancellationToken,
        trades: &mut JoinSet<(String, TradeResult<ordex_core::TradeRecord>)>,
    ) {
        match msg.topic.as_str() {
            "signal" => match serde_json::from_value::<TradeSignal>(msg.data) {
                Ok(signal) => {
                    info!(
                        symbol = %signal.symbol,
                        direction = %signal.direction,
                        source_id = %signal.source_id,
                        "signal received"
                    );
                    let symbol = signal.symbol.clone();
                    self.snapshots.track(&symbol);
                    let lifecycle = self.lifecycle.clone();
                    let token = shutdown.child_token();
                    trades.spawn(async move {
                        let result = lifecycle.run(signal, token).await;
                        (symbol, result)
                    });
                }
                Err(err) => warn!(error = %err, "malformed signal payload dropped"),
            },
            // Execution and position updates feed the gap detector inside
            // the connection; the trade tasks poll REST for authoritative
            // state, so here they are observability only.
            other => debug!(topic = other, "feed update"),
        }
    }

    fn handle_trade_result(
        &self,
        joined: Result<(String, TradeResult<ordex_core::TradeRecord>), tokio::task::JoinError>,
    ) {
        match joined {
            Ok((symbol, Ok(record))) => {
                self.snapshots.untrack(&symbol);
                info!(
                    trade_id = %record.trade_id,
                    status = %record.status,
                    "trade task finished"
                );
            }
            Ok((symbol, Err(err))) => {
                self.snapshots.untrack(&symbol);
                warn!(symbol = %symbol, error = %err, "trade task ended with error");
            }
            Err(err) => error!(error = %err, "trade task panicked"),
        }
    }

    /// One reconnecting feed connection for the life of the process.
    async fn feed_loop(
        config: AppConfig,
        gap: Arc<GapDetector>,
        out: mpsc::Sender<FeedMessage>,
        shutdown: CancellationToken,
    ) {
        let feed = FeedConnection::new(
            FeedConfig {
                url: config.exchange.ws_url.clone(),
                topics: config.feed.topics.clone(),
            },
            gap,
        );
        let base_delay = Duration::from_millis(config.feed.reconnect_base_delay_ms);
        let max_delay = Duration::from_millis(config.feed.reconnect_max_delay_ms);
        let mut delay = base_delay;

        while !shutdown.is_cancelled() {
            let connected_at = Instant::now();
            match feed.run(out.clone(), shutdown.clone()).await {
                Ok(()) => break,
                Err(err) => {
                    if connected_at.elapsed() >= STABLE_CONNECTION {
                        delay = base_delay;
                    }
                    warn!(error = %err, delay_ms = delay.as_millis() as u64, "feed connection lost");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = (delay * 2).min(max_delay);
                }
            }
        }
        info!("feed loop stopped");
    }

    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    pub fn exchange(&self) -> &Arc<dyn ExchangeApi> {
        &self.exchange
    }

    pub fn pause(&self) -> &Arc<TradingPause> {
        &self.pause
    }
}
