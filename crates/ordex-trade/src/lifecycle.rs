//! The per-trade task: signal to terminal state.

use crate::config::TradeConfig;
use crate::error::{TradeError, TradeResult};
use crate::fsm;
use crate::slots::TradeSlots;
use crate::strategies::{self, ReentryDecision, ReentryPolicy, Strategy, StrategyAction};
use ordex_core::{
    ClientOrderId, Direction, EntryOrderSpec, ExitOrderSpec, HedgeOrderSpec, Price, Qty,
    TradeId, TradeRecord, TradeSignal, TradeStatus,
};
use ordex_exchange::{ExchangeApi, ExchangeError, TradingStopUpdate};
use ordex_gate::ConfirmationGate;
use ordex_registry::{InstrumentRule, PositionSizeCalculator, QuantizationRegistry, RegistryError};
use ordex_ws::TradingPause;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why the running monitor loop ended.
enum MonitorOutcome {
    /// Position went flat while in profit relative to the original entry.
    TakeProfit,
    /// Position went flat at a loss; carries the last observed price.
    StopLoss(Price),
}

/// Drives one trade from signal acceptance to `Closed`.
///
/// Owns no shared state itself; every collaborator is injected. One
/// `run` call is one trade, expected to be spawned as its own task.
pub struct TradeLifecycle {
    exchange: Arc<dyn ExchangeApi>,
    registry: Arc<QuantizationRegistry>,
    gate: Arc<ConfirmationGate>,
    pause: Arc<TradingPause>,
    slots: Arc<TradeSlots>,
    config: TradeConfig,
}

impl TradeLifecycle {
    pub fn new(
        exchange: Arc<dyn ExchangeApi>,
        registry: Arc<QuantizationRegistry>,
        gate: Arc<ConfirmationGate>,
        pause: Arc<TradingPause>,
        slots: Arc<TradeSlots>,
        config: TradeConfig,
    ) -> Self {
        Self {
            exchange,
            registry,
            gate,
            pause,
            slots,
            config,
        }
    }

    /// Run one trade to a terminal state. Always returns the final record
    /// on a trade that got far enough to exist; pre-trade rejections
    /// return the error alone.
    pub async fn run(
        &self,
        signal: TradeSignal,
        shutdown: CancellationToken,
    ) -> TradeResult<TradeRecord> {
        if let Err(err) = signal.validate() {
            self.reject(&signal, &format!("invalid signal: {err}")).await;
            return Err(TradeError::SignalRejected(err.to_string()));
        }

        let _slot = match self.slots.try_acquire() {
            Ok(slot) => slot,
            Err(err) => {
                self.reject(&signal, "concurrent trade limit reached").await;
                return Err(err);
            }
        };

        let rule = match self.registry.tradable_rule(&signal.symbol).await {
            Ok(rule) => rule,
            Err(err) => {
                self.reject(&signal, &format!("symbol not tradable: {err}")).await;
                return Err(err.into());
            }
        };

        // Size against the signal before anything touches the venue. A
        // signal the instrument cannot fit is rejected outright; no trade
        // record exists and no leverage call goes out.
        let leverage = signal.leverage.min(rule.max_leverage);
        let reference = rule.quantize_price(signal.entries[0]);
        let sized =
            match PositionSizeCalculator::size(&rule, self.config.margin(), leverage, reference) {
                Ok(sized) => sized,
                Err(err) => {
                    self.reject(&signal, &format!("sizing failed: {err}")).await;
                    return Err(err.into());
                }
            };
        let first_half = rule.quantize_qty(Qty::new(sized.qty.inner() / Decimal::TWO));
        if !first_half.is_positive() || !(sized.qty - first_half).is_positive() {
            let reason = format!(
                "sized quantity {} cannot be split into two valid entries",
                sized.qty
            );
            self.reject(&signal, &reason).await;
            return Err(TradeError::SignalRejected(reason));
        }

        let mut record = TradeRecord::new(
            TradeId::new(&signal.symbol),
            signal.symbol.clone(),
            signal.direction,
        );

        match self.drive(&mut record, &signal, &rule, &shutdown).await {
            Ok(()) => {
                let summary = format!(
                    "trade {} closed: {} {} filled {} at avg {}",
                    record.trade_id,
                    record.direction,
                    record.symbol,
                    record.filled_qty,
                    record.avg_entry_price
                );
                self.gate
                    .confirm_local(
                        &format!("{}_closed", record.trade_id),
                        "close trade",
                        &summary,
                    )
                    .await;
                Ok(record)
            }
            Err(TradeError::Cancelled) => {
                // Shutdown: stop issuing orders, leave resting state for
                // the operator. The record stays at its current state.
                tracing::warn!(trade_id = %record.trade_id, "trade task cancelled by shutdown");
                Err(TradeError::Cancelled)
            }
            Err(err) => {
                self.fail_trade(&mut record, &err).await;
                Ok(record)
            }
        }
    }

    async fn drive(
        &self,
        record: &mut TradeRecord,
        signal: &TradeSignal,
        rule: &InstrumentRule,
        shutdown: &CancellationToken,
    ) -> TradeResult<()> {
        self.set_leverage_ladder(record, signal.leverage, rule).await?;

        let mut entry_reference = rule.quantize_price(signal.entries[0]);
        loop {
            self.place_entries(record, signal, rule, entry_reference, shutdown)
                .await?;
            self.await_fill(record, entry_reference, shutdown).await?;
            self.place_exits(record, signal, rule).await;
            self.transition(record, TradeStatus::Running).await?;

            match self.monitor(record, rule, shutdown).await? {
                MonitorOutcome::TakeProfit => {
                    self.transition(record, TradeStatus::TpHit).await?;
                    self.transition(record, TradeStatus::Closed).await?;
                    return Ok(());
                }
                MonitorOutcome::StopLoss(_) => {
                    self.transition(record, TradeStatus::SlHit).await?;
                    let last_entry = record.avg_entry_price;
                    match self.reentry_price(record, last_entry, shutdown).await? {
                        Some(price) => {
                            self.transition(record, TradeStatus::ReentryAttempt).await?;
                            record.reentry_count += 1;
                            self.gate
                                .confirm_local(
                                    &format!(
                                        "{}_reentry_{}",
                                        record.trade_id, record.reentry_count
                                    ),
                                    "approve re-entry",
                                    &format!(
                                        "re-entry {} of {} for {} at {price}",
                                        record.reentry_count,
                                        self.config.strategy.reentry_max_attempts,
                                        record.symbol
                                    ),
                                )
                                .await;
                            entry_reference = rule.quantize_price(price);
                        }
                        None => {
                            self.transition(record, TradeStatus::Closed).await?;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Set leverage, walking the fallback ladder on business rejections.
    async fn set_leverage_ladder(
        &self,
        record: &mut TradeRecord,
        requested: Decimal,
        rule: &InstrumentRule,
    ) -> TradeResult<()> {
        let requested = requested.min(rule.max_leverage);
        for rung in self.config.leverage_ladder(requested) {
            let op_id = format!("{}_leverage_{rung}", record.trade_id);
            let symbol = record.symbol.clone();
            let result = self
                .gate
                .confirm(
                    &op_id,
                    "set leverage",
                    self.exchange.set_leverage(&symbol, rung),
                    |_| format!("{symbol}: leverage set to {rung}x"),
                )
                .await;
            match result {
                Ok(()) => {
                    record.leverage = rung;
                    self.transition(record, TradeStatus::LeverageSet).await?;
                    return Ok(());
                }
                Err(ExchangeError::Business { code, message }) => {
                    tracing::warn!(
                        symbol = %record.symbol,
                        %rung,
                        code,
                        %message,
                        "leverage rung rejected, trying next"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(TradeError::LeverageExhausted {
            symbol: record.symbol.clone(),
        })
    }

    /// Place the two post-only entries.
    async fn place_entries(
        &self,
        record: &mut TradeRecord,
        signal: &TradeSignal,
        rule: &InstrumentRule,
        reference: Price,
        shutdown: &CancellationToken,
    ) -> TradeResult<()> {
        let sized = PositionSizeCalculator::size(
            rule,
            self.config.margin(),
            record.leverage,
            reference,
        )?;
        record.initial_margin = sized.effective_margin;

        let first_half = rule.quantize_qty(Qty::new(sized.qty.inner() / Decimal::TWO));
        let second_half = sized.qty - first_half;
        if !first_half.is_positive() || !second_half.is_positive() {
            return Err(TradeError::SignalRejected(format!(
                "sized quantity {} cannot be split into two valid entries",
                sized.qty
            )));
        }

        // Two explicit prices from the signal when available; otherwise
        // the reference and a 0.1% deeper offset.
        let (first_price, second_price) = if record.reentry_count == 0 && signal.entries.len() >= 2
        {
            (
                rule.quantize_price(signal.entries[0]),
                rule.quantize_price(signal.entries[1]),
            )
        } else {
            (reference, self.offset_entry(record.direction, reference, rule))
        };

        let pass = record.reentry_count;
        for (n, (price, qty)) in [(first_price, first_half), (second_price, second_half)]
            .into_iter()
            .enumerate()
        {
            self.pause_or_cancel(shutdown).await?;
            if !rule.validate_qty(qty) || !rule.validate_notional(qty, price) {
                return Err(RegistryError::Sizing(format!(
                    "entry leg {qty} @ {price} violates {} order filters",
                    record.symbol
                ))
                .into());
            }
            let spec = EntryOrderSpec::new(
                record.symbol.clone(),
                record.direction.entry_side(),
                qty,
                price,
                ClientOrderId::tagged(&format!("entry{pass}")),
            )?;
            let op_id = format!("{}_entry_{pass}_{n}", record.trade_id);
            let symbol = record.symbol.clone();
            self.gate
                .confirm(
                    &op_id,
                    "place entry",
                    self.exchange.place_entry(&spec),
                    move |ack| {
                        format!("{symbol}: entry {qty} @ {price} accepted ({})", ack.order_id)
                    },
                )
                .await?;
        }

        self.transition(record, TradeStatus::EntryPlaced).await
    }

    fn offset_entry(&self, direction: Direction, reference: Price, rule: &InstrumentRule) -> Price {
        let factor = self.config.entry_offset_pct / Decimal::from(100);
        let offset = match direction {
            Direction::Long => Price::new(reference.inner() * (Decimal::ONE - factor)),
            Direction::Short => Price::new(reference.inner() * (Decimal::ONE + factor)),
        };
        rule.quantize_price(offset)
    }

    /// Poll the position until the first fill or the poll budget runs out.
    async fn await_fill(
        &self,
        record: &mut TradeRecord,
        fallback_price: Price,
        shutdown: &CancellationToken,
    ) -> TradeResult<()> {
        for _ in 0..self.config.fill_poll_attempts {
            self.pause_or_cancel(shutdown).await?;
            match self.exchange.get_position(&record.symbol).await {
                Ok(Some(position)) if !position.size.is_zero() => {
                    let fill_price = position
                        .avg_price
                        .map(Price::new)
                        .unwrap_or(fallback_price);
                    if record.original_entry_price().is_none() {
                        record.set_original_entry_price(fill_price)?;
                    }
                    record.avg_entry_price = fill_price;
                    record.filled_qty = Qty::new(position.size);
                    return self.transition(record, TradeStatus::EntryFilled).await;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        trade_id = %record.trade_id,
                        error = %err,
                        "fill poll failed, will retry"
                    );
                }
            }
            self.sleep_or_cancel(self.config.poll_interval(), shutdown).await?;
        }
        Err(TradeError::FillTimeout {
            polls: self.config.fill_poll_attempts,
        })
    }

    /// Place the protective exits. Failures are logged and reported but do
    /// not abort the trade: the position must stay manageable, and the
    /// strategies can still move stops later.
    async fn place_exits(
        &self,
        record: &mut TradeRecord,
        signal: &TradeSignal,
        rule: &InstrumentRule,
    ) {
        let primary_tp = signal
            .take_profits
            .first()
            .map(|tp| rule.quantize_price(*tp));
        let stop_loss = signal.stop_loss.map(|sl| rule.quantize_price(sl));

        let update = TradingStopUpdate {
            take_profit: primary_tp,
            stop_loss,
        };
        let op_id = format!("{}_exits_{}", record.trade_id, record.reentry_count);
        let symbol = record.symbol.clone();
        let result = self
            .gate
            .confirm(
                &op_id,
                "set trading stop",
                self.exchange.set_trading_stop(&record.symbol, &update),
                move |_| format!("{symbol}: exits set tp={primary_tp:?} sl={stop_loss:?}"),
            )
            .await;
        if let Err(err) = result {
            tracing::error!(
                trade_id = %record.trade_id,
                error = %err,
                "primary exit placement failed, trade continues unprotected"
            );
        }

        // Additional take-profit tiers as resting reduce-only limits,
        // splitting the position evenly across tiers.
        let extra_tps = &signal.take_profits[signal.take_profits.len().min(1)..];
        if !extra_tps.is_empty() {
            let tiers = Decimal::from(extra_tps.len() as u64 + 1);
            let per_tier = rule.quantize_qty(Qty::new(record.filled_qty.inner() / tiers));
            for (n, tp) in extra_tps.iter().enumerate() {
                if !per_tier.is_positive() {
                    break;
                }
                let tier_price = rule.quantize_price(*tp);
                if !rule.validate_qty(per_tier) || !rule.validate_notional(per_tier, tier_price) {
                    tracing::warn!(
                        trade_id = %record.trade_id,
                        qty = %per_tier,
                        price = %tier_price,
                        "take-profit tier violates order filters, skipped"
                    );
                    continue;
                }
                let spec = match ExitOrderSpec::take_profit(
                    record.symbol.clone(),
                    record.direction.exit_side(),
                    per_tier,
                    rule.quantize_price(*tp),
                    ClientOrderId::tagged(&format!("tp{}", n + 2)),
                ) {
                    Ok(spec) => spec,
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping invalid take-profit tier");
                        continue;
                    }
                };
                let op_id = format!("{}_tp_{}", record.trade_id, n + 2);
                let symbol = record.symbol.clone();
                let price = rule.quantize_price(*tp);
                if let Err(err) = self
                    .gate
                    .confirm(
                        &op_id,
                        "place take-profit tier",
                        self.exchange.place_exit(&spec),
                        move |_| format!("{symbol}: tp tier {per_tier} @ {price}"),
                    )
                    .await
                {
                    tracing::warn!(error = %err, "take-profit tier placement failed");
                }
            }
        }

        if let Err(err) = fsm::advance(record, TradeStatus::ExitPlaced) {
            tracing::error!(trade_id = %record.trade_id, error = %err, "exit transition refused");
            return;
        }
        self.gate.persist(record).await;
    }

    /// The running monitor loop: poll position, feed strategies, detect
    /// the flat condition.
    async fn monitor(
        &self,
        record: &mut TradeRecord,
        rule: &InstrumentRule,
        shutdown: &CancellationToken,
    ) -> TradeResult<MonitorOutcome> {
        let mut strategies = strategies::poll_set(&self.config.strategy);
        let mut consecutive_errors: u32 = 0;
        let mut last_price = record.avg_entry_price;

        loop {
            self.pause_or_cancel(shutdown).await?;

            let position = match self.exchange.get_position(&record.symbol).await {
                Ok(position) => {
                    consecutive_errors = 0;
                    position
                }
                Err(err) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        trade_id = %record.trade_id,
                        consecutive_errors,
                        error = %err,
                        "position poll failed"
                    );
                    if consecutive_errors >= self.config.max_running_errors {
                        return Err(err.into());
                    }
                    self.sleep_or_cancel(self.config.poll_interval(), shutdown).await?;
                    continue;
                }
            };

            let Some(position) = position.filter(|p| !p.size.is_zero()) else {
                // Flat: classify the exit by the last price seen.
                let original = record
                    .original_entry_price()
                    .unwrap_or(record.avg_entry_price);
                let gain = record
                    .direction
                    .gain_pct(original, last_price)
                    .unwrap_or(Decimal::ZERO);
                return if gain >= Decimal::ZERO {
                    Ok(MonitorOutcome::TakeProfit)
                } else {
                    Ok(MonitorOutcome::StopLoss(last_price))
                };
            };

            record.filled_qty = Qty::new(position.size);
            if let Some(avg) = position.avg_price {
                record.avg_entry_price = Price::new(avg);
            }

            match self.exchange.get_ticker(&record.symbol).await {
                Ok(ticker) => {
                    last_price = Price::new(ticker.last_price);
                    for strategy in strategies.iter_mut() {
                        let actions = strategy.evaluate(record, last_price);
                        for action in actions {
                            self.execute_action(record, rule, strategy.as_mut(), &action)
                                .await?;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        trade_id = %record.trade_id,
                        error = %err,
                        "ticker poll failed, strategies skipped this cycle"
                    );
                }
            }

            self.sleep_or_cancel(self.config.poll_interval(), shutdown).await?;
        }
    }

    /// Execute one strategy action through the gate and report back.
    /// Venue failures are absorbed here: the strategy decides whether to
    /// re-arm, and the monitor loop keeps running.
    async fn execute_action(
        &self,
        record: &mut TradeRecord,
        rule: &InstrumentRule,
        strategy: &mut dyn Strategy,
        action: &StrategyAction,
    ) -> TradeResult<()> {
        let trade_id = record.trade_id.clone();
        let symbol = record.symbol.clone();
        let result: Result<(), ExchangeError> = match action {
            StrategyAction::AddMargin { level, margin } => {
                let price = match self.exchange.get_ticker(&symbol).await {
                    Ok(t) => rule.quantize_price(Price::new(t.last_price)),
                    Err(err) => {
                        strategy.action_failed(action);
                        tracing::warn!(error = %err, "no price for pyramid add");
                        return Ok(());
                    }
                };
                match PositionSizeCalculator::size(rule, *margin, record.leverage, price) {
                    Ok(sized) => {
                        let spec = EntryOrderSpec::new(
                            symbol.clone(),
                            record.direction.entry_side(),
                            sized.qty,
                            price,
                            ClientOrderId::tagged(&format!("pyr{level}")),
                        )?;
                        let op_id = format!("{trade_id}_pyramid_{level}");
                        let qty = sized.qty;
                        self.gate
                            .confirm(
                                &op_id,
                                "pyramid add margin",
                                self.exchange.place_entry(&spec),
                                move |_| {
                                    format!("{symbol}: pyramid level {level} adds {qty} @ {price}")
                                },
                            )
                            .await
                            .map(|_| ())
                    }
                    Err(err) => {
                        strategy.action_failed(action);
                        tracing::warn!(error = %err, "pyramid sizing failed");
                        return Ok(());
                    }
                }
            }
            StrategyAction::RaiseLeverage { level, leverage } => {
                let leverage = (*leverage).min(rule.max_leverage);
                let op_id = format!("{trade_id}_pyramid_{level}");
                let lev = leverage;
                self.gate
                    .confirm(
                        &op_id,
                        "pyramid raise leverage",
                        self.exchange.set_leverage(&symbol.clone(), leverage),
                        move |_| format!("{symbol}: pyramid level {level} raises leverage to {lev}x"),
                    )
                    .await
            }
            StrategyAction::CancelRestingTakeProfits => {
                let op_id = format!("{trade_id}_trailing_cancel");
                self.gate
                    .confirm(
                        &op_id,
                        "cancel resting take-profits",
                        self.exchange.cancel_all(&symbol.clone()),
                        move |_| format!("{symbol}: take-profits cancelled, trailing active"),
                    )
                    .await
            }
            StrategyAction::MoveStop { to, reason } => {
                let stop = rule.quantize_price(*to);
                let update = TradingStopUpdate::stop_loss(stop);
                let op_id = format!("{trade_id}_{}_{stop}", reason.replace(' ', "_"));
                self.gate
                    .confirm(
                        &op_id,
                        reason,
                        self.exchange.set_trading_stop(&symbol.clone(), &update),
                        move |_| format!("{symbol}: stop moved to {stop} ({reason})"),
                    )
                    .await
            }
            StrategyAction::OpenHedge { qty } => {
                let spec = HedgeOrderSpec::new(
                    symbol.clone(),
                    record.direction.exit_side(),
                    *qty,
                    ClientOrderId::tagged("hedge"),
                )?;
                let op_id = format!("{trade_id}_hedge");
                let qty = *qty;
                let result = self
                    .gate
                    .confirm(
                        &op_id,
                        "open hedge",
                        self.exchange.place_hedge(&spec),
                        move |_| format!("{symbol}: hedge {qty} opened"),
                    )
                    .await
                    .map(|_| ());
                if result.is_ok() {
                    // Mark the excursion through the hedge state.
                    self.transition(record, TradeStatus::HedgeActive).await?;
                    self.transition(record, TradeStatus::Running).await?;
                }
                result
            }
        };

        match result {
            Ok(()) => {
                strategy.action_succeeded(record, action);
                self.gate.persist(record).await;
            }
            Err(err) => {
                strategy.action_failed(action);
                tracing::warn!(
                    trade_id = %record.trade_id,
                    strategy = strategy.name(),
                    error = %err,
                    "strategy action failed at the venue"
                );
            }
        }
        Ok(())
    }

    /// After a stop-out, wait for the re-entry policy to approve a price
    /// or report exhaustion. Bounded by the same poll budget as the fill
    /// wait so a flat market cannot park the task forever.
    async fn reentry_price(
        &self,
        record: &TradeRecord,
        last_entry: Price,
        shutdown: &CancellationToken,
    ) -> TradeResult<Option<Price>> {
        let policy = ReentryPolicy::new(&self.config.strategy);
        for _ in 0..self.config.fill_poll_attempts {
            self.pause_or_cancel(shutdown).await?;
            let price = match self.exchange.get_ticker(&record.symbol).await {
                Ok(ticker) => Price::new(ticker.last_price),
                Err(err) => {
                    tracing::warn!(error = %err, "ticker poll failed during re-entry wait");
                    self.sleep_or_cancel(self.config.poll_interval(), shutdown).await?;
                    continue;
                }
            };
            match policy.decide(record, last_entry, price) {
                ReentryDecision::Approved { .. } => return Ok(Some(price)),
                ReentryDecision::Exhausted => return Ok(None),
                ReentryDecision::TooClose => {
                    self.sleep_or_cancel(self.config.poll_interval(), shutdown).await?;
                }
            }
        }
        tracing::info!(
            trade_id = %record.trade_id,
            "re-entry window expired without an approved price"
        );
        Ok(None)
    }

    /// Error path: exactly one explanatory notification, then best-effort
    /// cleanup, then `Closed`.
    async fn fail_trade(&self, record: &mut TradeRecord, err: &TradeError) {
        let op_id = format!("{}_error", record.trade_id);
        self.gate
            .report_failure(
                &op_id,
                &format!("trade {} failed: {err}", record.trade_id),
            )
            .await;

        if fsm::advance(record, TradeStatus::Error).is_ok() {
            self.gate.persist(record).await;
        }

        if let Err(cancel_err) = self.exchange.cancel_all(&record.symbol).await {
            tracing::warn!(error = %cancel_err, "cleanup cancel-all failed");
        }
        match self.exchange.get_position(&record.symbol).await {
            Ok(Some(position)) if !position.size.is_zero() => {
                let spec = ExitOrderSpec::market_close(
                    record.symbol.clone(),
                    record.direction.exit_side(),
                    Qty::new(position.size),
                    ClientOrderId::tagged("errclose"),
                );
                match spec {
                    Ok(spec) => {
                        if let Err(close_err) = self.exchange.place_exit(&spec).await {
                            tracing::error!(
                                error = %close_err,
                                "best-effort close failed, residual position remains"
                            );
                        }
                    }
                    Err(spec_err) => {
                        tracing::error!(error = %spec_err, "could not build close order");
                    }
                }
            }
            Ok(_) => {}
            Err(pos_err) => {
                tracing::warn!(error = %pos_err, "could not confirm residual position");
            }
        }

        if let Err(final_err) = fsm::advance(record, TradeStatus::Closed) {
            tracing::error!(error = %final_err, "trade could not reach Closed");
        }
        self.gate.persist(record).await;
    }

    async fn reject(&self, signal: &TradeSignal, reason: &str) {
        let op_id = format!("signal_{}", signal.source_id);
        self.gate
            .confirm_local(
                &op_id,
                "reject signal",
                &format!("signal for {} rejected: {reason}", signal.symbol),
            )
            .await;
    }

    async fn transition(&self, record: &mut TradeRecord, to: TradeStatus) -> TradeResult<()> {
        fsm::advance(record, to)?;
        self.gate.persist(record).await;
        Ok(())
    }

    async fn pause_or_cancel(&self, shutdown: &CancellationToken) -> TradeResult<()> {
        if shutdown.is_cancelled() {
            return Err(TradeError::Cancelled);
        }
        self.pause.wait_if_paused().await;
        if shutdown.is_cancelled() {
            return Err(TradeError::Cancelled);
        }
        Ok(())
    }

    async fn sleep_or_cancel(
        &self,
        duration: Duration,
        shutdown: &CancellationToken,
    ) -> TradeResult<()> {
        tokio::select! {
            _ = shutdown.cancelled() => Err(TradeError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
