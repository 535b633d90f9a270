//! Adverse-move hedge.

use crate::config::StrategyConfig;
use crate::strategies::{Strategy, StrategyAction, TriggerOnce};
use ordex_core::{Price, TradeRecord};
use rust_decimal::Decimal;

/// Opens one opposite-direction market order sized to the full position
/// when the adverse move from the original entry reaches the trigger.
/// Retries are bounded; after the budget is spent the hedge goes inert
/// rather than hammering a failing venue.
pub struct Hedge {
    trigger_pct: Decimal,
    trigger: TriggerOnce,
}

impl Hedge {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            trigger_pct: config.hedge_trigger_pct,
            trigger: TriggerOnce::with_max_attempts(config.hedge_max_attempts),
        }
    }
}

impl Strategy for Hedge {
    fn name(&self) -> &'static str {
        "hedge"
    }

    fn evaluate(&mut self, trade: &TradeRecord, price: Price) -> Vec<StrategyAction> {
        if self.trigger.is_fired() || !trade.filled_qty.is_positive() {
            return Vec::new();
        }
        let Some(entry) = trade.original_entry_price() else {
            return Vec::new();
        };
        let Some(gain) = trade.direction.gain_pct(entry, price) else {
            return Vec::new();
        };
        if gain > -self.trigger_pct {
            return Vec::new();
        }
        self.trigger.fire();
        vec![StrategyAction::OpenHedge {
            qty: trade.filled_qty,
        }]
    }

    fn action_succeeded(&mut self, trade: &mut TradeRecord, action: &StrategyAction) {
        if matches!(action, StrategyAction::OpenHedge { .. }) {
            trade.hedge_count = trade.hedge_count.saturating_add(1);
        }
    }

    fn action_failed(&mut self, action: &StrategyAction) {
        if matches!(action, StrategyAction::OpenHedge { .. }) && !self.trigger.revert() {
            tracing::warn!(
                attempts = self.trigger.failed_attempts(),
                "hedge retries exhausted, strategy inert"
            );
        }
    }
}
