//! Breakeven stop move.

use crate::config::StrategyConfig;
use crate::strategies::{Strategy, StrategyAction, TriggerOnce};
use ordex_core::{Direction, Price, TradeRecord};
use rust_decimal::Decimal;

/// Once the gain reaches the trigger, moves the stop to the original
/// entry plus a small cost buffer, exactly once. From then on the worst
/// case for the trade is roughly zero.
pub struct Breakeven {
    trigger_pct: Decimal,
    buffer_pct: Decimal,
    trigger: TriggerOnce,
}

impl Breakeven {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            trigger_pct: config.breakeven_trigger_pct,
            buffer_pct: config.breakeven_buffer_pct,
            trigger: TriggerOnce::new(),
        }
    }

    fn stop_for(&self, direction: Direction, entry: Price) -> Price {
        let factor = self.buffer_pct / Decimal::from(100);
        match direction {
            Direction::Long => Price::new(entry.inner() * (Decimal::ONE + factor)),
            Direction::Short => Price::new(entry.inner() * (Decimal::ONE - factor)),
        }
    }
}

impl Strategy for Breakeven {
    fn name(&self) -> &'static str {
        "breakeven"
    }

    fn evaluate(&mut self, trade: &TradeRecord, price: Price) -> Vec<StrategyAction> {
        if self.trigger.is_fired() || trade.breakeven_activated {
            return Vec::new();
        }
        let Some(entry) = trade.original_entry_price() else {
            return Vec::new();
        };
        let Some(gain) = trade.direction.gain_pct(entry, price) else {
            return Vec::new();
        };
        if gain < self.trigger_pct {
            return Vec::new();
        }
        self.trigger.fire();
        vec![StrategyAction::MoveStop {
            to: self.stop_for(trade.direction, entry),
            reason: "breakeven",
        }]
    }

    fn action_succeeded(&mut self, trade: &mut TradeRecord, action: &StrategyAction) {
        if matches!(
            action,
            StrategyAction::MoveStop {
                reason: "breakeven",
                ..
            }
        ) {
            trade.breakeven_activated = true;
        }
    }

    fn action_failed(&mut self, action: &StrategyAction) {
        if matches!(
            action,
            StrategyAction::MoveStop {
                reason: "breakeven",
                ..
            }
        ) {
            self.trigger.revert();
        }
    }
}
