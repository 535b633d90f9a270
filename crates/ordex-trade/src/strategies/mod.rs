//! Exposure-management strategies attached to a running trade.
//!
//! Strategies are pure deciders: `evaluate` reads the trade and the
//! current price and emits actions; the lifecycle executes those actions
//! through the confirmation gate and reports the outcome back. Keeping
//! execution out of the strategies means every trigger is exercised in
//! tests without a venue.
//!
//! Every percentage trigger is computed from the trade's original entry
//! price, never from the volume-weighted average.

pub mod breakeven;
pub mod hedge;
pub mod pyramid;
pub mod reentry;
pub mod trailing;
pub mod trigger;

pub use breakeven::Breakeven;
pub use hedge::Hedge;
pub use pyramid::Pyramid;
pub use reentry::{ReentryDecision, ReentryPolicy};
pub use trailing::Trailing;
pub use trigger::TriggerOnce;

use crate::config::StrategyConfig;
use ordex_core::{Price, Qty, TradeRecord};
use rust_decimal::Decimal;

/// One venue mutation requested by a strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyAction {
    /// Pyramid rung: add margin by placing a further post-only entry at
    /// the current price.
    AddMargin { level: u8, margin: Decimal },
    /// Pyramid rung: raise position leverage without adding margin.
    RaiseLeverage { level: u8, leverage: Decimal },
    /// Trailing arm: cancel resting take-profits below the arm threshold.
    CancelRestingTakeProfits,
    /// Move the position stop. Emitted by breakeven once and by trailing
    /// every time the favorable extreme advances.
    MoveStop { to: Price, reason: &'static str },
    /// Open the opposite-direction hedge sized to the full position.
    OpenHedge { qty: Qty },
}

/// A trigger-and-act sub-state-machine polled from the trade's own task.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Decide what, if anything, to do at this price.
    fn evaluate(&mut self, trade: &TradeRecord, price: Price) -> Vec<StrategyAction>;

    /// The action was executed and acknowledged; advance internal state
    /// and the strategy's own counters on the record.
    fn action_succeeded(&mut self, trade: &mut TradeRecord, action: &StrategyAction);

    /// The action failed at the venue; re-arm so the next poll retries,
    /// unless a bounded retry budget is exhausted.
    fn action_failed(&mut self, action: &StrategyAction);
}

/// The four poll-driven strategies in evaluation order. Re-entry is not
/// polled; the lifecycle consults [`ReentryPolicy`] from the stop-loss
/// path instead.
pub fn poll_set(config: &StrategyConfig) -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(Breakeven::new(config)),
        Box::new(Pyramid::new(config)),
        Box::new(Trailing::new(config)),
        Box::new(Hedge::new(config)),
    ]
}
