//! Re-entry after a stop-out.

use crate::config::StrategyConfig;
use ordex_core::{Price, TradeRecord};
use rust_decimal::Decimal;

/// Outcome of consulting the policy after a stop-loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentryDecision {
    /// Re-enter with the original position size.
    Approved { attempt: u8 },
    /// Price has not yet moved far enough from the last entry.
    TooClose,
    /// The attempt cap is spent; the trade closes.
    Exhausted,
}

/// Decides whether a stopped-out trade may re-enter. Unlike the polled
/// strategies this is consulted by the lifecycle from its stop-loss path,
/// not on every price tick.
pub struct ReentryPolicy {
    max_attempts: u8,
    min_distance_pct: Decimal,
}

impl ReentryPolicy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            max_attempts: config.reentry_max_attempts,
            min_distance_pct: config.reentry_min_distance_pct,
        }
    }

    pub fn decide(
        &self,
        trade: &TradeRecord,
        last_entry: Price,
        current: Price,
    ) -> ReentryDecision {
        if trade.reentry_count >= self.max_attempts {
            return ReentryDecision::Exhausted;
        }
        let distance = match current.pct_from(last_entry) {
            Some(pct) => pct.abs(),
            None => return ReentryDecision::TooClose,
        };
        if distance < self.min_distance_pct {
            return ReentryDecision::TooClose;
        }
        ReentryDecision::Approved {
            attempt: trade.reentry_count + 1,
        }
    }
}
