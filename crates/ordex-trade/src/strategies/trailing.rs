//! Trailing stop.

use crate::config::StrategyConfig;
use crate::strategies::{Strategy, StrategyAction, TriggerOnce};
use ordex_core::{Direction, Price, TradeRecord};
use rust_decimal::Decimal;

/// Arms at a fixed gain, then keeps a stop a fixed distance behind the
/// best price seen since arming. Arming cancels resting take-profits so
/// the trail, not a limit order, decides the exit. The stop only ever
/// moves in the favorable direction.
pub struct Trailing {
    arm_pct: Decimal,
    distance_pct: Decimal,
    arm: TriggerOnce,
    peak: Option<Price>,
    current_stop: Option<Price>,
}

impl Trailing {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            arm_pct: config.trailing_arm_pct,
            distance_pct: config.trailing_distance_pct,
            arm: TriggerOnce::new(),
            peak: None,
            current_stop: None,
        }
    }

    fn stop_for(&self, direction: Direction, peak: Price) -> Price {
        let factor = self.distance_pct / Decimal::from(100);
        match direction {
            Direction::Long => Price::new(peak.inner() * (Decimal::ONE - factor)),
            Direction::Short => Price::new(peak.inner() * (Decimal::ONE + factor)),
        }
    }

    fn is_improvement(&self, direction: Direction, candidate: Price) -> bool {
        match (direction, self.current_stop) {
            (_, None) => true,
            (Direction::Long, Some(current)) => candidate > current,
            (Direction::Short, Some(current)) => candidate < current,
        }
    }

    fn more_favorable(direction: Direction, a: Price, b: Price) -> bool {
        match direction {
            Direction::Long => a > b,
            Direction::Short => a < b,
        }
    }
}

impl Strategy for Trailing {
    fn name(&self) -> &'static str {
        "trailing"
    }

    fn evaluate(&mut self, trade: &TradeRecord, price: Price) -> Vec<StrategyAction> {
        let Some(entry) = trade.original_entry_price() else {
            return Vec::new();
        };
        let Some(gain) = trade.direction.gain_pct(entry, price) else {
            return Vec::new();
        };

        if !self.arm.is_fired() {
            if gain < self.arm_pct {
                return Vec::new();
            }
            self.arm.fire();
            self.peak = Some(price);
            let stop = self.stop_for(trade.direction, price);
            return vec![
                StrategyAction::CancelRestingTakeProfits,
                StrategyAction::MoveStop {
                    to: stop,
                    reason: "trailing armed",
                },
            ];
        }

        // Armed: ratchet the peak and the stop, favorable direction only.
        let peak = match self.peak {
            Some(peak) if Self::more_favorable(trade.direction, price, peak) => {
                self.peak = Some(price);
                price
            }
            Some(peak) => peak,
            None => {
                self.peak = Some(price);
                price
            }
        };
        let candidate = self.stop_for(trade.direction, peak);
        if self.is_improvement(trade.direction, candidate) && self.current_stop != Some(candidate) {
            return vec![StrategyAction::MoveStop {
                to: candidate,
                reason: "trailing advance",
            }];
        }
        Vec::new()
    }

    fn action_succeeded(&mut self, trade: &mut TradeRecord, action: &StrategyAction) {
        match action {
            StrategyAction::CancelRestingTakeProfits => {
                trade.trailing_activated = true;
            }
            StrategyAction::MoveStop { to, .. } => {
                self.current_stop = Some(*to);
            }
            _ => {}
        }
    }

    fn action_failed(&mut self, action: &StrategyAction) {
        // A failed cancel un-arms the whole strategy so the next poll
        // re-runs the arming pair. A failed stop move retries naturally on
        // the next poll because current_stop was never advanced.
        if matches!(action, StrategyAction::CancelRestingTakeProfits) {
            self.arm.revert();
            self.peak = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordex_core::TradeId;
    use rust_decimal_macros::dec;

    fn trade() -> TradeRecord {
        let mut t = TradeRecord::new(TradeId::new("BTCUSDT"), "BTCUSDT".into(), Direction::Long);
        t.set_original_entry_price(Price::new(dec!(100))).unwrap();
        t
    }

    fn apply(trailing: &mut Trailing, trade: &mut TradeRecord, price: Price) -> Vec<StrategyAction> {
        let actions = trailing.evaluate(trade, price);
        for action in &actions {
            trailing.action_succeeded(trade, action);
        }
        actions
    }

    #[test]
    fn test_arms_once_at_threshold() {
        let mut trailing = Trailing::new(&StrategyConfig::default());
        let mut t = trade();

        assert!(apply(&mut trailing, &mut t, Price::new(dec!(105))).is_empty());

        let actions = apply(&mut trailing, &mut t, Price::new(dec!(106.1)));
        assert_eq!(actions[0], StrategyAction::CancelRestingTakeProfits);
        assert!(matches!(actions[1], StrategyAction::MoveStop { .. }));
        assert!(t.trailing_activated);

        // Fifty more polls at the same price: no further cancels, no stop
        // churn.
        for _ in 0..50 {
            assert!(apply(&mut trailing, &mut t, Price::new(dec!(106.1))).is_empty());
        }
    }

    #[test]
    fn test_stop_ratchets_with_peak() {
        let mut trailing = Trailing::new(&StrategyConfig::default());
        let mut t = trade();

        apply(&mut trailing, &mut t, Price::new(dec!(106.1)));

        // New peak: stop follows 2.5% behind.
        let actions = apply(&mut trailing, &mut t, Price::new(dec!(110)));
        assert_eq!(
            actions,
            vec![StrategyAction::MoveStop {
                to: Price::new(dec!(107.250)),
                reason: "trailing advance",
            }]
        );

        // Retreat below the peak: stop stays where it is.
        assert!(apply(&mut trailing, &mut t, Price::new(dec!(108))).is_empty());
    }

    #[test]
    fn test_failed_cancel_rearms() {
        let mut trailing = Trailing::new(&StrategyConfig::default());
        let t = trade();

        let actions = trailing.evaluate(&t, Price::new(dec!(106.1)));
        trailing.action_failed(&actions[0]);

        // Next poll re-issues the full arming pair.
        let retry = trailing.evaluate(&t, Price::new(dec!(106.1)));
        assert_eq!(retry[0], StrategyAction::CancelRestingTakeProfits);
    }
}
