//! Pyramid scale-in ladder.

use crate::config::{PyramidLevel, StrategyConfig};
use crate::strategies::{Strategy, StrategyAction, TriggerOnce};
use ordex_core::{Price, TradeRecord};

/// Ordered ladder of profit triggers, each adding margin or raising
/// leverage. Levels fire lowest-first, at most once each; a level whose
/// trigger was gapped over still fires on the poll that observes the
/// higher price, one level per poll.
pub struct Pyramid {
    levels: Vec<(PyramidLevel, TriggerOnce)>,
}

impl Pyramid {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            levels: config
                .pyramid_levels
                .iter()
                .cloned()
                .map(|level| (level, TriggerOnce::new()))
                .collect(),
        }
    }

    fn level_index(&self, action: &StrategyAction) -> Option<usize> {
        match action {
            StrategyAction::AddMargin { level, .. }
            | StrategyAction::RaiseLeverage { level, .. } => Some(*level as usize),
            _ => None,
        }
    }
}

impl Strategy for Pyramid {
    fn name(&self) -> &'static str {
        "pyramid"
    }

    fn evaluate(&mut self, trade: &TradeRecord, price: Price) -> Vec<StrategyAction> {
        let Some(entry) = trade.original_entry_price() else {
            return Vec::new();
        };
        let Some(gain) = trade.direction.gain_pct(entry, price) else {
            return Vec::new();
        };

        for (idx, (level, trigger)) in self.levels.iter_mut().enumerate() {
            if trigger.is_fired() || gain < level.trigger_pct {
                continue;
            }
            trigger.fire();
            let action = if let Some(leverage) = level.raise_leverage_to {
                StrategyAction::RaiseLeverage {
                    level: idx as u8,
                    leverage,
                }
            } else {
                StrategyAction::AddMargin {
                    level: idx as u8,
                    margin: level.add_margin,
                }
            };
            // One rung per poll; the next poll picks up the next rung.
            return vec![action];
        }
        Vec::new()
    }

    fn action_succeeded(&mut self, trade: &mut TradeRecord, action: &StrategyAction) {
        if self.level_index(action).is_some() {
            trade.pyramid_level = trade.pyramid_level.saturating_add(1);
            if let StrategyAction::RaiseLeverage { leverage, .. } = action {
                trade.leverage = *leverage;
            }
        }
    }

    fn action_failed(&mut self, action: &StrategyAction) {
        if let Some(idx) = self.level_index(action) {
            if let Some((level, trigger)) = self.levels.get_mut(idx) {
                if !trigger.revert() {
                    tracing::warn!(
                        trigger_pct = %level.trigger_pct,
                        "pyramid rung exhausted its retries, now inert"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordex_core::{Direction, TradeId};
    use rust_decimal_macros::dec;

    fn trade() -> TradeRecord {
        let mut t = TradeRecord::new(TradeId::new("BTCUSDT"), "BTCUSDT".into(), Direction::Long);
        t.set_original_entry_price(Price::new(dec!(100))).unwrap();
        t
    }

    fn succeed_all(pyramid: &mut Pyramid, trade: &mut TradeRecord, price: Price) -> usize {
        let actions = pyramid.evaluate(trade, price);
        for action in &actions {
            pyramid.action_succeeded(trade, action);
        }
        actions.len()
    }

    #[test]
    fn test_levels_fire_once_despite_oscillation() {
        let mut pyramid = Pyramid::new(&StrategyConfig::default());
        let mut t = trade();

        // Cross +1.5%, retreat, cross again: a single fire.
        assert_eq!(succeed_all(&mut pyramid, &mut t, Price::new(dec!(101.6))), 1);
        assert_eq!(succeed_all(&mut pyramid, &mut t, Price::new(dec!(100.5))), 0);
        assert_eq!(succeed_all(&mut pyramid, &mut t, Price::new(dec!(101.6))), 0);
        assert_eq!(t.pyramid_level, 1);
    }

    #[test]
    fn test_gapped_levels_fire_one_per_poll() {
        let mut pyramid = Pyramid::new(&StrategyConfig::default());
        let mut t = trade();

        // Price jumps straight past the first four rungs; they drain one
        // per poll in ladder order.
        let price = Price::new(dec!(103));
        for expected_level in 1..=4u8 {
            assert_eq!(succeed_all(&mut pyramid, &mut t, price), 1);
            assert_eq!(t.pyramid_level, expected_level);
        }
        assert_eq!(succeed_all(&mut pyramid, &mut t, price), 0);
    }

    #[test]
    fn test_leverage_only_rung() {
        let mut pyramid = Pyramid::new(&StrategyConfig::default());
        let mut t = trade();

        succeed_all(&mut pyramid, &mut t, Price::new(dec!(101.6)));
        succeed_all(&mut pyramid, &mut t, Price::new(dec!(102.35)));
        // Third rung (+2.4%) raises leverage instead of margin.
        let actions = pyramid.evaluate(&t, Price::new(dec!(102.45)));
        assert_eq!(
            actions,
            vec![StrategyAction::RaiseLeverage {
                level: 2,
                leverage: dec!(50)
            }]
        );
        pyramid.action_succeeded(&mut t, &actions[0]);
        assert_eq!(t.leverage, dec!(50));
    }

    #[test]
    fn test_failure_rearms_rung() {
        let mut pyramid = Pyramid::new(&StrategyConfig::default());
        let mut t = trade();

        let actions = pyramid.evaluate(&t, Price::new(dec!(101.6)));
        assert_eq!(actions.len(), 1);
        pyramid.action_failed(&actions[0]);

        // Same rung offered again on the next poll.
        let retry = pyramid.evaluate(&t, Price::new(dec!(101.6)));
        assert_eq!(retry, actions);
    }

    #[test]
    fn test_short_direction_uses_adverse_sign() {
        let mut pyramid = Pyramid::new(&StrategyConfig::default());
        let mut t = TradeRecord::new(TradeId::new("BTCUSDT"), "BTCUSDT".into(), Direction::Short);
        t.set_original_entry_price(Price::new(dec!(100))).unwrap();

        // Price up is adverse for a short: no rung fires.
        assert_eq!(succeed_all(&mut pyramid, &mut t, Price::new(dec!(102))), 0);
        // Price down 1.6% is favorable: first rung fires.
        assert_eq!(succeed_all(&mut pyramid, &mut t, Price::new(dec!(98.4))), 1);
    }
}
