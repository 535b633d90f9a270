//! Tunable parameters for the trade lifecycle and strategies.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

fn default_base_margin() -> Decimal {
    dec!(20)
}
fn default_min_margin() -> Decimal {
    dec!(20)
}
fn default_max_margin() -> Decimal {
    dec!(100)
}
fn default_max_concurrent() -> usize {
    5
}
fn default_fill_poll_attempts() -> u32 {
    300
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_entry_offset_pct() -> Decimal {
    dec!(0.1)
}
fn default_max_running_errors() -> u32 {
    10
}

/// Lifecycle parameters. Strategy parameters live in [`StrategyConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct TradeConfig {
    /// Margin allocated per trade, in quote units.
    #[serde(default = "default_base_margin")]
    pub base_margin: Decimal,
    #[serde(default = "default_min_margin")]
    pub min_margin: Decimal,
    #[serde(default = "default_max_margin")]
    pub max_margin: Decimal,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_trades: usize,
    /// Interval between position polls, both while waiting for the first
    /// fill and in the running monitor loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fill_poll_attempts")]
    pub fill_poll_attempts: u32,
    /// Offset applied to the second entry when the signal carries a
    /// single entry price, in percent.
    #[serde(default = "default_entry_offset_pct")]
    pub entry_offset_pct: Decimal,
    /// Consecutive poll failures tolerated in the running loop before the
    /// trade escalates to its error path.
    #[serde(default = "default_max_running_errors")]
    pub max_running_errors: u32,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl TradeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Margin clamped to the configured band.
    pub fn margin(&self) -> Decimal {
        self.base_margin
            .max(self.min_margin)
            .min(self.max_margin)
    }

    /// Leverage rungs to try, highest first: the requested value followed
    /// by the fixed fallback ladder, skipping rungs at or above an
    /// already-rejected value.
    pub fn leverage_ladder(&self, requested: Decimal) -> Vec<Decimal> {
        let mut ladder = vec![requested];
        for rung in [dec!(10), dec!(5), dec!(3), dec!(1)] {
            if rung < requested {
                ladder.push(rung);
            }
        }
        ladder
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            base_margin: default_base_margin(),
            min_margin: default_min_margin(),
            max_margin: default_max_margin(),
            max_concurrent_trades: default_max_concurrent(),
            poll_interval_ms: default_poll_interval_ms(),
            fill_poll_attempts: default_fill_poll_attempts(),
            entry_offset_pct: default_entry_offset_pct(),
            max_running_errors: default_max_running_errors(),
            strategy: StrategyConfig::default(),
        }
    }
}

/// One rung of the pyramid ladder.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PyramidLevel {
    /// Favorable move from the original entry, in percent.
    pub trigger_pct: Decimal,
    /// Margin added at this rung, in quote units. Zero for a
    /// leverage-only rung.
    pub add_margin: Decimal,
    /// Leverage to raise to at this rung, if any.
    pub raise_leverage_to: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "StrategyConfig::default_pyramid_levels")]
    pub pyramid_levels: Vec<PyramidLevel>,
    #[serde(default = "StrategyConfig::default_trailing_arm_pct")]
    pub trailing_arm_pct: Decimal,
    #[serde(default = "StrategyConfig::default_trailing_distance_pct")]
    pub trailing_distance_pct: Decimal,
    /// Adverse move that opens the hedge, in percent (positive number).
    #[serde(default = "StrategyConfig::default_hedge_trigger_pct")]
    pub hedge_trigger_pct: Decimal,
    #[serde(default = "StrategyConfig::default_hedge_max_attempts")]
    pub hedge_max_attempts: u32,
    #[serde(default = "StrategyConfig::default_reentry_max_attempts")]
    pub reentry_max_attempts: u8,
    /// Minimum distance from the last entry before re-entering, percent.
    #[serde(default = "StrategyConfig::default_reentry_min_distance_pct")]
    pub reentry_min_distance_pct: Decimal,
    #[serde(default = "StrategyConfig::default_breakeven_trigger_pct")]
    pub breakeven_trigger_pct: Decimal,
    /// Cost buffer added past the entry when moving the stop, percent.
    #[serde(default = "StrategyConfig::default_breakeven_buffer_pct")]
    pub breakeven_buffer_pct: Decimal,
}

impl StrategyConfig {
    fn default_pyramid_levels() -> Vec<PyramidLevel> {
        vec![
            PyramidLevel {
                trigger_pct: dec!(1.5),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
            PyramidLevel {
                trigger_pct: dec!(2.3),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
            // Leverage-only rung.
            PyramidLevel {
                trigger_pct: dec!(2.4),
                add_margin: Decimal::ZERO,
                raise_leverage_to: Some(dec!(50)),
            },
            PyramidLevel {
                trigger_pct: dec!(2.5),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
            PyramidLevel {
                trigger_pct: dec!(4.0),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
            PyramidLevel {
                trigger_pct: dec!(6.0),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
            PyramidLevel {
                trigger_pct: dec!(8.6),
                add_margin: dec!(20),
                raise_leverage_to: None,
            },
        ]
    }
    fn default_trailing_arm_pct() -> Decimal {
        dec!(6.1)
    }
    fn default_trailing_distance_pct() -> Decimal {
        dec!(2.5)
    }
    fn default_hedge_trigger_pct() -> Decimal {
        dec!(2)
    }
    fn default_hedge_max_attempts() -> u32 {
        3
    }
    fn default_reentry_max_attempts() -> u8 {
        3
    }
    fn default_reentry_min_distance_pct() -> Decimal {
        dec!(0.5)
    }
    fn default_breakeven_trigger_pct() -> Decimal {
        dec!(2.3)
    }
    fn default_breakeven_buffer_pct() -> Decimal {
        dec!(0.0015)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            pyramid_levels: Self::default_pyramid_levels(),
            trailing_arm_pct: Self::default_trailing_arm_pct(),
            trailing_distance_pct: Self::default_trailing_distance_pct(),
            hedge_trigger_pct: Self::default_hedge_trigger_pct(),
            hedge_max_attempts: Self::default_hedge_max_attempts(),
            reentry_max_attempts: Self::default_reentry_max_attempts(),
            reentry_min_distance_pct: Self::default_reentry_min_distance_pct(),
            breakeven_trigger_pct: Self::default_breakeven_trigger_pct(),
            breakeven_buffer_pct: Self::default_breakeven_buffer_pct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leverage_ladder_descends_from_requested() {
        let config = TradeConfig::default();
        assert_eq!(
            config.leverage_ladder(dec!(20)),
            vec![dec!(20), dec!(10), dec!(5), dec!(3), dec!(1)]
        );
        // A requested value inside the ladder skips rungs at or above it.
        assert_eq!(
            config.leverage_ladder(dec!(5)),
            vec![dec!(5), dec!(3), dec!(1)]
        );
    }

    #[test]
    fn test_margin_clamped_to_band() {
        let mut config = TradeConfig::default();
        config.base_margin = dec!(500);
        assert_eq!(config.margin(), dec!(100));
        config.base_margin = dec!(1);
        assert_eq!(config.margin(), dec!(20));
    }

    #[test]
    fn test_pyramid_ladder_ascending() {
        let levels = StrategyConfig::default().pyramid_levels;
        for pair in levels.windows(2) {
            assert!(pair[0].trigger_pct < pair[1].trigger_pct);
        }
    }
}
