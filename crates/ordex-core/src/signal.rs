//! Normalized upstream trade request.
//!
//! Signal text parsing happens upstream; the core only ever sees this
//! struct.

use crate::decimal::Price;
use crate::error::{CoreError, Result};
use crate::order::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quote asset suffix accepted for tradable symbols.
pub const QUOTE_ASSET: &str = "USDT";

/// Maximum leverage accepted from a signal.
pub const MAX_SIGNAL_LEVERAGE: u32 = 100;

/// A normalized trade request from the signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Instrument symbol, e.g. "BTCUSDT".
    pub symbol: String,
    pub direction: Direction,
    /// One or two entry prices. A single price is split into two offset legs.
    pub entries: Vec<Price>,
    pub leverage: Decimal,
    /// Take-profit targets, nearest first.
    pub take_profits: Vec<Price>,
    pub stop_loss: Option<Price>,
    /// Identifier of the originating signal channel.
    pub source_id: String,
}

impl TradeSignal {
    /// Validate the signal before any network call is made.
    ///
    /// Rejected signals never become a trade.
    pub fn validate(&self) -> Result<()> {
        if !self.symbol.ends_with(QUOTE_ASSET) {
            return Err(CoreError::InvalidSignal(format!(
                "symbol {} does not end in {QUOTE_ASSET}",
                self.symbol
            )));
        }
        if self.entries.is_empty() {
            return Err(CoreError::InvalidSignal(
                "at least one entry price is required".into(),
            ));
        }
        if self.entries.iter().any(|e| !e.is_positive()) {
            return Err(CoreError::InvalidSignal(
                "entry prices must be positive".into(),
            ));
        }
        if self.leverage <= Decimal::ZERO || self.leverage > Decimal::from(MAX_SIGNAL_LEVERAGE) {
            return Err(CoreError::InvalidSignal(format!(
                "leverage {} outside (0, {MAX_SIGNAL_LEVERAGE}]",
                self.leverage
            )));
        }
        if self.take_profits.is_empty() && self.stop_loss.is_none() {
            return Err(CoreError::InvalidSignal(
                "signal must carry at least one take-profit or a stop-loss".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_signal() -> TradeSignal {
        TradeSignal {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            entries: vec![Price::new(dec!(50000))],
            leverage: dec!(10),
            take_profits: vec![Price::new(dec!(51500))],
            stop_loss: Some(Price::new(dec!(49000))),
            source_id: "channel-1".into(),
        }
    }

    #[test]
    fn test_valid_signal_passes() {
        assert!(valid_signal().validate().is_ok());
    }

    #[test]
    fn test_rejects_wrong_quote_asset() {
        let mut signal = valid_signal();
        signal.symbol = "BTCUSD".into();
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_rejects_no_entries() {
        let mut signal = valid_signal();
        signal.entries.clear();
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_leverage() {
        let mut signal = valid_signal();
        signal.leverage = dec!(0);
        assert!(signal.validate().is_err());

        signal.leverage = dec!(101);
        assert!(signal.validate().is_err());

        signal.leverage = dec!(100);
        assert!(signal.validate().is_ok());
    }

    #[test]
    fn test_rejects_no_exit_targets() {
        let mut signal = valid_signal();
        signal.take_profits.clear();
        signal.stop_loss = None;
        assert!(signal.validate().is_err());
    }
}
