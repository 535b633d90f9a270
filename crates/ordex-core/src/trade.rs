//! Per-trade state owned by one lifecycle task.

use crate::decimal::{Price, Qty};
use crate::error::{CoreError, Result};
use crate::order::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique trade identifier: `{symbol}_{timestamp_ms}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(String);

impl TradeId {
    pub fn new(symbol: &str) -> Self {
        Self(format!("{symbol}_{}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    Init,
    LeverageSet,
    EntryPlaced,
    EntryFilled,
    ExitPlaced,
    Running,
    TpHit,
    SlHit,
    HedgeActive,
    ReentryAttempt,
    Closed,
    Error,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::LeverageSet => "LEVERAGE_SET",
            Self::EntryPlaced => "ENTRY_PLACED",
            Self::EntryFilled => "ENTRY_FILLED",
            Self::ExitPlaced => "EXIT_PLACED",
            Self::Running => "RUNNING",
            Self::TpHit => "TP_HIT",
            Self::SlHit => "SL_HIT",
            Self::HedgeActive => "HEDGE_ACTIVE",
            Self::ReentryAttempt => "REENTRY_ATTEMPT",
            Self::Closed => "CLOSED",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// State of one trade, exclusively owned by its lifecycle task.
///
/// `original_entry_price` is set exactly once, on the first observed fill,
/// and is immutable afterwards. Every percentage trigger in the system is
/// computed from it, never from the volume-weighted average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: TradeId,
    pub symbol: String,
    pub direction: Direction,
    original_entry_price: Option<Price>,
    /// Volume-weighted average entry, updated on every fill.
    pub avg_entry_price: Price,
    pub filled_qty: Qty,
    pub leverage: Decimal,
    /// Initial margin allocated to the trade, in quote units.
    pub initial_margin: Decimal,
    pub status: TradeStatus,
    pub pyramid_level: u8,
    pub hedge_count: u8,
    pub reentry_count: u8,
    pub breakeven_activated: bool,
    pub trailing_activated: bool,
    pub opened_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(trade_id: TradeId, symbol: String, direction: Direction) -> Self {
        Self {
            trade_id,
            symbol,
            direction,
            original_entry_price: None,
            avg_entry_price: Price::ZERO,
            filled_qty: Qty::ZERO,
            leverage: Decimal::ONE,
            initial_margin: Decimal::ZERO,
            status: TradeStatus::Init,
            pyramid_level: 0,
            hedge_count: 0,
            reentry_count: 0,
            breakeven_activated: false,
            trailing_activated: false,
            opened_at: Utc::now(),
        }
    }

    /// Record the first fill price. Rejects any second attempt.
    pub fn set_original_entry_price(&mut self, price: Price) -> Result<()> {
        if self.original_entry_price.is_some() {
            return Err(CoreError::EntryPriceAlreadySet(
                self.trade_id.as_str().to_string(),
            ));
        }
        self.original_entry_price = Some(price);
        self.avg_entry_price = price;
        Ok(())
    }

    pub fn original_entry_price(&self) -> Option<Price> {
        self.original_entry_price
    }

    /// Fold a fill into the volume-weighted average entry.
    pub fn apply_fill(&mut self, qty: Qty, price: Price) {
        let total = self.filled_qty + qty;
        if total.is_zero() {
            return;
        }
        let weighted =
            self.avg_entry_price.inner() * self.filled_qty.inner() + price.inner() * qty.inner();
        self.avg_entry_price = Price::new(weighted / total.inner());
        self.filled_qty = total;
    }
}
