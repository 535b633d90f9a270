//! Order-related types and identifiers.
//!
//! Entry and exit orders are separate types with validating constructors:
//! an `EntryOrderSpec` is always post-only and never reduce-only, an
//! `ExitOrderSpec` is always reduce-only. Code that holds one of these
//! values cannot violate the order-flag invariants.

use crate::decimal::{Price, Qty};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trade direction from the upstream signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Order side that opens or increases a position in this direction.
    pub fn entry_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Order side that reduces a position in this direction.
    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }

    /// Signed percentage gain of `current` relative to `entry`, positive
    /// when the move is favorable for this direction.
    pub fn gain_pct(&self, entry: Price, current: Price) -> Option<rust_decimal::Decimal> {
        let pct = current.pct_from(entry)?;
        Some(match self {
            Self::Long => pct,
            Self::Short => -pct,
        })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[serde(rename = "GTC")]
    GoodTilCancelled,
    /// Immediate-or-cancel (market orders).
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Rejected rather than executed as a taker (entry orders).
    #[serde(rename = "PostOnly")]
    PostOnly,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilCancelled => write!(f, "GTC"),
            Self::ImmediateOrCancel => write!(f, "IOC"),
            Self::PostOnly => write!(f, "PostOnly"),
        }
    }
}

/// Client order ID for idempotency.
///
/// Every order carries a unique id so a retried submission can never be
/// double-executed by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `ordex_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("ordex_{ts}_{uuid_short}"))
    }

    /// Derive an id with a role prefix, e.g. `hedge_`, `reentry_2_`.
    pub fn tagged(tag: &str) -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("{tag}_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A position-opening limit order.
///
/// Always `post_only`, never `reduce_only`; the constructor is the only
/// way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOrderSpec {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub price: Price,
    pub link_id: ClientOrderId,
}

impl EntryOrderSpec {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        price: Price,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        if !qty.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "entry qty must be positive, got {qty}"
            )));
        }
        if !price.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "entry price must be positive, got {price}"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            side,
            qty,
            price,
            link_id,
        })
    }

    pub fn time_in_force(&self) -> TimeInForce {
        TimeInForce::PostOnly
    }

    pub fn reduce_only(&self) -> bool {
        false
    }
}

/// An opposite-direction market order that opens a hedge leg.
///
/// Not reduce-only: on a hedged account it opens a counter-position
/// rather than closing the original one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeOrderSpec {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub link_id: ClientOrderId,
}

impl HedgeOrderSpec {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        if !qty.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "hedge qty must be positive, got {qty}"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            side,
            qty,
            link_id,
        })
    }

    pub fn time_in_force(&self) -> TimeInForce {
        TimeInForce::ImmediateOrCancel
    }

    pub fn reduce_only(&self) -> bool {
        false
    }
}

/// What kind of exit an `ExitOrderSpec` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitKind {
    /// Resting limit order at the target price.
    TakeProfit { price: Price },
    /// Conditional market order released at the trigger price.
    StopLoss { trigger: Price },
    /// Immediate market close of up to `qty`.
    MarketClose,
}

/// A position-reducing order.
///
/// Always `reduce_only`; the constructor is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOrderSpec {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub kind: ExitKind,
    pub link_id: ClientOrderId,
}

impl ExitOrderSpec {
    pub fn take_profit(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        price: Price,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        if !price.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "take-profit price must be positive, got {price}"
            )));
        }
        Self::build(symbol, side, qty, ExitKind::TakeProfit { price }, link_id)
    }

    pub fn stop_loss(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        trigger: Price,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        if !trigger.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "stop trigger must be positive, got {trigger}"
            )));
        }
        Self::build(symbol, side, qty, ExitKind::StopLoss { trigger }, link_id)
    }

    pub fn market_close(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        Self::build(symbol, side, qty, ExitKind::MarketClose, link_id)
    }

    fn build(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        kind: ExitKind,
        link_id: ClientOrderId,
    ) -> Result<Self> {
        if !qty.is_positive() {
            return Err(CoreError::InvalidOrderSpec(format!(
                "exit qty must be positive, got {qty}"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            side,
            qty,
            kind,
            link_id,
        })
    }

    pub fn reduce_only(&self) -> bool {
        true
    }

    pub fn time_in_force(&self) -> TimeInForce {
        match self.kind {
            ExitKind::TakeProfit { .. } => TimeInForce::GoodTilCancelled,
            ExitKind::StopLoss { .. } | ExitKind::MarketClose => TimeInForce::ImmediateOrCancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_sides() {
        assert_eq!(Direction::Long.entry_side(), OrderSide::Buy);
        assert_eq!(Direction::Long.exit_side(), OrderSide::Sell);
        assert_eq!(Direction::Short.entry_side(), OrderSide::Sell);
        assert_eq!(Direction::Short.exit_side(), OrderSide::Buy);
    }

    #[test]
    fn test_direction_gain_pct() {
        let entry = Price::new(dec!(100));

        let up = Price::new(dec!(102));
        assert_eq!(Direction::Long.gain_pct(entry, up).unwrap(), dec!(2));
        assert_eq!(Direction::Short.gain_pct(entry, up).unwrap(), dec!(-2));

        let down = Price::new(dec!(98));
        assert_eq!(Direction::Long.gain_pct(entry, down).unwrap(), dec!(-2));
        assert_eq!(Direction::Short.gain_pct(entry, down).unwrap(), dec!(2));
    }

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("ordex_"));
    }

    #[test]
    fn test_entry_spec_invariants() {
        let spec = EntryOrderSpec::new(
            "BTCUSDT",
            OrderSide::Buy,
            Qty::new(dec!(0.01)),
            Price::new(dec!(50000)),
            ClientOrderId::new(),
        )
        .unwrap();

        assert!(!spec.reduce_only());
        assert_eq!(spec.time_in_force(), TimeInForce::PostOnly);
    }

    #[test]
    fn test_entry_spec_rejects_zero_qty() {
        let result = EntryOrderSpec::new(
            "BTCUSDT",
            OrderSide::Buy,
            Qty::ZERO,
            Price::new(dec!(50000)),
            ClientOrderId::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_exit_spec_always_reduce_only() {
        let tp = ExitOrderSpec::take_profit(
            "BTCUSDT",
            OrderSide::Sell,
            Qty::new(dec!(0.01)),
            Price::new(dec!(51500)),
            ClientOrderId::new(),
        )
        .unwrap();
        assert!(tp.reduce_only());
        assert_eq!(tp.time_in_force(), TimeInForce::GoodTilCancelled);

        let sl = ExitOrderSpec::stop_loss(
            "BTCUSDT",
            OrderSide::Sell,
            Qty::new(dec!(0.01)),
            Price::new(dec!(49000)),
            ClientOrderId::new(),
        )
        .unwrap();
        assert!(sl.reduce_only());
        assert_eq!(sl.time_in_force(), TimeInForce::ImmediateOrCancel);
    }
}
