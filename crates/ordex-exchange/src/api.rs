//! The async seam between trade logic and the venue.
//!
//! Everything above this crate (gate, trade lifecycle, strategies) depends
//! on `dyn ExchangeApi`, never on the concrete HTTP client, so tests can
//! script venue behavior without a network.

use crate::error::ExchangeResult;
use crate::types::{OpenOrder, OrderAck, PositionInfo, RawInstrument, Ticker, WalletBalance};
use async_trait::async_trait;
use ordex_core::{EntryOrderSpec, ExitOrderSpec, HedgeOrderSpec, Price};
use rust_decimal::Decimal;

/// Conditional-stop update applied to an open position.
///
/// `None` fields are left untouched on the venue side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradingStopUpdate {
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
}

impl TradingStopUpdate {
    pub fn stop_loss(price: Price) -> Self {
        Self {
            stop_loss: Some(price),
            ..Self::default()
        }
    }
}

/// Venue operations the rest of the system is allowed to perform.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Venue time in milliseconds.
    async fn server_time_ms(&self) -> ExchangeResult<i64>;

    /// All linear perpetual instruments and their trading filters.
    async fn instruments_info(&self) -> ExchangeResult<Vec<RawInstrument>>;

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    async fn wallet_balance(&self, coin: &str) -> ExchangeResult<WalletBalance>;

    /// Set position leverage. "Already set" is reported as success.
    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> ExchangeResult<()>;

    /// Place a post-only limit entry.
    async fn place_entry(&self, spec: &EntryOrderSpec) -> ExchangeResult<OrderAck>;

    /// Place a reduce-only exit (take profit, stop loss, or market close).
    async fn place_exit(&self, spec: &ExitOrderSpec) -> ExchangeResult<OrderAck>;

    /// Open a hedge leg with an opposite-direction market order.
    async fn place_hedge(&self, spec: &HedgeOrderSpec) -> ExchangeResult<OrderAck>;

    /// Cancel every open order on a symbol.
    async fn cancel_all(&self, symbol: &str) -> ExchangeResult<()>;

    /// Look up one order; `None` once the venue no longer reports it.
    async fn get_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Option<OpenOrder>>;

    async fn open_orders(&self, symbol: &str) -> ExchangeResult<Vec<OpenOrder>>;

    /// Current position on a symbol; `None` when flat.
    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<PositionInfo>>;

    /// Amend position-attached stops in place.
    async fn set_trading_stop(
        &self,
        symbol: &str,
        update: &TradingStopUpdate,
    ) -> ExchangeResult<()>;
}
