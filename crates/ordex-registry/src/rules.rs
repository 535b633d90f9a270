//! Flattened per-instrument trading rules.

use ordex_core::{Price, Qty};
use ordex_exchange::RawInstrument;
use rust_decimal::Decimal;

/// Whether the venue currently accepts orders on an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingStatus {
    Trading,
    /// Any non-trading status: pre-launch, settling, delivering, closed.
    Suspended,
}

impl TradingStatus {
    fn from_raw(status: &str) -> Self {
        if status == "Trading" {
            Self::Trading
        } else {
            Self::Suspended
        }
    }
}

/// The filters that constrain every order on one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRule {
    pub symbol: String,
    pub status: TradingStatus,
    pub tick_size: Price,
    pub qty_step: Qty,
    pub min_order_qty: Qty,
    pub max_order_qty: Qty,
    pub min_notional: Decimal,
    pub max_leverage: Decimal,
}

/// Fallback when the venue omits the filter. Conservative: a 5 quote-unit
/// floor matches the venue's documented default.
const DEFAULT_MIN_NOTIONAL: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
const DEFAULT_MAX_LEVERAGE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

impl InstrumentRule {
    pub fn from_raw(raw: &RawInstrument) -> Self {
        Self {
            symbol: raw.symbol.clone(),
            status: TradingStatus::from_raw(&raw.status),
            tick_size: Price::new(raw.price_filter.tick_size),
            qty_step: Qty::new(raw.lot_size_filter.qty_step),
            min_order_qty: Qty::new(raw.lot_size_filter.min_order_qty),
            max_order_qty: Qty::new(raw.lot_size_filter.max_order_qty),
            min_notional: raw
                .lot_size_filter
                .min_notional_value
                .unwrap_or(DEFAULT_MIN_NOTIONAL),
            max_leverage: raw
                .leverage_filter
                .as_ref()
                .map(|f| f.max_leverage)
                .unwrap_or(DEFAULT_MAX_LEVERAGE),
        }
    }

    /// Floor a price to the instrument's tick grid.
    pub fn quantize_price(&self, price: Price) -> Price {
        price.quantize(self.tick_size)
    }

    /// Floor a quantity to the instrument's step grid.
    pub fn quantize_qty(&self, qty: Qty) -> Qty {
        qty.quantize(self.qty_step)
    }

    /// Whether a quantity sits on the step grid and inside the
    /// instrument's min/max band.
    pub fn validate_qty(&self, qty: Qty) -> bool {
        qty >= self.min_order_qty
            && qty <= self.max_order_qty
            && qty.quantize(self.qty_step) == qty
    }

    /// Whether an order's notional clears the instrument's floor.
    pub fn validate_notional(&self, qty: Qty, price: Price) -> bool {
        qty.notional(price) >= self.min_notional
    }

    pub fn is_trading(&self) -> bool {
        self.status == TradingStatus::Trading
    }
}
