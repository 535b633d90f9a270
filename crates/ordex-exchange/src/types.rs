//! Wire types for the venue's REST API.
//!
//! The venue speaks camelCase JSON with numbers encoded as strings. Decimal
//! fields therefore deserialize through `Decimal`'s string support; empty
//! strings (which the venue uses for "no value") map to `None` via a local
//! helper.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Envelope every REST response arrives in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
    #[serde(default)]
    pub time: i64,
}

/// Acknowledgement returned by order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
}

/// A resting order as reported by the open-orders endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cum_exec_qty: Option<Decimal>,
    pub order_status: String,
    #[serde(default)]
    pub reduce_only: bool,
}

impl OpenOrder {
    /// Whether the venue reports this order as fully executed.
    pub fn is_filled(&self) -> bool {
        self.order_status == "Filled"
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.order_status.as_str(), "Cancelled" | "Deactivated")
    }
}

/// One side of a position as reported by the position endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub symbol: String,
    pub side: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub size: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub avg_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub leverage: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub liq_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub unrealised_pnl: Option<Decimal>,
}

impl PositionInfo {
    pub fn is_open(&self) -> bool {
        !self.size.is_zero()
    }
}

/// Instrument metadata as delivered by the instruments-info endpoint.
///
/// Filters are nested the way the venue nests them; flattening into trading
/// rules happens in the registry crate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstrument {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    pub price_filter: PriceFilter,
    pub lot_size_filter: LotSizeFilter,
    #[serde(default)]
    pub leverage_filter: Option<LeverageFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(with = "rust_decimal::serde::str")]
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSizeFilter {
    #[serde(with = "rust_decimal::serde::str")]
    pub qty_step: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub min_order_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub max_order_qty: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_notional_value: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageFilter {
    #[serde(with = "rust_decimal::serde::str")]
    pub max_leverage: Decimal,
}

/// Ticker snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub last_price: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub mark_price: Option<Decimal>,
}

/// Wallet balance for one coin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub coin: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub wallet_balance: Decimal,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub available_to_withdraw: Option<Decimal>,
}

/// List payloads arrive under a `list` key.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

/// Server-time payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    #[serde(with = "string_i64")]
    pub time_nano: i64,
}

impl ServerTime {
    pub fn millis(&self) -> i64 {
        self.time_nano / 1_000_000
    }
}

/// The venue encodes "absent" decimal fields as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

mod string_i64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_with_list_result() {
        let body = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {"list": [{"symbol": "BTCUSDT", "lastPrice": "50123.5"}]},
            "time": 1700000000000
        }"#;
        let resp: ApiResponse<ListResult<Ticker>> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.ret_code, 0);
        let tickers = resp.result.unwrap().list;
        assert_eq!(tickers[0].last_price, dec!(50123.5));
        assert!(tickers[0].mark_price.is_none());
    }

    #[test]
    fn test_position_empty_string_fields() {
        let body = r#"{
            "symbol": "ETHUSDT",
            "side": "Sell",
            "size": "0",
            "avgPrice": "",
            "leverage": "10",
            "liqPrice": "",
            "unrealisedPnl": ""
        }"#;
        let pos: PositionInfo = serde_json::from_str(body).unwrap();
        assert!(!pos.is_open());
        assert!(pos.avg_price.is_none());
        assert_eq!(pos.leverage, Some(dec!(10)));
    }

    #[test]
    fn test_instrument_filters() {
        let body = r#"{
            "symbol": "BTCUSDT",
            "status": "Trading",
            "priceFilter": {"tickSize": "0.1"},
            "lotSizeFilter": {
                "qtyStep": "0.001",
                "minOrderQty": "0.001",
                "maxOrderQty": "100",
                "minNotionalValue": "5"
            },
            "leverageFilter": {"maxLeverage": "100"}
        }"#;
        let inst: RawInstrument = serde_json::from_str(body).unwrap();
        assert_eq!(inst.price_filter.tick_size, dec!(0.1));
        assert_eq!(inst.lot_size_filter.min_notional_value, Some(dec!(5)));
    }

    #[test]
    fn test_server_time_nanos() {
        let body = r#"{"timeNano": "1700000000123456789"}"#;
        let st: ServerTime = serde_json::from_str(body).unwrap();
        assert_eq!(st.millis(), 1_700_000_000_123);
    }
}
