//! Signed HTTP client for the venue's REST API.
//!
//! Behavioral contract:
//! - every private request is stamped with a venue-aligned timestamp from
//!   [`ClockSync`]; a routine resync runs at most once a minute
//! - a timestamp-drift rejection (code 10002) triggers exactly one forced
//!   resync followed by one retry of the same request
//! - order placement retries transient failures (transport errors, rate
//!   limiting) up to three attempts with a one second pause; the client
//!   order id is reused so a retry can never double-execute
//! - "leverage not modified" (code 110043) is reported as success

use crate::api::{ExchangeApi, TradingStopUpdate};
use crate::clock::ClockSync;
use crate::error::{ExchangeError, ExchangeResult};
use crate::retcodes;
use crate::signing::{
    canonical_query, ApiCredentials, RequestSigner, HEADER_API_KEY, HEADER_RECV_WINDOW,
    HEADER_SIGN, HEADER_TIMESTAMP,
};
use crate::types::{
    ApiResponse, ListResult, OpenOrder, OrderAck, PositionInfo, RawInstrument, ServerTime, Ticker,
    WalletBalance,
};
use async_trait::async_trait;
use ordex_core::{EntryOrderSpec, ExitKind, ExitOrderSpec, HedgeOrderSpec};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Attempts for order placement, including the first.
const PLACEMENT_ATTEMPTS: u32 = 3;
/// Pause between placement attempts.
const PLACEMENT_RETRY_DELAY: Duration = Duration::from_secs(1);

const CATEGORY: &str = "linear";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub recv_window_ms: u64,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            recv_window_ms: 5000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// The concrete venue client. Consumers share it behind
/// `Arc<dyn ExchangeApi>`.
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    signer: RequestSigner,
    clock: Arc<ClockSync>,
}

impl ExchangeClient {
    pub fn new(config: ClientConfig) -> ExchangeResult<Self> {
        if config.base_url.is_empty() {
            return Err(ExchangeError::InvalidConfig("base_url is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExchangeError::InvalidConfig(e.to_string()))?;
        let credentials = ApiCredentials::new(config.api_key, config.api_secret);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(credentials, config.recv_window_ms),
            clock: Arc::new(ClockSync::new()),
        })
    }

    pub fn clock(&self) -> Arc<ClockSync> {
        Arc::clone(&self.clock)
    }

    /// Fetch the venue clock and fold it into the offset tracker.
    pub async fn sync_clock(&self) -> ExchangeResult<()> {
        let server_ms = self.fetch_server_time().await?;
        self.clock.record_server_time(server_ms);
        Ok(())
    }

    async fn fetch_server_time(&self) -> ExchangeResult<i64> {
        let url = format!("{}/v5/market/time", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let envelope: ApiResponse<ServerTime> = resp
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(e.to_string()))?;
        let st = envelope
            .result
            .ok_or_else(|| ExchangeError::Parse("server time missing result".into()))?;
        Ok(st.millis())
    }

    async fn ensure_clock(&self) {
        if self.clock.needs_resync() {
            if let Err(err) = self.sync_clock().await {
                // A stale offset is still usable; the drift handler catches
                // the case where it is not.
                tracing::warn!(error = %err, "clock resync failed, keeping previous offset");
            }
        }
    }

    /// Run a signed request; on a timestamp-drift rejection, force one
    /// resync and retry the request exactly once.
    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.ensure_clock().await;
        match self.signed_get_once(path, params).await {
            Err(err) if err.is_timestamp_drift() => {
                tracing::warn!(path, "timestamp drift rejected, forcing clock resync");
                self.clock.invalidate();
                self.sync_clock().await?;
                self.signed_get_once(path, params).await
            }
            other => other,
        }
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> ExchangeResult<T> {
        self.ensure_clock().await;
        match self.signed_post_once(path, body).await {
            Err(err) if err.is_timestamp_drift() => {
                tracing::warn!(path, "timestamp drift rejected, forcing clock resync");
                self.clock.invalidate();
                self.sync_clock().await?;
                self.signed_post_once(path, body).await
            }
            other => other,
        }
    }

    async fn signed_get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = canonical_query(params);
        let headers = self.signer.sign(self.clock.now_ms(), &query)?;
        let mut url = format!("{}{path}", self.base_url);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        let resp = self
            .http
            .get(&url)
            .header(HEADER_API_KEY, &headers.api_key)
            .header(HEADER_TIMESTAMP, &headers.timestamp)
            .header(HEADER_RECV_WINDOW, &headers.recv_window)
            .header(HEADER_SIGN, &headers.signature)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn signed_post_once<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> ExchangeResult<T> {
        let payload =
            serde_json::to_string(body).map_err(|e| ExchangeError::Parse(e.to_string()))?;
        let headers = self.signer.sign(self.clock.now_ms(), &payload)?;
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header(HEADER_API_KEY, &headers.api_key)
            .header(HEADER_TIMESTAMP, &headers.timestamp)
            .header(HEADER_RECV_WINDOW, &headers.recv_window)
            .header(HEADER_SIGN, &headers.signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ExchangeResult<T> {
        let envelope: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(e.to_string()))?;
        if envelope.ret_code != retcodes::RET_OK {
            return Err(ExchangeError::Business {
                code: envelope.ret_code,
                message: envelope.ret_msg,
            });
        }
        envelope
            .result
            .ok_or_else(|| ExchangeError::Parse("missing result in success response".into()))
    }

    /// Bounded retry for order placement. The same client order id is sent
    /// on every attempt, so the venue deduplicates a retry that raced a
    /// success.
    async fn place_with_retry(&self, path: &str, body: Value) -> ExchangeResult<OrderAck> {
        let mut attempt = 1;
        loop {
            match self.signed_post::<OrderAck>(path, &body).await {
                Ok(ack) => return Ok(ack),
                Err(err) if err.is_transient() && attempt < PLACEMENT_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "transient placement failure, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(PLACEMENT_RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl ExchangeApi for ExchangeClient {
    async fn server_time_ms(&self) -> ExchangeResult<i64> {
        self.fetch_server_time().await
    }

    async fn instruments_info(&self) -> ExchangeResult<Vec<RawInstrument>> {
        let url = format!(
            "{}/v5/market/instruments-info?category={CATEGORY}&limit=1000",
            self.base_url
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let result: ListResult<RawInstrument> = Self::decode(resp).await?;
        Ok(result.list)
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        let url = format!(
            "{}/v5/market/tickers?category={CATEGORY}&symbol={symbol}",
            self.base_url
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        let result: ListResult<Ticker> = Self::decode(resp).await?;
        result
            .list
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::Parse(format!("no ticker returned for {symbol}")))
    }

    async fn wallet_balance(&self, coin: &str) -> ExchangeResult<WalletBalance> {
        #[derive(serde::Deserialize)]
        struct Account {
            coin: Vec<WalletBalance>,
        }
        let params = [
            ("accountType", "UNIFIED".to_string()),
            ("coin", coin.to_string()),
        ];
        let result: ListResult<Account> =
            self.signed_get("/v5/account/wallet-balance", &params).await?;
        result
            .list
            .into_iter()
            .flat_map(|a| a.coin)
            .find(|b| b.coin == coin)
            .ok_or_else(|| ExchangeError::Parse(format!("no balance returned for {coin}")))
    }

    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> ExchangeResult<()> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "buyLeverage": leverage.to_string(),
            "sellLeverage": leverage.to_string(),
        });
        match self
            .signed_post::<Value>("/v5/position/set-leverage", &body)
            .await
        {
            Ok(_) => Ok(()),
            Err(ExchangeError::Business { code, .. }) if retcodes::is_benign(code) => {
                tracing::debug!(symbol, %leverage, "leverage already at requested value");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn place_entry(&self, spec: &EntryOrderSpec) -> ExchangeResult<OrderAck> {
        let body = json!({
            "category": CATEGORY,
            "symbol": spec.symbol,
            "side": spec.side.to_string(),
            "orderType": "Limit",
            "qty": spec.qty.inner().to_string(),
            "price": spec.price.inner().to_string(),
            "timeInForce": spec.time_in_force().to_string(),
            "reduceOnly": spec.reduce_only(),
            "orderLinkId": spec.link_id.as_str(),
        });
        self.place_with_retry("/v5/order/create", body).await
    }

    async fn place_exit(&self, spec: &ExitOrderSpec) -> ExchangeResult<OrderAck> {
        let mut body = json!({
            "category": CATEGORY,
            "symbol": spec.symbol,
            "side": spec.side.to_string(),
            "qty": spec.qty.inner().to_string(),
            "timeInForce": spec.time_in_force().to_string(),
            "reduceOnly": spec.reduce_only(),
            "orderLinkId": spec.link_id.as_str(),
        });
        let obj = body
            .as_object_mut()
            .ok_or_else(|| ExchangeError::Parse("exit body is not an object".into()))?;
        match spec.kind {
            ExitKind::TakeProfit { price } => {
                obj.insert("orderType".into(), json!("Limit"));
                obj.insert("price".into(), json!(price.inner().to_string()));
            }
            ExitKind::StopLoss { trigger } => {
                obj.insert("orderType".into(), json!("Market"));
                obj.insert("triggerPrice".into(), json!(trigger.inner().to_string()));
            }
            ExitKind::MarketClose => {
                obj.insert("orderType".into(), json!("Market"));
            }
        }
        self.place_with_retry("/v5/order/create", body).await
    }

    async fn place_hedge(&self, spec: &HedgeOrderSpec) -> ExchangeResult<OrderAck> {
        let body = json!({
            "category": CATEGORY,
            "symbol": spec.symbol,
            "side": spec.side.to_string(),
            "orderType": "Market",
            "qty": spec.qty.inner().to_string(),
            "timeInForce": spec.time_in_force().to_string(),
            "reduceOnly": spec.reduce_only(),
            "orderLinkId": spec.link_id.as_str(),
        });
        self.place_with_retry("/v5/order/create", body).await
    }

    async fn cancel_all(&self, symbol: &str) -> ExchangeResult<()> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
        });
        self.signed_post::<Value>("/v5/order/cancel-all", &body)
            .await?;
        Ok(())
    }

    async fn get_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<Option<OpenOrder>> {
        let params = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let result: ListResult<OpenOrder> = self.signed_get("/v5/order/realtime", &params).await?;
        Ok(result.list.into_iter().next())
    }

    async fn open_orders(&self, symbol: &str) -> ExchangeResult<Vec<OpenOrder>> {
        let params = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
        ];
        let result: ListResult<OpenOrder> = self.signed_get("/v5/order/realtime", &params).await?;
        Ok(result.list)
    }

    async fn get_position(&self, symbol: &str) -> ExchangeResult<Option<PositionInfo>> {
        let params = [
            ("category", CATEGORY.to_string()),
            ("symbol", symbol.to_string()),
        ];
        let result: ListResult<PositionInfo> =
            self.signed_get("/v5/position/list", &params).await?;
        Ok(result.list.into_iter().find(|p| p.is_open()))
    }

    async fn set_trading_stop(
        &self,
        symbol: &str,
        update: &TradingStopUpdate,
    ) -> ExchangeResult<()> {
        let mut body = json!({
            "category": CATEGORY,
            "symbol": symbol,
        });
        let obj = body
            .as_object_mut()
            .ok_or_else(|| ExchangeError::Parse("trading-stop body is not an object".into()))?;
        if let Some(sl) = update.stop_loss {
            obj.insert("stopLoss".into(), json!(sl.inner().to_string()));
        }
        if let Some(tp) = update.take_profit {
            obj.insert("takeProfit".into(), json!(tp.inner().to_string()));
        }
        self.signed_post::<Value>("/v5/position/trading-stop", &body)
            .await?;
        Ok(())
    }
}
