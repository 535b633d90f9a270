//! Application configuration.
//!
//! Loaded from a TOML file with environment overrides, e.g.
//! `ORDEX_EXCHANGE__API_KEY` maps to `exchange.api_key`. Credentials are
//! usually supplied through the environment rather than the file.

use crate::error::{AppError, AppResult};
use ordex_exchange::ClientConfig;
use ordex_trade::TradeConfig;
use serde::Deserialize;
use std::time::Duration;

fn default_recv_window_ms() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    10
}

/// REST and websocket endpoints plus credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSection {
    pub base_url: String,
    pub ws_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_topics() -> Vec<String> {
    vec![
        "execution".to_string(),
        "position".to_string(),
        "signal".to_string(),
    ]
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

/// Private feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub exchange: ExchangeSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub trade: TradeConfig,
}

impl AppConfig {
    /// Load from a TOML file, then apply `ORDEX_*` environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ORDEX").separator("__"))
            .build()?;
        let app: Self = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> AppResult<()> {
        if self.exchange.base_url.is_empty() {
            return Err(AppError::Config("exchange.base_url is empty".into()));
        }
        if self.exchange.ws_url.is_empty() {
            return Err(AppError::Config("exchange.ws_url is empty".into()));
        }
        Ok(())
    }

    /// REST client configuration. Fails when credentials were supplied
    /// neither in the file nor via the environment.
    pub fn client_config(&self) -> AppResult<ClientConfig> {
        let api_key = self
            .exchange
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("exchange.api_key is not set".into()))?;
        let api_secret = self
            .exchange
            .api_secret
            .clone()
            .ok_or_else(|| AppError::Config("exchange.api_secret is not set".into()))?;

        let mut client = ClientConfig::new(self.exchange.base_url.clone(), api_key, api_secret);
        client.recv_window_ms = self.exchange.recv_window_ms;
        client.timeout = Duration::from_secs(self.exchange.timeout_secs);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let raw = r#"
            [exchange]
            base_url = "https://api.example.com"
            ws_url = "wss://stream.example.com/private"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.exchange.recv_window_ms, 5000);
        assert_eq!(config.feed.topics.len(), 3);
        assert_eq!(config.trade.max_concurrent_trades, 5);
    }

    #[test]
    fn test_client_config_requires_credentials() {
        let raw = r#"
            [exchange]
            base_url = "https://api.example.com"
            ws_url = "wss://stream.example.com/private"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert!(config.client_config().is_err());
    }

    #[test]
    fn test_trade_section_overrides() {
        let raw = r#"
            [exchange]
            base_url = "https://api.example.com"
            ws_url = "wss://stream.example.com/private"

            [trade]
            max_concurrent_trades = 2
            base_margin = "40"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.trade.max_concurrent_trades, 2);
    }
}
