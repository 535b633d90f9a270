//! Application-level errors.

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error(transparent)]
    Exchange(#[from] ordex_exchange::ExchangeError),

    #[error(transparent)]
    Registry(#[from] ordex_registry::RegistryError),

    #[error(transparent)]
    Trade(#[from] ordex_trade::TradeError),
}
