use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Symbol {0} is not currently trading (status {1})")]
    NotTrading(String, String),

    #[error("Instrument refresh failed and no cached table exists: {0}")]
    NoData(#[source] ordex_exchange::ExchangeError),

    #[error("Cannot size position: {0}")]
    Sizing(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
