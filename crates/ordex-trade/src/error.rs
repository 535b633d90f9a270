use ordex_core::TradeStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Signal rejected: {0}")]
    SignalRejected(String),

    #[error("Concurrent trade limit reached")]
    SlotsExhausted,

    #[error("Illegal transition {from} -> {to}")]
    IllegalTransition { from: TradeStatus, to: TradeStatus },

    #[error("No fill observed after {polls} polls")]
    FillTimeout { polls: u32 },

    #[error("Every leverage fallback rung was rejected for {symbol}")]
    LeverageExhausted { symbol: String },

    #[error("Shutdown requested")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] ordex_core::CoreError),

    #[error(transparent)]
    Exchange(#[from] ordex_exchange::ExchangeError),

    #[error(transparent)]
    Registry(#[from] ordex_registry::RegistryError),
}

pub type TradeResult<T> = std::result::Result<T, TradeError>;
