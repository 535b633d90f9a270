//! Error types for the exchange client.

use crate::retcodes;
use thiserror::Error;

/// Exchange error taxonomy.
///
/// `Transport` covers connect/timeout/reset failures and is the only class
/// retried generically. `Business` carries the venue's return code; callers
/// decide per-code. Everything else is surfaced as-is.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Venue rejected request: code {code} ({})", retcodes::describe(*.code))]
    Business { code: i64, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ExchangeError {
    /// Whether a retry with backoff is worthwhile.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Business { code, .. } => retcodes::is_transient(*code),
            _ => false,
        }
    }

    /// Whether the venue reported a timestamp outside its recv window.
    pub fn is_timestamp_drift(&self) -> bool {
        matches!(
            self,
            Self::Business {
                code: retcodes::RET_TIMESTAMP_DRIFT,
                ..
            }
        )
    }
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
