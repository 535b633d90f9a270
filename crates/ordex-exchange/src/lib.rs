//! Signed REST client for the derivatives venue.
//!
//! Provides:
//! - `ExchangeClient`: HMAC-signed HTTP client with clock-offset tracking,
//!   one-shot resync-and-retry on timestamp drift, and bounded retry of
//!   transient failures on order placement
//! - `ExchangeApi`: the async seam every consumer depends on, so tests can
//!   inject a scripted venue
//! - `CircuitBreaker` and `GuardedExchange`: fail-fast protection shared by
//!   all callers

pub mod api;
pub mod breaker;
pub mod client;
pub mod clock;
pub mod error;
pub mod retcodes;
pub mod signing;
pub mod types;

pub use api::{ExchangeApi, TradingStopUpdate};
pub use breaker::{BreakerState, CircuitBreaker, GuardedExchange};
pub use client::{ClientConfig, ExchangeClient};
pub use clock::ClockSync;
pub use error::{ExchangeError, ExchangeResult};
pub use signing::{ApiCredentials, RequestSigner};
pub use types::{
    ApiResponse, OpenOrder, OrderAck, PositionInfo, RawInstrument, Ticker, WalletBalance,
};
