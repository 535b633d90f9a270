//! Core domain types for the ordex execution engine.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Direction`, `OrderSide`, `TimeInForce`: trading enums
//! - `EntryOrderSpec`, `ExitOrderSpec`: order builders that enforce the
//!   post-only / reduce-only invariants at construction time
//! - `TradeSignal`: normalized upstream trade request
//! - `TradeRecord`: per-trade state owned by one lifecycle task

pub mod decimal;
pub mod error;
pub mod order;
pub mod signal;
pub mod trade;

pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use order::{
    ClientOrderId, Direction, EntryOrderSpec, ExitKind, ExitOrderSpec, HedgeOrderSpec, OrderSide,
    TimeInForce,
};
pub use signal::TradeSignal;
pub use trade::{TradeId, TradeRecord, TradeStatus};
