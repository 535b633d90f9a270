//! Trade lifecycle and exposure management.
//!
//! One [`TradeLifecycle`] task owns each trade end to end: leverage, dual
//! post-only entries, fill detection, exit placement, and the running
//! monitor loop that feeds price into the five attached strategies. All
//! venue calls go through the confirmation gate; all new-order paths
//! respect the global trading pause and the shutdown token.

pub mod config;
pub mod error;
pub mod fsm;
pub mod lifecycle;
pub mod slots;
pub mod strategies;

pub use config::TradeConfig;
pub use error::{TradeError, TradeResult};
pub use lifecycle::TradeLifecycle;
pub use slots::TradeSlots;
