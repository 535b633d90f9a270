//! Instrument trading rules: cached quantization metadata and sizing.
//!
//! The venue's instrument filters (tick size, quantity step, minimum order
//! quantity, minimum notional) change rarely but matter on every order.
//! [`QuantizationRegistry`] caches the whole table with a TTL and refreshes
//! it wholesale; [`PositionSizeCalculator`] turns a margin allocation into
//! a venue-valid quantity using those rules.

pub mod error;
pub mod registry;
pub mod rules;
pub mod sizing;

pub use error::{RegistryError, RegistryResult};
pub use registry::QuantizationRegistry;
pub use rules::{InstrumentRule, TradingStatus};
pub use sizing::{PositionSizeCalculator, SizingOutcome};
