//! Private websocket feed plumbing.
//!
//! The venue streams execution and position updates with per-topic
//! monotonic sequence numbers. A missed number means missed fills, so the
//! feed layer detects gaps, pauses trading, re-synchronizes from REST
//! snapshots, and resumes. A heartbeat task watches for silently dead
//! connections.

pub mod connection;
pub mod error;
pub mod gap;
pub mod heartbeat;
pub mod pause;
pub mod sequence;

pub use connection::{FeedConfig, FeedConnection, FeedMessage};
pub use error::{WsError, WsResult};
pub use gap::{GapDetector, SnapshotProvider};
pub use heartbeat::Heartbeat;
pub use pause::TradingPause;
pub use sequence::{SeqCheck, SequenceTracker};
