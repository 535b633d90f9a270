//! Clock-offset tracking against the venue's server time.
//!
//! Signed requests embed a client timestamp that must land inside the
//! venue's recv window. Rather than trusting the local clock, the client
//! keeps a signed millisecond offset (server minus local) and stamps every
//! request with `local + offset`. The offset is refreshed periodically and
//! force-refreshed when the venue rejects a timestamp.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Minimum gap between routine resyncs.
const RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Thread-safe clock offset state. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct ClockSync {
    /// Server time minus local time, in milliseconds.
    offset_ms: AtomicI64,
    /// Local wall-clock millis of the last successful sync, 0 if never.
    last_sync_ms: AtomicI64,
}

impl ClockSync {
    pub fn new() -> Self {
        Self {
            offset_ms: AtomicI64::new(0),
            last_sync_ms: AtomicI64::new(0),
        }
    }

    fn local_now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Current venue-aligned timestamp in milliseconds.
    pub fn now_ms(&self) -> i64 {
        Self::local_now_ms() + self.offset_ms.load(Ordering::Acquire)
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Acquire)
    }

    /// Fold in a fresh server-time observation.
    pub fn record_server_time(&self, server_ms: i64) {
        let local = Self::local_now_ms();
        let offset = server_ms - local;
        self.offset_ms.store(offset, Ordering::Release);
        self.last_sync_ms.store(local, Ordering::Release);
        tracing::debug!(offset_ms = offset, "clock offset updated");
    }

    /// Whether a routine resync is due.
    pub fn needs_resync(&self) -> bool {
        let last = self.last_sync_ms.load(Ordering::Acquire);
        if last == 0 {
            return true;
        }
        Self::local_now_ms() - last >= RESYNC_INTERVAL.as_millis() as i64
    }

    /// Drop the sync record so the next check forces a refresh. Called when
    /// the venue rejects a timestamp despite a recent sync.
    pub fn invalidate(&self) {
        self.last_sync_ms.store(0, Ordering::Release);
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}
