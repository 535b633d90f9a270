//! Connection liveness tracking.

use crate::error::{WsError, WsResult};
use std::time::{Duration, Instant};

pub const PING_INTERVAL: Duration = Duration::from_secs(30);
pub const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Ping/pong bookkeeping owned by the connection task.
///
/// A venue that stops answering pings is indistinguishable from a stalled
/// TCP connection; once no pong has arrived for the timeout window the
/// connection is declared dead and torn down.
#[derive(Debug)]
pub struct Heartbeat {
    ping_interval: Duration,
    pong_timeout: Duration,
    last_ping: Instant,
    last_pong: Instant,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::with_intervals(PING_INTERVAL, PONG_TIMEOUT)
    }

    pub fn with_intervals(ping_interval: Duration, pong_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            ping_interval,
            pong_timeout,
            last_ping: now,
            last_pong: now,
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Instant::now();
    }

    pub fn record_pong(&mut self) {
        self.last_pong = Instant::now();
    }

    /// Any inbound traffic proves the connection is alive.
    pub fn record_activity(&mut self) {
        self.last_pong = Instant::now();
    }

    /// Err when the pong window has elapsed with no sign of life.
    pub fn check(&self) -> WsResult<()> {
        if self.last_pong.elapsed() >= self.pong_timeout {
            return Err(WsError::DeadConnection(self.pong_timeout.as_secs()));
        }
        Ok(())
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_heartbeat_is_alive() {
        let hb = Heartbeat::new();
        assert!(hb.check().is_ok());
    }

    #[test]
    fn test_dead_after_timeout() {
        let mut hb = Heartbeat::with_intervals(Duration::from_millis(1), Duration::from_millis(0));
        hb.record_ping();
        assert!(matches!(hb.check(), Err(WsError::DeadConnection(_))));

        hb.record_pong();
        // Zero timeout declares death immediately again; use a real window.
        let hb = Heartbeat::with_intervals(Duration::from_secs(30), Duration::from_secs(60));
        assert!(hb.check().is_ok());
    }
}
