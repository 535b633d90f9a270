//! Shared trading pause flag.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Cooperative pause observed by every trade task.
///
/// While paused, trade tasks must not place new orders; already-resting
/// orders stay on the venue. `wait_if_paused` parks the caller until the
/// flag clears.
#[derive(Default)]
pub struct TradingPause {
    paused: AtomicBool,
    resumed: Notify,
}

impl TradingPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::warn!("trading paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::info!("trading resumed");
            self.resumed.notify_waiters();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Return immediately when not paused, otherwise wait for resume.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() {
            let notified = self.resumed.notified();
            // Re-check after arming the waiter so a resume that lands in
            // between is not missed.
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_not_paused() {
        let pause = TradingPause::new();
        tokio::time::timeout(Duration::from_millis(10), pause.wait_if_paused())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_waiters_released_on_resume() {
        let pause = Arc::new(TradingPause::new());
        pause.pause();
        assert!(pause.is_paused());

        let waiter = {
            let pause = pause.clone();
            tokio::spawn(async move { pause.wait_if_paused().await })
        };
        tokio::task::yield_now().await;
        pause.resume();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
