//! Gap handling: pause, snapshot, resume.

use crate::error::{WsError, WsResult};
use crate::pause::TradingPause;
use crate::sequence::{SeqCheck, SequenceTracker};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of authoritative state used to recover from a missed range.
///
/// In production this re-fetches open orders and positions over REST; in
/// tests it is scripted.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn resync(&self, topic: &str) -> anyhow::Result<()>;
}

/// Applies the gap policy to every sequenced feed message.
///
/// On a detected gap: trading is paused, the snapshot provider rebuilds
/// state from REST, the topic baseline is reset, and trading resumes.
/// The message that revealed the gap is dropped; the snapshot supersedes
/// it. If the snapshot fails, trading stays paused and the error goes to
/// the caller, which tears the connection down.
pub struct GapDetector {
    tracker: Arc<SequenceTracker>,
    pause: Arc<TradingPause>,
    snapshots: Arc<dyn SnapshotProvider>,
}

impl GapDetector {
    pub fn new(
        tracker: Arc<SequenceTracker>,
        pause: Arc<TradingPause>,
        snapshots: Arc<dyn SnapshotProvider>,
    ) -> Self {
        Self {
            tracker,
            pause,
            snapshots,
        }
    }

    pub fn pause_flag(&self) -> &Arc<TradingPause> {
        &self.pause
    }

    /// Returns whether the message should be delivered to consumers.
    pub async fn observe(&self, topic: &str, seq: u64) -> WsResult<bool> {
        match self.tracker.observe(topic, seq) {
            SeqCheck::Init | SeqCheck::InOrder => Ok(true),
            SeqCheck::Duplicate => {
                tracing::debug!(topic, seq, "duplicate feed message dropped");
                Ok(false)
            }
            SeqCheck::Gap { expected, got } => {
                tracing::warn!(topic, expected, got, "sequence gap detected");
                self.pause.pause();
                match self.snapshots.resync(topic).await {
                    Ok(()) => {
                        self.tracker.reset(topic);
                        self.pause.resume();
                        tracing::info!(topic, "state resynced after gap");
                        Ok(false)
                    }
                    Err(err) => Err(WsError::Resync(err)),
                }
            }
        }
    }

    /// Called when a connection is torn down; the next connection starts
    /// with fresh baselines.
    pub fn on_disconnect(&self) {
        self.tracker.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedSnapshots {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SnapshotProvider for ScriptedSnapshots {
        async fn resync(&self, _topic: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("rest unavailable");
            }
            Ok(())
        }
    }

    fn detector() -> (GapDetector, Arc<ScriptedSnapshots>, Arc<TradingPause>) {
        let snapshots = Arc::new(ScriptedSnapshots::default());
        let pause = Arc::new(TradingPause::new());
        let detector = GapDetector::new(
            Arc::new(SequenceTracker::new()),
            pause.clone(),
            snapshots.clone(),
        );
        (detector, snapshots, pause)
    }

    #[tokio::test]
    async fn test_in_order_messages_flow_through() {
        let (detector, snapshots, pause) = detector();
        assert!(detector.observe("execution", 1).await.unwrap());
        assert!(detector.observe("execution", 2).await.unwrap());
        assert_eq!(snapshots.calls.load(Ordering::SeqCst), 0);
        assert!(!pause.is_paused());
    }

    #[tokio::test]
    async fn test_gap_triggers_pause_snapshot_resume() {
        let (detector, snapshots, pause) = detector();
        detector.observe("execution", 1).await.unwrap();

        // Seq jumps 2 -> delivered false, snapshot taken, trading resumed.
        let deliver = detector.observe("execution", 4).await.unwrap();
        assert!(!deliver);
        assert_eq!(snapshots.calls.load(Ordering::SeqCst), 1);
        assert!(!pause.is_paused());

        // Baseline was reset: next message re-initializes.
        assert!(detector.observe("execution", 100).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_snapshot_keeps_trading_paused() {
        let (detector, snapshots, pause) = detector();
        snapshots.failing.store(true, Ordering::SeqCst);
        detector.observe("execution", 1).await.unwrap();

        let err = detector.observe("execution", 5).await.unwrap_err();
        assert!(matches!(err, WsError::Resync(_)));
        assert!(pause.is_paused());
    }

    #[tokio::test]
    async fn test_duplicates_dropped_without_snapshot() {
        let (detector, snapshots, _) = detector();
        detector.observe("execution", 5).await.unwrap();
        assert!(!detector.observe("execution", 5).await.unwrap());
        assert!(!detector.observe("execution", 3).await.unwrap());
        assert_eq!(snapshots.calls.load(Ordering::SeqCst), 0);
    }
}
