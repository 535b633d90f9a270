//! Per-topic sequence bookkeeping.

use dashmap::DashMap;

/// Classification of one observed sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// First number seen on this topic; accepted as the baseline.
    Init,
    /// Exactly the next expected number.
    InOrder,
    /// At or below the last seen number; already processed.
    Duplicate,
    /// Jumped past the expected number; messages were missed.
    Gap { expected: u64, got: u64 },
}

/// Tracks the last sequence number seen per topic.
#[derive(Default)]
pub struct SequenceTracker {
    last: DashMap<String, u64>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `seq` on `topic` and advance the baseline when it moves
    /// forward. A gap also advances the baseline: the snapshot resync that
    /// follows makes the missed range irrelevant.
    pub fn observe(&self, topic: &str, seq: u64) -> SeqCheck {
        let mut entry = self.last.entry(topic.to_string()).or_insert(0);
        let last = *entry;
        if last == 0 {
            *entry = seq;
            return SeqCheck::Init;
        }
        if seq <= last {
            return SeqCheck::Duplicate;
        }
        *entry = seq;
        if seq == last + 1 {
            SeqCheck::InOrder
        } else {
            SeqCheck::Gap {
                expected: last + 1,
                got: seq,
            }
        }
    }

    /// Forget the baseline for a topic. The next message is treated as
    /// `Init`, which is what a fresh connection needs.
    pub fn reset(&self, topic: &str) {
        self.last.remove(topic);
    }

    pub fn reset_all(&self) {
        self.last.clear();
    }

    pub fn last_seq(&self, topic: &str) -> Option<u64> {
        self.last.get(topic).map(|v| *v)
    }
}
