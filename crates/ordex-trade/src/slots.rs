//! Global concurrent-trade cap.

use crate::error::{TradeError, TradeResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded pool of trade slots. A signal that arrives with no free slot
/// is rejected immediately rather than queued; by the time a slot frees
/// up the signal's prices are stale.
pub struct TradeSlots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the lifetime of one trade; dropping it frees the slot.
pub struct TradeSlot {
    _permit: OwnedSemaphorePermit,
}

impl TradeSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn try_acquire(&self) -> TradeResult<TradeSlot> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(TradeSlot { _permit: permit }),
            Err(_) => Err(TradeError::SlotsExhausted),
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
