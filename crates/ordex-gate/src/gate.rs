//! The single allowed path from venue acknowledgement to notification.

use crate::sink::{NotificationSink, PersistenceStore};
use crate::timeline::{AckSource, TimelineLogger};
use ordex_core::TradeRecord;
use ordex_exchange::ExchangeResult;
use std::future::Future;
use std::sync::Arc;

/// Runs venue operations and emits notifications strictly after the
/// venue's acknowledgement.
///
/// Success notifications exist nowhere else in the system; callers that
/// want to announce an action must route it through [`confirm`] or
/// [`confirm_local`], which is what makes the recorded timeline a proof
/// of ordering rather than a convention.
///
/// [`confirm`]: ConfirmationGate::confirm
/// [`confirm_local`]: ConfirmationGate::confirm_local
pub struct ConfirmationGate {
    timeline: Arc<TimelineLogger>,
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn PersistenceStore>,
}

impl ConfirmationGate {
    pub fn new(
        timeline: Arc<TimelineLogger>,
        sink: Arc<dyn NotificationSink>,
        store: Arc<dyn PersistenceStore>,
    ) -> Self {
        Self {
            timeline,
            sink,
            store,
        }
    }

    pub fn timeline(&self) -> &Arc<TimelineLogger> {
        &self.timeline
    }

    /// Execute a venue operation under the gate.
    ///
    /// Records the request, awaits the operation, and on success records
    /// the venue ack and sends the notification built from the result. On
    /// failure the timeline records the failure and nothing is announced.
    /// Notification delivery errors are logged but never propagate: the
    /// operation itself already succeeded.
    pub async fn confirm<T, Fut, M>(
        &self,
        operation_id: &str,
        action: &str,
        op: Fut,
        message: M,
    ) -> ExchangeResult<T>
    where
        Fut: Future<Output = ExchangeResult<T>>,
        M: FnOnce(&T) -> String,
    {
        self.timeline.record_request(operation_id, action);
        match op.await {
            Ok(value) => {
                self.timeline.record_ack(operation_id, AckSource::Venue, action);
                self.send(operation_id, &message(&value)).await;
                Ok(value)
            }
            Err(err) => {
                self.timeline
                    .record_failure(operation_id, format!("{action}: {err}"));
                Err(err)
            }
        }
    }

    /// Announce a decision that needs no venue round-trip, e.g. declining
    /// a re-entry because the distance floor was not met. The ack is
    /// recorded as a local decision so the timeline stays complete.
    pub async fn confirm_local(&self, operation_id: &str, action: &str, message: &str) {
        self.timeline.record_request(operation_id, action);
        self.timeline
            .record_ack(operation_id, AckSource::LocalDecision, action);
        self.send(operation_id, message).await;
    }

    /// Announce a failure. The failure phase captures what went wrong,
    /// and the announcement itself is a local decision: ack then notify,
    /// so every outgoing message stays accounted for in the timeline.
    pub async fn report_failure(&self, operation_id: &str, detail: &str) {
        self.timeline.record_request(operation_id, "report failure");
        self.timeline.record_failure(operation_id, detail);
        self.timeline
            .record_ack(operation_id, AckSource::LocalDecision, "report failure");
        self.send(operation_id, detail).await;
    }

    /// Persist a trade snapshot. Persistence errors are logged, not
    /// propagated; the trade task must keep running on a flaky store.
    pub async fn persist(&self, record: &TradeRecord) {
        if let Err(err) = self.store.save_trade(record).await {
            tracing::warn!(
                trade_id = %record.trade_id,
                error = %err,
                "trade snapshot not persisted"
            );
        }
    }

    async fn send(&self, operation_id: &str, message: &str) {
        match self.sink.notify(message).await {
            Ok(()) => self.timeline.record_notify(operation_id, message),
            Err(err) => {
                tracing::warn!(operation_id, error = %err, "notification not delivered");
            }
        }
    }
}
