//! Per-operation event timeline.
//!
//! Each operation (identified by a caller-chosen id) accumulates an
//! ordered list of phases. A well-formed operation reads
//! `Request -> Ack -> Notify`, with `Notify` optional and never before
//! `Ack`. [`TimelineLogger::verify_sequence`] checks one operation;
//! [`TimelineLogger::compliance_report`] sweeps them all.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimelinePhase {
    Request,
    Ack,
    Notify,
    Failure,
}

/// What produced an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AckSource {
    /// The venue confirmed the operation.
    Venue,
    /// A purely local decision with no venue round-trip (e.g. skipping a
    /// re-entry because the distance floor was not met).
    LocalDecision,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    pub operation_id: String,
    pub phase: TimelinePhase,
    pub ack_source: Option<AckSource>,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Sequencing rule broken by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceViolation {
    /// A notification was recorded with no prior acknowledgement.
    NotifyBeforeAck { operation_id: String },
    /// An acknowledgement was recorded with no prior request.
    AckBeforeRequest { operation_id: String },
    /// The operation has no events at all.
    Unknown { operation_id: String },
}

impl fmt::Display for SequenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotifyBeforeAck { operation_id } => {
                write!(f, "operation {operation_id}: notify recorded before ack")
            }
            Self::AckBeforeRequest { operation_id } => {
                write!(f, "operation {operation_id}: ack recorded before request")
            }
            Self::Unknown { operation_id } => {
                write!(f, "operation {operation_id}: no timeline recorded")
            }
        }
    }
}

/// Aggregate view over every recorded operation.
#[derive(Debug, Clone)]
pub struct ComplianceReport {
    pub operations: usize,
    pub acked: usize,
    pub notified: usize,
    pub failed: usize,
    pub violations: Vec<SequenceViolation>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Concurrent, append-only operation timelines.
#[derive(Default)]
pub struct TimelineLogger {
    events: DashMap<String, Vec<TimelineEvent>>,
}

impl TimelineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, operation_id: &str, detail: impl Into<String>) {
        self.push(operation_id, TimelinePhase::Request, None, detail.into());
    }

    pub fn record_ack(&self, operation_id: &str, source: AckSource, detail: impl Into<String>) {
        self.push(operation_id, TimelinePhase::Ack, Some(source), detail.into());
    }

    pub fn record_notify(&self, operation_id: &str, detail: impl Into<String>) {
        self.push(operation_id, TimelinePhase::Notify, None, detail.into());
    }

    pub fn record_failure(&self, operation_id: &str, detail: impl Into<String>) {
        self.push(operation_id, TimelinePhase::Failure, None, detail.into());
    }

    fn push(
        &self,
        operation_id: &str,
        phase: TimelinePhase,
        ack_source: Option<AckSource>,
        detail: String,
    ) {
        let event = TimelineEvent {
            operation_id: operation_id.to_string(),
            phase,
            ack_source,
            detail,
            at: Utc::now(),
        };
        tracing::debug!(
            operation_id,
            phase = ?event.phase,
            detail = %event.detail,
            "timeline event"
        );
        self.events
            .entry(operation_id.to_string())
            .or_default()
            .push(event);
    }

    /// Events for one operation, in recording order.
    pub fn events(&self, operation_id: &str) -> Vec<TimelineEvent> {
        self.events
            .get(operation_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Check the request/ack/notify ordering of one operation.
    pub fn verify_sequence(&self, operation_id: &str) -> Result<(), SequenceViolation> {
        let Some(events) = self.events.get(operation_id) else {
            return Err(SequenceViolation::Unknown {
                operation_id: operation_id.to_string(),
            });
        };
        Self::check(operation_id, &events)
    }

    fn check(operation_id: &str, events: &[TimelineEvent]) -> Result<(), SequenceViolation> {
        let mut requested = false;
        let mut acked = false;
        for event in events {
            match event.phase {
                TimelinePhase::Request => requested = true,
                TimelinePhase::Ack => {
                    if !requested {
                        return Err(SequenceViolation::AckBeforeRequest {
                            operation_id: operation_id.to_string(),
                        });
                    }
                    acked = true;
                }
                TimelinePhase::Notify => {
                    if !acked {
                        return Err(SequenceViolation::NotifyBeforeAck {
                            operation_id: operation_id.to_string(),
                        });
                    }
                }
                TimelinePhase::Failure => {}
            }
        }
        Ok(())
    }

    /// Sweep every recorded operation.
    pub fn compliance_report(&self) -> ComplianceReport {
        let mut report = ComplianceReport {
            operations: 0,
            acked: 0,
            notified: 0,
            failed: 0,
            violations: Vec::new(),
        };
        for entry in self.events.iter() {
            report.operations += 1;
            let events = entry.value();
            if events.iter().any(|e| e.phase == TimelinePhase::Ack) {
                report.acked += 1;
            }
            if events.iter().any(|e| e.phase == TimelinePhase::Notify) {
                report.notified += 1;
            }
            if events.iter().any(|e| e.phase == TimelinePhase::Failure) {
                report.failed += 1;
            }
            if let Err(violation) = Self::check(entry.key(), events) {
                report.violations.push(violation);
            }
        }
        report
    }
}
