//! Execution-before-notification enforcement.
//!
//! Every externally visible action follows the same order: record the
//! request, execute it against the venue, and only after the venue's
//! acknowledgement emit a notification. [`ConfirmationGate`] is the sole
//! path that sends success notifications; [`TimelineLogger`] records the
//! request/ack/notify sequence per operation so the ordering can be
//! audited after the fact.

pub mod gate;
pub mod sink;
pub mod timeline;

pub use gate::ConfirmationGate;
pub use sink::{NotificationSink, PersistenceStore};
pub use timeline::{
    AckSource, ComplianceReport, SequenceViolation, TimelineEvent, TimelineLogger, TimelinePhase,
};
