//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AcequiaError`] via `#[from]`; no variant carries a bare message string.

use crate::time::Timestamp;

/// Top-level error for registry and ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum AcequiaError {
    #[error("Validation error")]
    Validation(#[from] ValidationError),

    #[error("Not found")]
    NotFound(#[from] NotFoundError),

    #[error("Consistency violation")]
    Consistency(#[from] ConsistencyError),

    #[error("Storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant rejected the input.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("sensor reading must be a finite number, got {0}")]
    NonFiniteReading(f64),

    #[error("unknown event type {0:?}")]
    UnknownEventType(String),

    #[error("device owner is required")]
    MissingOwner,

    #[error("device belongs to a different owner")]
    OwnerMismatch,

    #[error("device {0} is already registered")]
    DuplicateDevice(String),

    #[error("submission at {submitted} predates the latest accepted record at {current}")]
    StaleTimestamp {
        submitted: Timestamp,
        current: Timestamp,
    },
}

/// Lookup failed for an explicitly named record.
#[derive(Debug, thiserror::Error)]
#[error("{entity} with id {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// The registry and the ledger disagree after an ingestion.
///
/// The combined ingestion operation guarantees both records commit together
/// and describe the same submission; observing a divergence means that
/// guarantee broke. This is a bug, never a recoverable condition.
#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    #[error(
        "device {device_id}: registry last_update {last_update} does not match ledger event_date {event_date}"
    )]
    TimestampDiverged {
        device_id: String,
        last_update: Timestamp,
        event_date: Timestamp,
    },

    #[error("device {device_id}: registry readings do not match the ledger snapshot")]
    ReadingsDiverged { device_id: String },
}
