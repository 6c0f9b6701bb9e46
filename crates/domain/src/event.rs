//! Event — an immutable ledger record of something a device did.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AcequiaError, ValidationError};
use crate::id::{DeviceId, EventId, UserId};
use crate::telemetry::UltrasonicReadings;
use crate::time::Timestamp;

/// Discrete kind of ledger event.
///
/// The wire names are exactly what devices and consumers exchange; any
/// other string is rejected rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "Irrigation Activation")]
    IrrigationActivation,
    #[default]
    #[serde(rename = "Data Submission")]
    DataSubmission,
    #[serde(rename = "Seedling Sow")]
    SeedlingSow,
    #[serde(rename = "Seedling Ready")]
    SeedlingReady,
}

impl EventType {
    /// Resolve the type to record for a submission.
    ///
    /// The caller's explicit override wins; a plain telemetry submission
    /// carries no override and is classified as
    /// [`DataSubmission`](Self::DataSubmission). Nothing is ever inferred
    /// from readings or prior events.
    #[must_use]
    pub fn classify(explicit: Option<Self>) -> Self {
        explicit.unwrap_or_default()
    }

    /// The wire name of this event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IrrigationActivation => "Irrigation Activation",
            Self::DataSubmission => "Data Submission",
            Self::SeedlingSow => "Seedling Sow",
            Self::SeedlingReady => "Seedling Ready",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Irrigation Activation" => Ok(Self::IrrigationActivation),
            "Data Submission" => Ok(Self::DataSubmission),
            "Seedling Sow" => Ok(Self::SeedlingSow),
            "Seedling Ready" => Ok(Self::SeedlingReady),
            other => Err(ValidationError::UnknownEventType(other.to_owned())),
        }
    }
}

/// One entry in the append-only event ledger.
///
/// Entries are never updated or deleted once appended. `owner` is copied
/// from the device at recording time so history stays attributable even if
/// the registry record later changes hands, and `readings` is the
/// point-in-time snapshot of that submission, distinct from the device's
/// mutable latest values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub device_id: DeviceId,
    pub owner: UserId,
    pub event_type: EventType,
    pub event_date: Timestamp,
    pub readings: UltrasonicReadings,
}

impl Event {
    /// Create a builder for constructing an [`Event`].
    #[must_use]
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] when `device_id` is empty or a
    /// reading is not finite.
    pub fn validate(&self) -> Result<(), AcequiaError> {
        if self.device_id.is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }
        self.readings.validate()
    }
}

/// Step-by-step builder for [`Event`].
#[derive(Debug, Default)]
pub struct EventBuilder {
    id: Option<EventId>,
    device_id: Option<DeviceId>,
    owner: Option<UserId>,
    event_type: Option<EventType>,
    event_date: Option<Timestamp>,
    readings: UltrasonicReadings,
}

impl EventBuilder {
    #[must_use]
    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    #[must_use]
    pub fn event_date(mut self, event_date: Timestamp) -> Self {
        self.event_date = Some(event_date);
        self
    }

    #[must_use]
    pub fn readings(mut self, readings: UltrasonicReadings) -> Self {
        self.readings = readings;
        self
    }

    /// Consume the builder, validate, and return an [`Event`].
    ///
    /// `event_date` defaults to the epoch when not set; recording paths
    /// always pass the submission time explicitly, never a clock read.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] if `device_id` is missing or
    /// empty, `owner` is missing, or a reading is not finite.
    pub fn build(self) -> Result<Event, AcequiaError> {
        let event = Event {
            id: self.id.unwrap_or_default(),
            device_id: self.device_id.unwrap_or_default(),
            owner: self.owner.ok_or(ValidationError::MissingOwner)?,
            event_type: self.event_type.unwrap_or_default(),
            event_date: self.event_date.unwrap_or_default(),
            readings: self.readings,
        };
        event.validate()?;
        Ok(event)
    }
}
