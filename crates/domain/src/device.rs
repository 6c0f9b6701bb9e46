//! Device — the registry record holding a device's current state.

use serde::{Deserialize, Serialize};

use crate::error::{AcequiaError, ValidationError};
use crate::id::{DeviceId, UserId};
use crate::telemetry::UltrasonicReadings;
use crate::time::Timestamp;

/// Current authoritative state of one field device.
///
/// Exactly one record exists per [`DeviceId`]. The event ledger keeps the
/// full history; this record is the materialized "latest" view, overwritten
/// on every accepted submission. Records are never deleted here;
/// decommissioning is an external policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub owner: UserId,
    pub is_online: bool,
    pub last_update: Timestamp,
    pub readings: UltrasonicReadings,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Record a telemetry submission: overwrite the readings, advance
    /// `last_update`, and flag the device online.
    ///
    /// The readings are replaced as one unit and `last_update` never moves
    /// backwards, so the record always describes exactly one submission.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] when a reading is not finite,
    /// or when `now` precedes the last accepted submission.
    pub fn apply_reading(
        &mut self,
        readings: UltrasonicReadings,
        now: Timestamp,
    ) -> Result<(), AcequiaError> {
        readings.validate()?;
        if now < self.last_update {
            return Err(ValidationError::StaleTimestamp {
                submitted: now,
                current: self.last_update,
            }
            .into());
        }
        self.readings = readings;
        self.last_update = now;
        self.is_online = true;
        Ok(())
    }

    /// Flag the device offline.
    ///
    /// Readings and `last_update` keep describing the last accepted
    /// submission; only the liveness flag changes.
    pub fn mark_offline(&mut self) {
        self.is_online = false;
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

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    device_id: Option<DeviceId>,
    owner: Option<UserId>,
    is_online: bool,
    last_update: Option<Timestamp>,
    readings: UltrasonicReadings,
}

impl DeviceBuilder {
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
    pub fn is_online(mut self, is_online: bool) -> Self {
        self.is_online = is_online;
        self
    }

    #[must_use]
    pub fn last_update(mut self, last_update: Timestamp) -> Self {
        self.last_update = Some(last_update);
        self
    }

    #[must_use]
    pub fn readings(mut self, readings: UltrasonicReadings) -> Self {
        self.readings = readings;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// A fresh device starts offline with zero readings and `last_update`
    /// at the epoch until its first submission arrives.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] if `device_id` is missing or
    /// empty, `owner` is missing, or a reading is not finite.
    pub fn build(self) -> Result<Device, AcequiaError> {
        let device = Device {
            device_id: self.device_id.unwrap_or_default(),
            owner: self.owner.ok_or(ValidationError::MissingOwner)?,
            is_online: self.is_online,
            last_update: self.last_update.unwrap_or_default(),
            readings: self.readings,
        };
        device.validate()?;
        Ok(device)
    }
}
