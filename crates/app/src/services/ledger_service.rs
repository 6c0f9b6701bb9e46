//! Ledger service — use-cases for the append-only event ledger.

use acequia_domain::device::Device;
use acequia_domain::error::{AcequiaError, NotFoundError, ValidationError};
use acequia_domain::event::{Event, EventType};
use acequia_domain::id::{DeviceId, EventId};
use acequia_domain::telemetry::UltrasonicReadings;
use acequia_domain::time::Timestamp;

use crate::ports::{DeviceRepository, EventStore};

/// Application service for the event ledger.
///
/// The ledger only ever grows: entries are appended, queried, and never
/// touched again. The device repository is consulted to resolve the
/// originating device and to copy its owner onto every new entry.
pub struct LedgerService<S, R> {
    store: S,
    devices: R,
}

impl<S: EventStore, R: DeviceRepository> LedgerService<S, R> {
    /// Create a new service backed by the given event store and device
    /// repository.
    pub fn new(store: S, devices: R) -> Self {
        Self { store, devices }
    }

    /// Append a new immutable entry for a device.
    ///
    /// The entry's owner is copied from the device record at append time,
    /// so history stays attributable no matter what happens to the registry
    /// record afterwards. Per-device `event_date` order is enforced here:
    /// an entry dated before the device's latest one is rejected, while an
    /// equal date is accepted and tie-broken by insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::NotFound`] when `device_id` does not resolve
    /// to a device, [`AcequiaError::Validation`] when a reading is not
    /// finite or `now` predates the device's latest entry, or a storage
    /// error from the store.
    #[tracing::instrument(skip(self, readings))]
    pub async fn append(
        &self,
        device_id: &DeviceId,
        event_type: EventType,
        readings: UltrasonicReadings,
        now: Timestamp,
    ) -> Result<Event, AcequiaError> {
        let device = self.resolve_device(device_id).await?;
        if let Some(latest) = self.store.find_latest(device_id).await? {
            if now < latest.event_date {
                return Err(ValidationError::StaleTimestamp {
                    submitted: now,
                    current: latest.event_date,
                }
                .into());
            }
        }
        let event = Event::builder()
            .device_id(device.device_id)
            .owner(device.owner)
            .event_type(event_type)
            .event_date(now)
            .readings(readings)
            .build()?;
        self.store.append(event).await
    }

    /// Read a device's history, ordered by `event_date` ascending with ties
    /// in insertion order.
    ///
    /// `since` restarts the sequence from an inclusive timestamp and
    /// `limit` keeps each page finite; both are optional.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::NotFound`] when `device_id` does not resolve
    /// to a device, or a storage error from the store.
    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        device_id: &DeviceId,
        since: Option<Timestamp>,
        limit: Option<usize>,
    ) -> Result<Vec<Event>, AcequiaError> {
        self.resolve_device(device_id).await?;
        self.store.find_by_device(device_id, since, limit).await
    }

    /// Look up a single ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::NotFound`] when no event with `id` exists,
    /// or a storage error from the store.
    pub async fn get_event(&self, id: EventId) -> Result<Event, AcequiaError> {
        self.store.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Event",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// The most recent entries across all devices, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Event>, AcequiaError> {
        self.store.get_recent(limit).await
    }

    async fn resolve_device(&self, device_id: &DeviceId) -> Result<Device, AcequiaError> {
        self.devices.get_by_id(device_id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }
}
