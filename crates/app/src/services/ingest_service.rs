//! Ingest service — the combined registry-plus-ledger ingestion.

use acequia_domain::device::Device;
use acequia_domain::error::{AcequiaError, ConsistencyError, NotFoundError, ValidationError};
use acequia_domain::event::{Event, EventType};
use acequia_domain::id::{DeviceId, UserId};
use acequia_domain::telemetry::UltrasonicReadings;
use acequia_domain::time::Timestamp;

use crate::ports::{DeviceRepository, TelemetrySink, UserDirectory};

/// Application service turning one telemetry submission into one registry
/// update plus one ledger entry, committed together.
///
/// Everything before the sink call is read-only, so a cancelled ingestion
/// leaves no trace; once [`TelemetrySink::commit`] starts, the sink's
/// transaction either applies both records or neither.
pub struct IngestService<R, U, K> {
    devices: R,
    users: U,
    sink: K,
}

impl<R, U, K> IngestService<R, U, K>
where
    R: DeviceRepository,
    U: UserDirectory,
    K: TelemetrySink,
{
    /// Create a new service from the registry repository, the user
    /// directory, and the atomic sink.
    pub fn new(devices: R, users: U, sink: K) -> Self {
        Self {
            devices,
            users,
            sink,
        }
    }

    /// Ingest one telemetry submission.
    ///
    /// A new `device_id` creates the registry record with `owner`; a known
    /// one must belong to `owner` already, since ownership transfer is out
    /// of scope. The ledger entry snapshots the same readings, carries the
    /// device's owner, and is classified by the explicit `event_type`
    /// override or defaults to data submission.
    ///
    /// On success the returned pair is mutually consistent:
    /// `device.last_update == event.event_date == now` and both carry the
    /// submitted readings.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] for non-finite readings, an
    /// empty device id, a foreign owner, or a submission older than the
    /// device's current state; [`AcequiaError::NotFound`] when `owner` is
    /// not in the directory; [`AcequiaError::Consistency`] if the committed
    /// pair diverges, which indicates a sink bug and is logged as an error;
    /// or a storage error from the sink.
    #[tracing::instrument(skip(self, readings))]
    pub async fn ingest(
        &self,
        device_id: &DeviceId,
        owner: UserId,
        event_type: Option<EventType>,
        readings: UltrasonicReadings,
        now: Timestamp,
    ) -> Result<(Device, Event), AcequiaError> {
        readings.validate()?;
        if !self.users.exists(owner).await? {
            return Err(NotFoundError {
                entity: "User",
                id: owner.to_string(),
            }
            .into());
        }

        let mut device = match self.devices.get_by_id(device_id).await? {
            Some(existing) => {
                if existing.owner != owner {
                    return Err(ValidationError::OwnerMismatch.into());
                }
                existing
            }
            None => Device::builder()
                .device_id(device_id.clone())
                .owner(owner)
                .build()?,
        };
        device.apply_reading(readings, now)?;

        let event = Event::builder()
            .device_id(device.device_id.clone())
            .owner(device.owner)
            .event_type(EventType::classify(event_type))
            .event_date(now)
            .readings(readings)
            .build()?;

        let (device, event) = self.sink.commit(device, event).await?;
        Self::verify_consistent(&device, &event)?;
        Ok((device, event))
    }

    /// Cross-check the pair the sink returned.
    ///
    /// A divergence here means the atomic-commit guarantee broke; it is
    /// logged at error level and surfaced as a fatal consistency error.
    fn verify_consistent(device: &Device, event: &Event) -> Result<(), AcequiaError> {
        if device.last_update != event.event_date {
            let error = ConsistencyError::TimestampDiverged {
                device_id: device.device_id.to_string(),
                last_update: device.last_update,
                event_date: event.event_date,
            };
            tracing::error!(%error, "ingestion committed a divergent pair");
            return Err(error.into());
        }
        if device.readings != event.readings {
            let error = ConsistencyError::ReadingsDiverged {
                device_id: device.device_id.to_string(),
            };
            tracing::error!(%error, "ingestion committed a divergent pair");
            return Err(error.into());
        }
        Ok(())
    }
}
