//! `SQLite` implementation of [`TelemetrySink`] — the atomic
//! registry-plus-ledger commit.

use std::future::Future;

use sqlx::{Row, SqlitePool};

use acequia_app::ports::TelemetrySink;
use acequia_domain::device::Device;
use acequia_domain::error::{AcequiaError, ValidationError};
use acequia_domain::event::Event;
use acequia_domain::time::Timestamp;

use crate::error::StorageError;

/// Guarded upsert: creates the registry row on first contact, otherwise
/// overwrites the live state — but only when the submission is at least as
/// new as what is stored and carries the stored owner. A zero row count
/// means one of the guards tripped. `owner` is deliberately absent from the
/// update list: ownership never changes through telemetry, and a submission
/// claiming a different owner is rejected whole rather than silently
/// re-attributed.
const UPSERT_DEVICE: &str = r"
    INSERT INTO devices (device_id, owner, is_online, last_update, ultrasonic1, ultrasonic2, ultrasonic3)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (device_id) DO UPDATE SET
        is_online = excluded.is_online,
        last_update = excluded.last_update,
        ultrasonic1 = excluded.ultrasonic1,
        ultrasonic2 = excluded.ultrasonic2,
        ultrasonic3 = excluded.ultrasonic3
    WHERE excluded.last_update >= devices.last_update
      AND devices.owner = excluded.owner
";

const SELECT_GUARD_FIELDS: &str = "SELECT owner, last_update FROM devices WHERE device_id = ?";

/// `SQLite`-backed telemetry sink.
///
/// Both writes run inside one transaction: a reader can never observe the
/// registry row without its ledger entry or the other way round, and a
/// rejected submission leaves no trace of either.
pub struct SqliteTelemetrySink {
    pool: SqlitePool,
}

impl SqliteTelemetrySink {
    /// Create a new sink using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TelemetrySink for SqliteTelemetrySink {
    fn commit(
        &self,
        device: Device,
        event: Event,
    ) -> impl Future<Output = Result<(Device, Event), AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;

            let result = sqlx::query(UPSERT_DEVICE)
                .bind(device.device_id.as_str())
                .bind(device.owner.as_uuid())
                .bind(device.is_online)
                .bind(device.last_update.as_millis())
                .bind(device.readings.ultrasonic1)
                .bind(device.readings.ultrasonic2)
                .bind(device.readings.ultrasonic3)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                // Either a newer submission committed between the caller's
                // read and this write, or the stored row belongs to someone
                // else (two first-contact ingests racing for the same id).
                // Dropping the transaction rolls everything back.
                let row = sqlx::query(SELECT_GUARD_FIELDS)
                    .bind(device.device_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                let stored_owner: uuid::Uuid = row.try_get("owner").map_err(StorageError::from)?;
                if stored_owner != device.owner.as_uuid() {
                    return Err(ValidationError::OwnerMismatch.into());
                }
                let current: i64 = row.try_get("last_update").map_err(StorageError::from)?;
                return Err(ValidationError::StaleTimestamp {
                    submitted: device.last_update,
                    current: Timestamp::from_millis(current),
                }
                .into());
            }

            let result = sqlx::query(crate::event_store::INSERT_GUARDED)
                .bind(event.id.as_uuid())
                .bind(event.device_id.as_str())
                .bind(event.owner.as_uuid())
                .bind(event.event_type.as_str())
                .bind(event.event_date.as_millis())
                .bind(event.readings.ultrasonic1)
                .bind(event.readings.ultrasonic2)
                .bind(event.readings.ultrasonic3)
                .bind(event.device_id.as_str())
                .bind(event.event_date.as_millis())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                // The ledger already holds a newer entry for this device
                // (a bare append can outrun the registry's last_update).
                // Roll the device update back with the event.
                let row = sqlx::query(crate::event_store::SELECT_LATEST_DATE)
                    .bind(event.device_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                let current: i64 = row.try_get("event_date").map_err(StorageError::from)?;
                return Err(ValidationError::StaleTimestamp {
                    submitted: event.event_date,
                    current: Timestamp::from_millis(current),
                }
                .into());
            }

            tx.commit().await.map_err(StorageError::from)?;

            Ok((device, event))
        }
    }
}
