//! `SQLite` implementation of [`EventStore`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use acequia_app::ports::EventStore;
use acequia_domain::error::{AcequiaError, ValidationError};
use acequia_domain::event::{Event, EventType};
use acequia_domain::id::{DeviceId, EventId, UserId};
use acequia_domain::telemetry::UltrasonicReadings;
use acequia_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Event`].
struct Wrapper(Event);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Event> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let device_id: String = row.try_get("device_id")?;
        let owner: uuid::Uuid = row.try_get("owner")?;
        let event_type: String = row.try_get("event_type")?;
        let event_date: i64 = row.try_get("event_date")?;
        let ultrasonic1: f64 = row.try_get("ultrasonic1")?;
        let ultrasonic2: f64 = row.try_get("ultrasonic2")?;
        let ultrasonic3: f64 = row.try_get("ultrasonic3")?;

        let event_type = EventType::from_str(&event_type)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Event {
            id: EventId::from_uuid(id),
            device_id: DeviceId::new(device_id),
            owner: UserId::from_uuid(owner),
            event_type,
            event_date: Timestamp::from_millis(event_date),
            readings: UltrasonicReadings::new(ultrasonic1, ultrasonic2, ultrasonic3),
        }))
    }
}

/// Guarded append: the ledger is strictly ordered per device, so an entry
/// dated before the device's newest one must not land. Guard and insert
/// are one statement, so two racing appends cannot both pass the check.
/// A zero row count means the guard tripped.
pub(crate) const INSERT_GUARDED: &str = r"
    INSERT INTO events (id, device_id, owner, event_type, event_date, ultrasonic1, ultrasonic2, ultrasonic3)
    SELECT ?, ?, ?, ?, ?, ?, ?, ?
    WHERE NOT EXISTS (
        SELECT 1 FROM events WHERE device_id = ? AND event_date > ?
    )
";

pub(crate) const SELECT_LATEST_DATE: &str = r"
    SELECT event_date FROM events
    WHERE device_id = ?
    ORDER BY event_date DESC
    LIMIT 1
";

const SELECT_BY_ID: &str = "SELECT * FROM events WHERE id = ?";

const SELECT_BY_DEVICE_SINCE: &str = r"
    SELECT * FROM events
    WHERE device_id = ? AND event_date >= ?
    ORDER BY event_date ASC, seq ASC
    LIMIT ?
";

const SELECT_BY_DEVICE_SINCE_NO_LIMIT: &str = r"
    SELECT * FROM events
    WHERE device_id = ? AND event_date >= ?
    ORDER BY event_date ASC, seq ASC
";

const SELECT_LATEST_BY_DEVICE: &str = r"
    SELECT * FROM events
    WHERE device_id = ?
    ORDER BY event_date DESC, seq DESC
    LIMIT 1
";

const SELECT_RECENT: &str = r"
    SELECT * FROM events
    ORDER BY event_date DESC, seq DESC
    LIMIT ?
";

/// `SQLite`-backed event store.
///
/// Append-only by construction: this type only ever issues `INSERT` and
/// `SELECT` statements against the events table. Per-device `event_date`
/// order is enforced at the statement level, so the service's read-then-
/// append check cannot be raced past.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, event: Event) -> impl Future<Output = Result<Event, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(INSERT_GUARDED)
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
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                let row = sqlx::query(SELECT_LATEST_DATE)
                    .bind(event.device_id.as_str())
                    .fetch_one(&pool)
                    .await
                    .map_err(StorageError::from)?;
                let current: i64 = row.try_get("event_date").map_err(StorageError::from)?;
                return Err(ValidationError::StaleTimestamp {
                    submitted: event.event_date,
                    current: Timestamp::from_millis(current),
                }
                .into());
            }

            Ok(event)
        }
    }

    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.as_uuid())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn find_by_device(
        &self,
        device_id: &DeviceId,
        since: Option<Timestamp>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Event>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.clone();
        async move {
            let since = since.unwrap_or_default();
            let rows: Vec<Wrapper> = if let Some(limit) = limit {
                let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
                sqlx::query_as(SELECT_BY_DEVICE_SINCE)
                    .bind(device_id.as_str())
                    .bind(since.as_millis())
                    .bind(limit_i64)
                    .fetch_all(&pool)
                    .await
                    .map_err(StorageError::from)?
            } else {
                sqlx::query_as(SELECT_BY_DEVICE_SINCE_NO_LIMIT)
                    .bind(device_id.as_str())
                    .bind(since.as_millis())
                    .fetch_all(&pool)
                    .await
                    .map_err(StorageError::from)?
            };

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_latest(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Event>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_LATEST_BY_DEVICE)
                .bind(device_id.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
                .bind(limit_i64)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}
