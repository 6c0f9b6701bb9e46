//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use acequia_app::ports::DeviceRepository;
use acequia_domain::device::Device;
use acequia_domain::error::AcequiaError;
use acequia_domain::id::{DeviceId, UserId};
use acequia_domain::telemetry::UltrasonicReadings;
use acequia_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let owner: uuid::Uuid = row.try_get("owner")?;
        let is_online: bool = row.try_get("is_online")?;
        let last_update: i64 = row.try_get("last_update")?;
        let ultrasonic1: f64 = row.try_get("ultrasonic1")?;
        let ultrasonic2: f64 = row.try_get("ultrasonic2")?;
        let ultrasonic3: f64 = row.try_get("ultrasonic3")?;

        Ok(Self(Device {
            device_id: DeviceId::new(device_id),
            owner: UserId::from_uuid(owner),
            is_online,
            last_update: Timestamp::from_millis(last_update),
            readings: UltrasonicReadings::new(ultrasonic1, ultrasonic2, ultrasonic3),
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO devices (device_id, owner, is_online, last_update, ultrasonic1, ultrasonic2, ultrasonic3)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE device_id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices";
const UPDATE: &str = r"
    UPDATE devices
    SET owner = ?, is_online = ?, last_update = ?, ultrasonic1 = ?, ultrasonic2 = ?, ultrasonic3 = ?
    WHERE device_id = ?
";
const SELECT_STALE: &str = "SELECT * FROM devices WHERE is_online = 1 AND last_update < ?";

/// `SQLite`-backed device repository.
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(device.device_id.as_str())
                .bind(device.owner.as_uuid())
                .bind(device.is_online)
                .bind(device.last_update.as_millis())
                .bind(device.readings.ultrasonic1)
                .bind(device.readings.ultrasonic2)
                .bind(device.readings.ultrasonic3)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(device)
        }
    }

    fn get_by_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        let device_id = device_id.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(device_id.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPDATE)
                .bind(device.owner.as_uuid())
                .bind(device.is_online)
                .bind(device.last_update.as_millis())
                .bind(device.readings.ultrasonic1)
                .bind(device.readings.ultrasonic2)
                .bind(device.readings.ultrasonic3)
                .bind(device.device_id.as_str())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(device)
        }
    }

    fn find_stale(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_STALE)
                .bind(cutoff.as_millis())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteDeviceRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
    }

    fn test_device(device_id: &str) -> Device {
        Device::builder()
            .device_id(device_id)
            .owner(UserId::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_device_when_valid() {
        let repo = setup().await;
        let device = test_device("dev-1");
        let owner = device.owner;

        repo.create(device).await.unwrap();

        let fetched = repo
            .get_by_id(&DeviceId::new("dev-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.device_id.as_str(), "dev-1");
        assert_eq!(fetched.owner, owner);
        assert!(!fetched.is_online);
        assert_eq!(fetched.last_update, Timestamp::from_millis(0));
    }

    #[tokio::test]
    async fn should_return_none_when_device_not_found() {
        let repo = setup().await;
        let result = repo.get_by_id(&DeviceId::new("ghost")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_reject_second_create_with_same_device_id() {
        let repo = setup().await;
        repo.create(test_device("dev-1")).await.unwrap();

        let result = repo.create(test_device("dev-1")).await;
        assert!(matches!(result, Err(AcequiaError::Storage(_))));
    }

    #[tokio::test]
    async fn should_list_all_devices() {
        let repo = setup().await;
        repo.create(test_device("dev-1")).await.unwrap();
        repo.create(test_device("dev-2")).await.unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn should_update_device_when_exists() {
        let repo = setup().await;
        let mut device = test_device("dev-1");
        repo.create(device.clone()).await.unwrap();

        device
            .apply_reading(
                UltrasonicReadings::new(5.0, 12.0, 3.0),
                Timestamp::from_millis(1000),
            )
            .unwrap();
        repo.update(device).await.unwrap();

        let fetched = repo
            .get_by_id(&DeviceId::new("dev-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.is_online);
        assert_eq!(fetched.last_update, Timestamp::from_millis(1000));
        assert_eq!(fetched.readings, UltrasonicReadings::new(5.0, 12.0, 3.0));
    }

    #[tokio::test]
    async fn should_find_only_stale_online_devices() {
        let repo = setup().await;
        let mut quiet = test_device("quiet");
        quiet
            .apply_reading(UltrasonicReadings::default(), Timestamp::from_millis(1000))
            .unwrap();
        let mut active = test_device("active");
        active
            .apply_reading(UltrasonicReadings::default(), Timestamp::from_millis(5000))
            .unwrap();
        let mut sleeping = test_device("sleeping");
        sleeping
            .apply_reading(UltrasonicReadings::default(), Timestamp::from_millis(1000))
            .unwrap();
        sleeping.mark_offline();
        repo.create(quiet).await.unwrap();
        repo.create(active).await.unwrap();
        repo.create(sleeping).await.unwrap();

        let stale = repo.find_stale(Timestamp::from_millis(4000)).await.unwrap();

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].device_id.as_str(), "quiet");
    }

    #[tokio::test]
    async fn should_preserve_readings_through_roundtrip() {
        let repo = setup().await;
        let mut device = test_device("dev-1");
        device
            .apply_reading(
                UltrasonicReadings::new(5.5, 12.25, 3.75),
                Timestamp::from_millis(1000),
            )
            .unwrap();
        repo.create(device).await.unwrap();

        let fetched = repo
            .get_by_id(&DeviceId::new("dev-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.readings, UltrasonicReadings::new(5.5, 12.25, 3.75));
    }
}
