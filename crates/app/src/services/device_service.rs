//! Device service — use-cases for the device registry.

use acequia_domain::device::Device;
use acequia_domain::error::{AcequiaError, NotFoundError, ValidationError};
use acequia_domain::id::DeviceId;
use acequia_domain::telemetry::UltrasonicReadings;
use acequia_domain::time::Timestamp;

use crate::ports::DeviceRepository;

/// Application service for the device registry.
pub struct DeviceService<R> {
    repo: R,
}

impl<R: DeviceRepository> DeviceService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register a pre-provisioned device.
    ///
    /// This is the out-of-band path for creating a registry record before
    /// the device's first submission; ingestion creates devices on its own
    /// when a new id arrives with an owner.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] if invariants fail or a device
    /// with the same id is already registered, or a storage error
    /// propagated from the repository.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.device_id))]
    pub async fn register(&self, device: Device) -> Result<Device, AcequiaError> {
        device.validate()?;
        if self.repo.get_by_id(&device.device_id).await?.is_some() {
            return Err(ValidationError::DuplicateDevice(device.device_id.to_string()).into());
        }
        self.repo.create(device).await
    }

    /// Record a telemetry submission against an existing device: overwrite
    /// the readings, advance `last_update` to `now`, and flag it online.
    /// Exactly one record changes.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] when no record exists for
    /// `device_id` (an owner is required to create one, which only
    /// provisioning or ingestion can supply), when a reading is not finite,
    /// or when `now` precedes the device's `last_update`. Storage errors
    /// propagate from the repository.
    #[tracing::instrument(skip(self, readings))]
    pub async fn upsert_state(
        &self,
        device_id: &DeviceId,
        readings: UltrasonicReadings,
        now: Timestamp,
    ) -> Result<Device, AcequiaError> {
        let Some(mut device) = self.repo.get_by_id(device_id).await? else {
            return Err(ValidationError::MissingOwner.into());
        };
        device.apply_reading(readings, now)?;
        self.repo.update(device).await
    }

    /// Flag a device offline without touching its readings or `last_update`.
    ///
    /// Called by the liveness sweep, never by telemetry ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::NotFound`] when no device with `device_id`
    /// exists — and changes nothing — or a storage error from the
    /// repository.
    #[tracing::instrument(skip(self))]
    pub async fn mark_offline(&self, device_id: &DeviceId) -> Result<Device, AcequiaError> {
        let mut device = self.get_device(device_id).await?;
        device.mark_offline();
        self.repo.update(device).await
    }

    /// Look up a device by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::NotFound`] when no device with `device_id`
    /// exists, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_device(&self, device_id: &DeviceId) -> Result<Device, AcequiaError> {
        self.repo.get_by_id(device_id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }

    /// List all devices.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_devices(&self) -> Result<Vec<Device>, AcequiaError> {
        self.repo.get_all().await
    }

    /// List online devices whose `last_update` is strictly before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn stale_devices(&self, cutoff: Timestamp) -> Result<Vec<Device>, AcequiaError> {
        self.repo.find_stale(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acequia_domain::id::UserId;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    struct InMemoryDeviceRepo {
        store: Mutex<HashMap<DeviceId, Device>>,
    }

    impl Default for InMemoryDeviceRepo {
        fn default() -> Self {
            Self {
                store: Mutex::new(HashMap::new()),
            }
        }
    }

    impl DeviceRepository for InMemoryDeviceRepo {
        fn create(
            &self,
            device: Device,
        ) -> impl Future<Output = Result<Device, AcequiaError>> + Send {
            let mut store = self.store.lock().unwrap();
            store.insert(device.device_id.clone(), device.clone());
            async { Ok(device) }
        }

        fn get_by_id(
            &self,
            device_id: &DeviceId,
        ) -> impl Future<Output = Result<Option<Device>, AcequiaError>> + Send {
            let store = self.store.lock().unwrap();
            let result = store.get(device_id).cloned();
            async { Ok(result) }
        }

        fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send {
            let store = self.store.lock().unwrap();
            let result: Vec<Device> = store.values().cloned().collect();
            async { Ok(result) }
        }

        fn update(
            &self,
            device: Device,
        ) -> impl Future<Output = Result<Device, AcequiaError>> + Send {
            let mut store = self.store.lock().unwrap();
            store.insert(device.device_id.clone(), device.clone());
            async { Ok(device) }
        }

        fn find_stale(
            &self,
            cutoff: Timestamp,
        ) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send {
            let store = self.store.lock().unwrap();
            let result: Vec<Device> = store
                .values()
                .filter(|d| d.is_online && d.last_update < cutoff)
                .cloned()
                .collect();
            async { Ok(result) }
        }
    }

    fn make_service() -> DeviceService<InMemoryDeviceRepo> {
        DeviceService::new(InMemoryDeviceRepo::default())
    }

    fn valid_device(device_id: &str) -> Device {
        Device::builder()
            .device_id(device_id)
            .owner(UserId::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_register_device_when_valid() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();

        let fetched = svc.get_device(&DeviceId::new("dev-1")).await.unwrap();
        assert_eq!(fetched.device_id.as_str(), "dev-1");
        assert!(!fetched.is_online);
    }

    #[tokio::test]
    async fn should_reject_register_when_id_already_taken() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();

        let result = svc.register(valid_device("dev-1")).await;
        assert!(matches!(
            result,
            Err(AcequiaError::Validation(ValidationError::DuplicateDevice(
                id
            ))) if id == "dev-1"
        ));
    }

    #[tokio::test]
    async fn should_reject_register_when_device_id_empty() {
        let svc = make_service();
        let mut device = valid_device("dev-1");
        device.device_id = DeviceId::default();

        let result = svc.register(device).await;
        assert!(matches!(
            result,
            Err(AcequiaError::Validation(ValidationError::EmptyDeviceId))
        ));
    }

    #[tokio::test]
    async fn should_upsert_state_and_flag_online() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();

        let updated = svc
            .upsert_state(
                &DeviceId::new("dev-1"),
                UltrasonicReadings::new(5.0, 12.0, 3.0),
                Timestamp::from_millis(1000),
            )
            .await
            .unwrap();

        assert!(updated.is_online);
        assert_eq!(updated.last_update, Timestamp::from_millis(1000));
        assert_eq!(updated.readings, UltrasonicReadings::new(5.0, 12.0, 3.0));

        let fetched = svc.get_device(&DeviceId::new("dev-1")).await.unwrap();
        assert_eq!(fetched.last_update, Timestamp::from_millis(1000));
    }

    #[tokio::test]
    async fn should_reject_upsert_state_when_device_unknown() {
        let svc = make_service();
        let result = svc
            .upsert_state(
                &DeviceId::new("ghost"),
                UltrasonicReadings::default(),
                Timestamp::from_millis(1000),
            )
            .await;
        assert!(matches!(
            result,
            Err(AcequiaError::Validation(ValidationError::MissingOwner))
        ));
    }

    #[tokio::test]
    async fn should_reject_upsert_state_when_timestamp_moves_backwards() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();
        svc.upsert_state(
            &DeviceId::new("dev-1"),
            UltrasonicReadings::new(5.0, 12.0, 3.0),
            Timestamp::from_millis(2000),
        )
        .await
        .unwrap();

        let result = svc
            .upsert_state(
                &DeviceId::new("dev-1"),
                UltrasonicReadings::new(4.0, 10.0, 2.0),
                Timestamp::from_millis(1000),
            )
            .await;

        assert!(matches!(
            result,
            Err(AcequiaError::Validation(
                ValidationError::StaleTimestamp { .. }
            ))
        ));
        // The stored record keeps the newer submission untouched.
        let fetched = svc.get_device(&DeviceId::new("dev-1")).await.unwrap();
        assert_eq!(fetched.last_update, Timestamp::from_millis(2000));
        assert_eq!(fetched.readings, UltrasonicReadings::new(5.0, 12.0, 3.0));
    }

    #[tokio::test]
    async fn should_mark_offline_without_touching_readings() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();
        svc.upsert_state(
            &DeviceId::new("dev-1"),
            UltrasonicReadings::new(5.0, 12.0, 3.0),
            Timestamp::from_millis(1000),
        )
        .await
        .unwrap();

        let flagged = svc.mark_offline(&DeviceId::new("dev-1")).await.unwrap();

        assert!(!flagged.is_online);
        assert_eq!(flagged.last_update, Timestamp::from_millis(1000));
        assert_eq!(flagged.readings, UltrasonicReadings::new(5.0, 12.0, 3.0));
    }

    #[tokio::test]
    async fn should_return_not_found_when_marking_unknown_device_offline() {
        let svc = make_service();
        let result = svc.mark_offline(&DeviceId::new("ghost")).await;
        assert!(matches!(result, Err(AcequiaError::NotFound(_))));
        assert!(svc.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_return_not_found_when_device_missing() {
        let svc = make_service();
        let result = svc.get_device(&DeviceId::new("ghost")).await;
        assert!(matches!(result, Err(AcequiaError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_list_all_devices() {
        let svc = make_service();
        svc.register(valid_device("dev-1")).await.unwrap();
        svc.register(valid_device("dev-2")).await.unwrap();

        let all = svc.list_devices().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn should_list_only_stale_online_devices() {
        let svc = make_service();
        svc.register(valid_device("quiet")).await.unwrap();
        svc.register(valid_device("active")).await.unwrap();
        svc.upsert_state(
            &DeviceId::new("quiet"),
            UltrasonicReadings::default(),
            Timestamp::from_millis(1000),
        )
        .await
        .unwrap();
        svc.upsert_state(
            &DeviceId::new("active"),
            UltrasonicReadings::default(),
            Timestamp::from_millis(5000),
        )
        .await
        .unwrap();

        let stale = svc
            .stale_devices(Timestamp::from_millis(4000))
            .await
            .unwrap();

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].device_id.as_str(), "quiet");
    }
}
