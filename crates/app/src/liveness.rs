//! Liveness sweep — flags silent devices offline.
//!
//! Telemetry ingestion flags a device online; nothing in the ingestion path
//! ever flags it back. This sweep is the external caller of `mark_offline`
//! the registry contract expects: every device still flagged online whose
//! `last_update` has fallen behind the configured threshold gets its flag
//! cleared. Readings and `last_update` are never touched.

use acequia_domain::error::AcequiaError;
use acequia_domain::time::{self, Timestamp};

use crate::ports::DeviceRepository;
use crate::services::device_service::DeviceService;

/// Periodic staleness sweep over the device registry.
///
/// The threshold and cadence come from configuration; the sweep itself
/// holds no policy beyond "stale means `last_update` older than
/// `offline_after`".
pub struct LivenessSweeper<R> {
    devices: DeviceService<R>,
    offline_after: chrono::Duration,
}

impl<R: DeviceRepository> LivenessSweeper<R> {
    /// Create a sweeper that considers a device stale once its
    /// `last_update` is more than `offline_after` behind the sweep time.
    pub fn new(devices: DeviceService<R>, offline_after: chrono::Duration) -> Self {
        Self {
            devices,
            offline_after,
        }
    }

    /// Run one sweep at `now`, returning how many devices were flagged
    /// offline.
    ///
    /// Only devices still flagged online with `last_update` strictly before
    /// `now - offline_after` are touched; each goes through
    /// [`DeviceService::mark_offline`], so readings and `last_update`
    /// survive unchanged.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_once(&self, now: Timestamp) -> Result<usize, AcequiaError> {
        let cutoff = now - self.offline_after;
        let stale = self.devices.stale_devices(cutoff).await?;
        let count = stale.len();
        for device in stale {
            tracing::info!(device_id = %device.device_id, last_update = %device.last_update, "flagging silent device offline");
            self.devices.mark_offline(&device.device_id).await?;
        }
        if count > 0 {
            tracing::info!(count, "liveness sweep flagged devices offline");
        }
        Ok(count)
    }

    /// Sweep on a fixed cadence until `shutdown` fires.
    ///
    /// Sweep failures are logged and the loop keeps going; a transient
    /// storage error must not kill the daemon.
    pub async fn run(
        &self,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.sweep_once(time::now()).await {
                        tracing::warn!(%error, "liveness sweep failed");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("liveness sweep shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acequia_domain::device::Device;
    use acequia_domain::id::{DeviceId, UserId};
    use acequia_domain::telemetry::UltrasonicReadings;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct InMemoryDeviceRepo {
        store: Arc<Mutex<HashMap<DeviceId, Device>>>,
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

    async fn seed_device(repo: &InMemoryDeviceRepo, id: &str, last_update: Timestamp) {
        let mut device = Device::builder()
            .device_id(id)
            .owner(UserId::new())
            .build()
            .unwrap();
        device
            .apply_reading(UltrasonicReadings::new(5.0, 12.0, 3.0), last_update)
            .unwrap();
        repo.create(device).await.unwrap();
    }

    fn make_sweeper(repo: &InMemoryDeviceRepo) -> LivenessSweeper<InMemoryDeviceRepo> {
        LivenessSweeper::new(
            DeviceService::new(repo.clone()),
            chrono::Duration::seconds(300),
        )
    }

    #[tokio::test]
    async fn should_flag_only_stale_online_devices_offline() {
        let repo = InMemoryDeviceRepo::default();
        seed_device(&repo, "quiet", Timestamp::from_millis(1_000)).await;
        seed_device(&repo, "active", Timestamp::from_millis(600_000)).await;
        let sweeper = make_sweeper(&repo);

        let count = sweeper
            .sweep_once(Timestamp::from_millis(601_000))
            .await
            .unwrap();

        assert_eq!(count, 1);
        let store = repo.store.lock().unwrap();
        assert!(!store[&DeviceId::new("quiet")].is_online);
        assert!(store[&DeviceId::new("active")].is_online);
    }

    #[tokio::test]
    async fn should_keep_readings_and_last_update_when_sweeping() {
        let repo = InMemoryDeviceRepo::default();
        seed_device(&repo, "quiet", Timestamp::from_millis(1_000)).await;
        let sweeper = make_sweeper(&repo);

        sweeper
            .sweep_once(Timestamp::from_millis(10_000_000))
            .await
            .unwrap();

        let store = repo.store.lock().unwrap();
        let device = &store[&DeviceId::new("quiet")];
        assert_eq!(device.last_update, Timestamp::from_millis(1_000));
        assert_eq!(device.readings, UltrasonicReadings::new(5.0, 12.0, 3.0));
    }

    #[tokio::test]
    async fn should_not_flag_devices_already_offline() {
        let repo = InMemoryDeviceRepo::default();
        seed_device(&repo, "quiet", Timestamp::from_millis(1_000)).await;
        let sweeper = make_sweeper(&repo);

        let first = sweeper
            .sweep_once(Timestamp::from_millis(601_000))
            .await
            .unwrap();
        let second = sweeper
            .sweep_once(Timestamp::from_millis(602_000))
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn should_do_nothing_when_registry_is_empty() {
        let repo = InMemoryDeviceRepo::default();
        let sweeper = make_sweeper(&repo);
        let count = sweeper
            .sweep_once(Timestamp::from_millis(601_000))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_sweep_on_cadence_until_shutdown() {
        let repo = InMemoryDeviceRepo::default();
        seed_device(&repo, "quiet", Timestamp::from_millis(1_000)).await;
        let sweeper = make_sweeper(&repo);
        let (tx, rx) = tokio::sync::watch::channel(false);

        let repo_view = repo.clone();
        let handle = tokio::spawn(async move {
            sweeper.run(std::time::Duration::from_secs(60), rx).await;
        });

        // The first tick fires immediately; give the sweep a chance to run.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(!repo_view.store.lock().unwrap()[&DeviceId::new("quiet")].is_online);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
