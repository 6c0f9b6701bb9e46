//! Storage port — the device registry's repository trait.

use std::future::Future;

use acequia_domain::device::Device;
use acequia_domain::error::AcequiaError;
use acequia_domain::id::DeviceId;
use acequia_domain::time::Timestamp;

/// Repository holding exactly one current-state record per device.
///
/// Implementations must enforce `device_id` uniqueness: `create` for an
/// already known id is a storage-level conflict, and `update` replaces the
/// whole record in one write so concurrent submissions can never interleave
/// field-by-field.
pub trait DeviceRepository {
    /// Persist a new device record.
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, AcequiaError>> + Send;

    /// Get a device by its identifier.
    fn get_by_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, AcequiaError>> + Send;

    /// Get all device records.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send;

    /// Replace an existing device record.
    fn update(&self, device: Device) -> impl Future<Output = Result<Device, AcequiaError>> + Send;

    /// Find devices still flagged online whose `last_update` is strictly
    /// before `cutoff` — the candidates for the liveness sweep.
    fn find_stale(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<Vec<Device>, AcequiaError>> + Send;
}
