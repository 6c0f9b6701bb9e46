//! Telemetry sink port — the atomic registry-plus-ledger commit.

use std::future::Future;

use acequia_domain::device::Device;
use acequia_domain::error::AcequiaError;
use acequia_domain::event::Event;

/// Commits one telemetry submission as a single unit.
///
/// `device` is the registry record after applying the submission and
/// `event` is the matching ledger entry; implementations must make both
/// visible together or neither. A submission whose `last_update` would move
/// the stored record backwards is rejected whole, with
/// [`ValidationError::StaleTimestamp`](acequia_domain::error::ValidationError::StaleTimestamp),
/// leaving no trace of either write. A submission carrying a different
/// owner than the stored record is likewise rejected whole, with
/// [`ValidationError::OwnerMismatch`](acequia_domain::error::ValidationError::OwnerMismatch):
/// the service-level ownership check reads before committing, so the sink
/// is the last line against two first-contact submissions racing for the
/// same device id.
pub trait TelemetrySink {
    /// Persist the device update and the event append atomically, returning
    /// the pair as committed.
    fn commit(
        &self,
        device: Device,
        event: Event,
    ) -> impl Future<Output = Result<(Device, Event), AcequiaError>> + Send;
}
