//! Event store port — persistence for the append-only ledger.

use std::future::Future;

use acequia_domain::error::AcequiaError;
use acequia_domain::event::Event;
use acequia_domain::id::{DeviceId, EventId};
use acequia_domain::time::Timestamp;

/// Store for persisting and querying ledger [`Event`]s.
///
/// The ledger is append-only: no update or delete belongs to this contract,
/// and implementations must preserve insertion order among events that
/// share an `event_date`.
pub trait EventStore {
    /// Append a new event to the ledger.
    ///
    /// Implementations enforce per-device `event_date` order atomically: an
    /// event dated before the device's newest entry is rejected with
    /// [`ValidationError::StaleTimestamp`](acequia_domain::error::ValidationError::StaleTimestamp)
    /// even when the caller's own pre-check raced another append.
    fn append(&self, event: Event) -> impl Future<Output = Result<Event, AcequiaError>> + Send;

    /// Get an event by its unique identifier.
    fn get_by_id(
        &self,
        id: EventId,
    ) -> impl Future<Output = Result<Option<Event>, AcequiaError>> + Send;

    /// Find events for one device, ordered by `event_date` ascending with
    /// ties in insertion order.
    ///
    /// `since` is inclusive; `limit` caps the result length. Both default
    /// to unbounded.
    fn find_by_device(
        &self,
        device_id: &DeviceId,
        since: Option<Timestamp>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Event>, AcequiaError>> + Send;

    /// Get the most recent ledger entry for one device, if any.
    fn find_latest(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Event>, AcequiaError>> + Send;

    /// Get the most recent events across all devices, ordered newest-first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Event>, AcequiaError>> + Send;
}
