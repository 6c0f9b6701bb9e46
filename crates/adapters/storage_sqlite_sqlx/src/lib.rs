//! # acequia-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the port traits defined in `acequia-app::ports`:
//!   `DeviceRepository`, `EventStore`, and `TelemetrySink`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! The devices table is keyed by the natural `device_id`, so the
//! one-record-per-device invariant is the primary key. Events get an
//! `AUTOINCREMENT` sequence number alongside their UUID: it is the durable
//! insertion-order tie-break for entries sharing an `event_date`.
//!
//! ## Dependency rule
//! Depends on `acequia-app` (for port traits) and `acequia-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

pub mod device_repo;
pub mod error;
pub mod event_store;
pub mod pool;
pub mod telemetry_sink;

pub use device_repo::SqliteDeviceRepository;
pub use error::StorageError;
pub use event_store::SqliteEventStore;
pub use pool::{Config, Database};
pub use telemetry_sink::SqliteTelemetrySink;
