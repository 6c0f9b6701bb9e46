//! # acequia-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRepository` — the device registry's storage contract
//!   - `EventStore` — append & query the event ledger
//!   - `TelemetrySink` — commit a registry update and a ledger append atomically
//!   - `UserDirectory` — resolve owner references against the external user base
//! - Define **driving/inbound ports** as use-case structs:
//!   - `DeviceService` — register, update state, mark offline, list, get
//!   - `LedgerService` — append, history, recent, get
//!   - `IngestService` — the combined registry-plus-ledger ingestion
//! - Run the **liveness sweep** that flags silent devices offline
//! - Provide **in-process infrastructure** (static user directory) that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `acequia-domain` only (plus `tokio::time` for the sweep loop).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod liveness;
pub mod ports;
pub mod services;
pub mod user_directory;
