//! # acequia-domain
//!
//! Pure domain model for the acequia irrigation-monitoring core.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (the registry record: current readings, owner, liveness)
//! - Define **Events** (immutable, timestamped ledger records of device activity)
//! - Define **Telemetry** value objects (one submission's three sensor readings)
//! - Define **Water levels** (the discrete vocabulary downstream classifiers use)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod level;
pub mod telemetry;
