//! Time and timestamp helpers.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time, in milliseconds since the Unix epoch (UTC).
///
/// Submissions, ledger entries, and liveness decisions all compare these
/// values, so the representation is a plain ordered integer rather than a
/// calendar type. Nothing in the domain reads the wall clock on its own:
/// every mutating operation takes the current time as an explicit argument,
/// and [`now`] exists for binaries and tests to supply one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wrap a raw epoch-millisecond value.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// The raw epoch-millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Convert from a calendar datetime, truncating sub-millisecond
    /// precision.
    #[must_use]
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime.timestamp_millis())
    }

    /// Convert back to a calendar datetime, when representable.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl Add<chrono::Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: chrono::Duration) -> Self {
        Self(self.0 + rhs.num_milliseconds())
    }
}

impl Sub<chrono::Duration> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: chrono::Duration) -> Self {
        Self(self.0 - rhs.num_milliseconds())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Return the current UTC time.
///
/// Only composition roots and tests call this; core operations receive
/// their timestamp from the caller.
#[must_use]
pub fn now() -> Timestamp {
    Timestamp::from_datetime(Utc::now())
}
