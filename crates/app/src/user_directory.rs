//! In-process user directory backed by a fixed set of identifiers.

use std::collections::HashSet;
use std::future::Future;

use acequia_domain::error::AcequiaError;
use acequia_domain::id::UserId;

use crate::ports::UserDirectory;

/// A [`UserDirectory`] that resolves against a fixed, in-memory id set.
///
/// Good enough for the daemon, tests, and embedders until a real user base
/// is plugged in behind the port.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashSet<UserId>,
}

impl StaticUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to the directory.
    pub fn insert(&mut self, user: UserId) {
        self.users.insert(user);
    }
}

impl FromIterator<UserId> for StaticUserDirectory {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            users: iter.into_iter().collect(),
        }
    }
}

impl UserDirectory for StaticUserDirectory {
    fn exists(&self, user: UserId) -> impl Future<Output = Result<bool, AcequiaError>> + Send {
        let known = self.users.contains(&user);
        async move { Ok(known) }
    }
}
