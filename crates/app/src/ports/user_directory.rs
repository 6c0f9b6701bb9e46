//! User directory port — resolving owner references.
//!
//! Users are not modeled in this core; devices and events only carry a
//! [`UserId`] reference. This port is the resolution contract against
//! whatever system actually owns the user base.

use std::future::Future;

use acequia_domain::error::AcequiaError;
use acequia_domain::id::UserId;

/// Resolves whether a user reference points at an existing user.
pub trait UserDirectory {
    /// Whether `user` exists in the directory.
    fn exists(&self, user: UserId) -> impl Future<Output = Result<bool, AcequiaError>> + Send;
}

impl<T: UserDirectory + Send + Sync> UserDirectory for std::sync::Arc<T> {
    fn exists(&self, user: UserId) -> impl Future<Output = Result<bool, AcequiaError>> + Send {
        (**self).exists(user)
    }
}
