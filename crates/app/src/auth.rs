//! Caller identity as supplied by the identity collaborator.

use storefront::uuids::UserUuid;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("not permitted to act on this resource")]
    Forbidden,
}

/// Who is calling, with the already-made authorisation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User { uuid: UserUuid, may_act: bool },
}

impl Principal {
    /// An authenticated user allowed to act on their own cart and orders.
    #[must_use]
    pub const fn user(uuid: UserUuid) -> Self {
        Self::User {
            uuid,
            may_act: true,
        }
    }

    /// The acting user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] for anonymous callers and
    /// [`AuthError::Forbidden`] when the caller may not act.
    pub const fn require_user(&self) -> Result<UserUuid, AuthError> {
        match self {
            Self::Anonymous => Err(AuthError::Unauthenticated),
            Self::User { may_act: false, .. } => Err(AuthError::Forbidden),
            Self::User { uuid, .. } => Ok(*uuid),
        }
    }
}
