//! Error kinds and storage errors shared by every service.

use sqlx::{Error, error::ErrorKind as SqlErrorKind};
use thiserror::Error;

/// SQLSTATE codes Postgres uses for serialization failures and deadlocks.
const TRANSIENT_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Coarse classification of a service failure, independent of the error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed resource does not exist.
    NotFound,

    /// The request itself is malformed or breaks a rule.
    InvalidRequest,

    /// A quantity is outside what stock or limits allow.
    OutOfRange,

    /// Lost a race with a concurrent writer; retrying may succeed.
    Conflict,

    /// No identified caller.
    Unauthorized,

    /// Storage or other infrastructure failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("transaction conflicted with a concurrent transaction")]
    Transient(#[source] Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl StoreError {
    /// Whether re-running the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::AlreadyExists | Self::Transient(_) => ErrorKind::Conflict,
            Self::InvalidReference | Self::MissingRequiredData | Self::InvalidData => {
                ErrorKind::InvalidRequest
            }
            Self::Sql(_) => ErrorKind::Internal,
        }
    }
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        let Some(database_error) = error.as_database_error() else {
            return Self::Sql(error);
        };

        if database_error
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.iter().any(|transient| code == *transient))
        {
            return Self::Transient(error);
        }

        match database_error.kind() {
            SqlErrorKind::UniqueViolation => Self::AlreadyExists,
            SqlErrorKind::ForeignKeyViolation => Self::InvalidReference,
            SqlErrorKind::NotNullViolation => Self::MissingRequiredData,
            SqlErrorKind::CheckViolation => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}
