//! Domain errors shared by the guard, the lifecycle operations and the live
//! interview state machine.
//!
//! Every variant except `Database` carries the numeric code that prefixes the
//! user-visible message (`"006: Already Registered"`). The HTTP layer maps the
//! variant to a status code; the code and message pass through unchanged.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0:03}: {1}")]
    MalformedInput(u16, String),

    #[error("{0:03}: {1}")]
    NotAuthorized(u16, String),

    #[error("{0:03}: {1}")]
    Conflict(u16, String),

    #[error("{0:03}: {1}")]
    NotFound(u16, String),

    #[error("{0:03}: {1}")]
    NotEligible(u16, String),

    #[error("{0:03}: {1}")]
    NotInProgress(u16, String),

    #[error("{0:03}: {1}")]
    NotConfigured(u16, String),

    #[error("{0:03}: {1}")]
    Timeout(u16, String),

    /// The external compiler service answered with an error
    #[error("{0:03}: {1}")]
    Compiler(u16, String),

    #[error("{0:03}: {1}")]
    Credential(u16, String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Coarse classification used by the HTTP layer and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    NotAuthorized,
    Conflict,
    NotFound,
    NotEligible,
    NotInProgress,
    NotConfigured,
    Timeout,
    Compiler,
    Internal,
}

impl Error {
    pub fn malformed(code: u16, message: impl Into<String>) -> Self {
        Self::MalformedInput(code, message.into())
    }

    pub fn not_authorized(code: u16, message: impl Into<String>) -> Self {
        Self::NotAuthorized(code, message.into())
    }

    pub fn conflict(code: u16, message: impl Into<String>) -> Self {
        Self::Conflict(code, message.into())
    }

    pub fn not_found(code: u16, message: impl Into<String>) -> Self {
        Self::NotFound(code, message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(..) => ErrorKind::MalformedInput,
            Self::NotAuthorized(..) => ErrorKind::NotAuthorized,
            Self::Conflict(..) => ErrorKind::Conflict,
            Self::NotFound(..) => ErrorKind::NotFound,
            Self::NotEligible(..) => ErrorKind::NotEligible,
            Self::NotInProgress(..) => ErrorKind::NotInProgress,
            Self::NotConfigured(..) => ErrorKind::NotConfigured,
            Self::Timeout(..) => ErrorKind::Timeout,
            Self::Compiler(..) => ErrorKind::Compiler,
            Self::Credential(..) | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Numeric code of the message prefix; `None` for raw database failures.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::MalformedInput(code, _)
            | Self::NotAuthorized(code, _)
            | Self::Conflict(code, _)
            | Self::NotFound(code, _)
            | Self::NotEligible(code, _)
            | Self::NotInProgress(code, _)
            | Self::NotConfigured(code, _)
            | Self::Timeout(code, _)
            | Self::Compiler(code, _)
            | Self::Credential(code, _) => Some(*code),
            Self::Database(_) => None,
        }
    }
}

/// Classify a failed write: unique violations become `Conflict`, foreign key
/// violations become `NotFound`, anything else stays a database error.
pub(crate) fn classify_write(
    err: sqlx::Error,
    conflict: (u16, &str),
    missing: (u16, &str),
) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::conflict(conflict.0, conflict.1);
        }
        if db_err.is_foreign_key_violation() {
            return Error::not_found(missing.0, missing.1);
        }
    }
    Error::Database(err)
}
