//! # Error Types
//!
//! One classification per fault, shared by both transports. RPC clients see
//! the gRPC code, HTTP clients see the mapped status, and the class is the
//! same either way.

use http::StatusCode;
use thiserror::Error;
use tonic::{Code, Status};

/// Result alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;

/// Errors surfaced by admin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// Malformed or missing request fields.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No valid credential on a non-exempt call.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Exact-match lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same identifier already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A collaborator (store, bundled asset, upstream) is unavailable.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Unexpected fault, including recovered panics and corrupt records.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// gRPC status code for this class.
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::Unauthenticated(_) => Code::Unauthenticated,
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::DependencyUnavailable(_) => Code::Unavailable,
            Self::Internal(_) => Code::Internal,
        }
    }

    /// HTTP status for this class.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::DependencyUnavailable(_) => StatusCode::FAILED_DEPENDENCY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message without the class prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(m)
            | Self::Unauthenticated(m)
            | Self::NotFound(m)
            | Self::AlreadyExists(m)
            | Self::DependencyUnavailable(m)
            | Self::Internal(m) => m,
        }
    }

    /// Shorthand for the common "field is required" rejection.
    pub fn missing(field: &str) -> Self {
        Self::InvalidArgument(format!("{} is required", field))
    }
}

impl From<AdminError> for Status {
    fn from(err: AdminError) -> Self {
        Status::new(err.code(), err.message().to_string())
    }
}

impl From<Status> for AdminError {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => {
                Self::InvalidArgument(message)
            }
            Code::Unauthenticated => Self::Unauthenticated(message),
            Code::NotFound => Self::NotFound(message),
            Code::AlreadyExists => Self::AlreadyExists(message),
            Code::Unavailable => Self::DependencyUnavailable(message),
            _ => Self::Internal(message),
        }
    }
}
