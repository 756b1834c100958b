//! # Domain Errors
//!
//! Error types for the attribute engine and its store port.
//!
//! Store errors keep their classification on the way up: a missing key stays
//! NotFound and an unreachable store stays an unavailable dependency.

use flowgate_types::AdminError;
use thiserror::Error;

/// Errors returned by an [`AttributeStore`](crate::ports::outbound::AttributeStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record under this key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O or encoding failure inside the store.
    #[error("store failure: {0}")]
    Internal(String),
}

/// Errors surfaced by the [`ResourceManager`](crate::service::ResourceManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Malformed identity, missing attributes, or a type mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No override for this exact identity.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Stored bytes do not decode under the identity's resource type.
    #[error("corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for ResourceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => ResourceError::NotFound(key),
            StoreError::Unavailable(msg) => ResourceError::Unavailable(msg),
            StoreError::Internal(msg) => ResourceError::Store(msg),
        }
    }
}

impl From<ResourceError> for AdminError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::InvalidArgument(msg) => AdminError::InvalidArgument(msg),
            ResourceError::NotFound(msg) => AdminError::NotFound(msg),
            ResourceError::Unavailable(msg) => AdminError::DependencyUnavailable(msg),
            e @ (ResourceError::Corrupt { .. } | ResourceError::Store(_)) => {
                AdminError::Internal(e.to_string())
            }
        }
    }
}
