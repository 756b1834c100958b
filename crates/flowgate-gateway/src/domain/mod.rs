//! Domain types for the gateway: configuration and startup errors.

pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::{AuthConfig, ConfigError, ServerConfig, ServerSecurityConfig};
pub use error::ServerError;
