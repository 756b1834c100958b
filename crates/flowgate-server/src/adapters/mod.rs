//! Adapters implementing the gateway's outbound ports.

pub mod execution_registry;
pub mod token_auth;

pub use execution_registry::InMemoryExecutionRegistry;
pub use token_auth::TokenAuthContext;
