//! # Flowgate Server
//!
//! Wires the in-repo adapters into the gateway. The binary in `main.rs` only
//! loads configuration, installs logging and waits for Ctrl+C.
//!
//! ## Modules
//!
//! - `config` - `FLOWGATE_*` environment loading
//! - `adapters/` - Execution registry and token authentication

pub mod adapters;
pub mod config;

use std::sync::Arc;

use flowgate_gateway::{AuthHandle, ConfigError, ProtocolServer, ServerError};
use flowgate_resources::{FileAttributeStore, ResourceManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use adapters::{InMemoryExecutionRegistry, TokenAuthContext};
pub use config::AppConfig;

/// Assemble the gateway from `config`. Listeners are not opened yet.
pub fn build_server(config: &AppConfig) -> Result<ProtocolServer, ServerError> {
    let resources = match &config.attribute_store_path {
        Some(path) => {
            let store = FileAttributeStore::open(path).map_err(|e| {
                ConfigError::Invalid(format!("attribute store {}: {e}", path.display()))
            })?;
            info!(path = %path.display(), "using file-backed attribute store");
            ResourceManager::new(Arc::new(store))
        }
        None => {
            info!("using in-memory attribute store");
            ResourceManager::in_memory()
        }
    };

    let mut server = ProtocolServer::new(
        config.server.clone(),
        Arc::new(InMemoryExecutionRegistry::new()),
        resources,
    )?;

    if config.server.security.use_auth {
        let secret = config
            .server
            .auth
            .shared_secret
            .clone()
            .ok_or_else(|| ConfigError::Invalid("auth.shared_secret is required".into()))?;
        let auth: AuthHandle = Arc::new(TokenAuthContext::new(secret, config.server.auth.clone()));
        server = server.with_auth(auth);
    }

    Ok(server)
}

/// Install the global tracing subscriber. `RUST_LOG` selects the filter,
/// `info` by default.
pub fn init_logging(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
