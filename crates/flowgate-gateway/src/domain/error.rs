//! Startup and serving errors.
//!
//! Per-request failures never show up here: they are mapped onto the wire by
//! the transport that saw them. A `ServerError` is fatal to the process.

use std::net::SocketAddr;
use std::path::PathBuf;

use super::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration rejected by `ServerConfig::validate`
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server socket bind error
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Certificate or key unreadable or malformed
    #[error("failed to load TLS material from {}: {reason}", path.display())]
    Tls { path: PathBuf, reason: String },

    /// Internal HTTP→RPC client could not be built
    #[error("failed to build rpc client: {0}")]
    Client(String),

    /// Reflection service could not load the schema descriptors
    #[error("failed to build reflection service: {0}")]
    Reflection(String),

    /// Listener host name did not resolve
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The RPC server stopped while the process was still serving
    #[error("rpc server exited unexpectedly: {0}")]
    RpcServerExited(String),

    /// Metric families could not be registered
    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// HTTP server I/O error
    #[error("http server error: {0}")]
    Serve(#[source] std::io::Error),
}
