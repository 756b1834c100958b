// Allow missing docs for handler plumbing
#![allow(missing_docs)]

//! Flowgate admin gateway: one control-plane front door speaking gRPC and REST.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                            PROTOCOL SERVER                               │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │   secure:   one TLS port ── classify(req) ──┬── RPC router               │
//! │                                             └── HTTP mux                 │
//! │   insecure: gRPC port ── RPC router     HTTP port ── HTTP mux            │
//! │                                                                          │
//! │  RPC router                              HTTP mux                        │
//! │  ┌───────────────────────────────┐      ┌──────────────────────────────┐ │
//! │  │ Interceptor pipeline          │      │ /healthcheck                 │ │
//! │  │ Metrics → Metadata → Auth     │      │ /api/v1/openapi              │ │
//! │  │   → Audit → Recovery          │◄─────│ /login /callback /me ...     │ │
//! │  └──────────────┬────────────────┘ dial │ * → REST transcoding gateway │ │
//! │                 │                       └──────────────────────────────┘ │
//! │        AdminService (tonic)                                              │
//! └─────────────────┼────────────────────────────────────────────────────────┘
//!                   │
//!      ┌────────────┴─────────────┐
//!      ▼                          ▼
//! ExecutionManager          ResourceManager
//! ```
//!
//! # Pipeline
//!
//! - **Auth disabled**: metrics timing only
//! - **Auth enabled**: metrics timing, custom metadata extraction, auth
//!   verification, audit logging, in that order
//! - Panic recovery wraps every call in both modes
//!
//! # Usage
//!
//! ```ignore
//! use flowgate_gateway::{ProtocolServer, ServerConfig};
//!
//! let server = ProtocolServer::new(config, executions, resources)?;
//! let bound = server.bind().await?;
//! bound.serve(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod rest;
pub mod rpc;
pub mod server;
pub mod service;

// Re-exports for public API
pub use auth::{AuthError, AuthHandle, AuthenticationContext, Claims, NoAuthContext};
pub use domain::config::{AuthConfig, ConfigError, ServerConfig, ServerSecurityConfig};
pub use domain::error::ServerError;
pub use middleware::{AuditEntry, AuditSink, InterceptorPipeline, RpcMetrics, TracingAuditSink};
pub use ports::outbound::ExecutionManager;
pub use rest::TranscodingGateway;
pub use rpc::AdminRpc;
pub use server::{classify, http_mux, AssetSource, BundledAssets, HybridService, Protocol, TlsMaterial};
pub use service::{BoundServer, ProtocolServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
