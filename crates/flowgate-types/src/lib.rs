//! # Flowgate Types
//!
//! Wire schema and error taxonomy shared by every Flowgate crate.
//!
//! - [`admin`]: protobuf messages and the `AdminService` client/server
//!   generated from `proto/admin.proto`. Every message also derives
//!   `serde::{Serialize, Deserialize}` so the REST gateway can transcode JSON.
//! - [`errors`]: [`AdminError`], the single classification used by both the
//!   gRPC and the HTTP transport.
//! - [`status`]: gRPC code to HTTP status mapping for the REST gateway.

#![warn(clippy::all)]
#![deny(unsafe_code)]

#[allow(clippy::all, missing_docs)]
pub mod admin {
    tonic::include_proto!("flowgate.admin.v1");
}

/// Encoded `FileDescriptorSet` of the admin schema, served by gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("admin_descriptor");

pub mod errors;
mod serde_enum;
pub mod status;

pub use errors::{AdminError, AdminResult};
pub use status::http_status_for_code;

/// Fully-qualified gRPC service name. RPC paths are `/{ADMIN_SERVICE}/{Method}`.
pub const ADMIN_SERVICE: &str = "flowgate.admin.v1.AdminService";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the full gRPC path for an `AdminService` method.
pub fn rpc_path(method: &str) -> String {
    format!("/{}/{}", ADMIN_SERVICE, method)
}
