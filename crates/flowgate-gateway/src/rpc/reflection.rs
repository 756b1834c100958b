//! `grpc.reflection.v1` over the admin schema.
//!
//! Mounted beside the admin service when `grpc_server_reflection` is set.
//! Reflection is a streaming call, so it bypasses the unary interceptors.

use axum::Router;
use flowgate_types::FILE_DESCRIPTOR_SET;

use crate::domain::error::ServerError;

pub const REFLECTION_SERVICE: &str = "grpc.reflection.v1.ServerReflection";

/// Router answering reflection queries for every service in the schema.
pub fn reflection_router() -> Result<Router, ServerError> {
    let service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| ServerError::Reflection(e.to_string()))?;

    Ok(Router::new().route_service(&format!("/{}/*method", REFLECTION_SERVICE), service))
}
