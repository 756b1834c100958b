//! Helpers for inspecting gRPC calls carried over HTTP.

use axum::response::{IntoResponse, Response};
use http::{Request, StatusCode};
use tonic::{Code, Status};

pub const REQUEST_ID: &str = "x-request-id";

/// Method name of a gRPC call: the last path segment of
/// `/package.Service/Method`.
pub fn rpc_method<B>(req: &Request<B>) -> &str {
    req.uri()
        .path()
        .rsplit('/')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("unknown")
}

pub fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Status code of a unary response.
///
/// Failures are trailers-only, so `grpc-status` sits in the headers. A 200
/// without it is a successful call whose status travels in the trailers.
pub fn response_code(response: &Response) -> Code {
    if let Some(status) = Status::from_header_map(response.headers()) {
        return status.code();
    }

    match response.status() {
        StatusCode::OK => Code::Ok,
        StatusCode::BAD_REQUEST => Code::Internal,
        StatusCode::UNAUTHORIZED => Code::Unauthenticated,
        StatusCode::FORBIDDEN => Code::PermissionDenied,
        StatusCode::NOT_FOUND => Code::Unimplemented,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => Code::Unavailable,
        _ => Code::Unknown,
    }
}

/// Trailers-only gRPC response carrying `code` and `message`.
pub fn grpc_error_response(code: Code, message: &str) -> Response {
    Status::new(code, message).into_http().into_response()
}
