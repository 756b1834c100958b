//! RPC failures rendered as HTTP responses.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flowgate_types::{http_status_for_code, AdminError};
use serde::Serialize;
use tonic::{Code, Status};

/// A failed transcoded call.
///
/// Carries the gRPC status so HTTP clients see the same class as native
/// clients would.
#[derive(Debug, Clone)]
pub struct RestError(pub Status);

/// Body of every non-2xx transcoder response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    /// Numeric gRPC code.
    pub code: i32,
    pub message: String,
}

impl RestError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self(Status::invalid_argument(message))
    }

    pub fn status_code(&self) -> StatusCode {
        http_status_for_code(self.0.code())
    }

    pub fn code(&self) -> Code {
        self.0.code()
    }
}

impl From<Status> for RestError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl From<QueryRejection> for RestError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_argument(rejection.body_text())
    }
}

impl From<AdminError> for RestError {
    fn from(err: AdminError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let message = self.0.message().to_string();
        let body = ErrorBody {
            error: message.clone(),
            code: self.0.code() as i32,
            message,
        };
        (self.status_code(), Json(body)).into_response()
    }
}
