use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use super::{AuthError, AuthRequest, AuthenticationContext, Claims};

/// Authentication context that accepts everything and offers no endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthContext;

#[async_trait]
impl AuthenticationContext for NoAuthContext {
    fn custom_authorization_header(&self) -> Option<HeaderName> {
        None
    }

    async fn validate(&self, _credential: &str) -> Result<Claims, AuthError> {
        Ok(Claims::anonymous())
    }

    fn is_exempt(&self, _method: &str, _from_http: bool) -> bool {
        true
    }

    fn cookie_to_metadata(&self, _headers: &HeaderMap) -> Option<(HeaderName, HeaderValue)> {
        None
    }

    async fn login(&self, _request: AuthRequest) -> Response {
        disabled()
    }

    async fn callback(&self, _request: AuthRequest) -> Response {
        disabled()
    }

    async fn me(&self, _request: AuthRequest) -> Response {
        disabled()
    }

    fn metadata(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}

fn disabled() -> Response {
    (StatusCode::NOT_FOUND, "authentication is disabled").into_response()
}
