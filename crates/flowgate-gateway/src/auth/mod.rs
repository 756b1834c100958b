//! Authentication capability consumed by the pipeline and the HTTP mux.
//!
//! The gateway never speaks an identity-provider protocol itself. It asks an
//! [`AuthenticationContext`] to validate credentials, to bridge browser
//! cookies into RPC metadata, and to answer the login/callback/user-info
//! endpoints. [`NoAuthContext`] is the no-op variant.

mod noop;

pub use noop::NoAuthContext;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use flowgate_types::AdminError;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Metadata key marking a call as originating from the REST gateway.
pub const FROM_HTTP: HeaderName = HeaderName::from_static("from_http");

/// Per-process secret the REST gateway attaches under [`FROM_HTTP`].
///
/// Generated once when the server binds. A native client that sets
/// `from_http` itself cannot know the value, so its call is treated as native.
#[derive(Clone)]
pub struct HttpOrigin {
    token: HeaderValue,
}

impl HttpOrigin {
    pub fn generate() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self {
            token: HeaderValue::from_str(&token).unwrap_or(HeaderValue::from_static("")),
        }
    }

    /// Metadata entry added to every transcoded call.
    pub fn tag(&self) -> (HeaderName, HeaderValue) {
        (FROM_HTTP, self.token.clone())
    }

    /// Whether `headers` carry this process's tag.
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(FROM_HTTP) else {
            return false;
        };
        !self.token.is_empty() && bool::from(value.as_bytes().ct_eq(self.token.as_bytes()))
    }
}

impl std::fmt::Debug for HttpOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HttpOrigin(..)")
    }
}

/// Request extension set by the auth stage on calls whose origin tag verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViaHttp;

/// Path of the OAuth authorization-server metadata document.
pub const METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// Verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub subject: String,
    /// Unix seconds; `None` for non-expiring credentials.
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Claims {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            expires_at: None,
            scopes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no credential provided")]
    MissingCredential,
    #[error("malformed credential: {0}")]
    Malformed(String),
    #[error("invalid credential: {0}")]
    Invalid(String),
    #[error("credential expired")]
    Expired,
}

impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        AdminError::Unauthenticated(err.to_string())
    }
}

/// Request data handed to the browser-facing auth endpoints.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
}

/// Fixed capability set of an authentication provider.
#[async_trait]
pub trait AuthenticationContext: Send + Sync + 'static {
    /// Alternate header some clients use instead of `authorization`.
    fn custom_authorization_header(&self) -> Option<HeaderName>;

    /// Validate the raw `authorization` value (e.g. `Bearer <token>`).
    async fn validate(&self, credential: &str) -> Result<Claims, AuthError>;

    /// Whether `method` may skip verification.
    fn is_exempt(&self, method: &str, from_http: bool) -> bool;

    /// Turn the session cookie, if present, into an `authorization` entry.
    fn cookie_to_metadata(&self, headers: &HeaderMap) -> Option<(HeaderName, HeaderValue)>;

    /// Whether `/me` is offered.
    fn serves_user_info(&self) -> bool {
        false
    }

    async fn login(&self, request: AuthRequest) -> Response;

    async fn callback(&self, request: AuthRequest) -> Response;

    async fn me(&self, request: AuthRequest) -> Response;

    /// Authorization-server metadata document.
    fn metadata(&self) -> serde_json::Value;
}

/// Shared handle to the configured authentication context.
pub type AuthHandle = Arc<dyn AuthenticationContext>;

/// Extract the token from a `Bearer <token>` value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Look up a cookie by name in the `cookie` headers.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_find_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            http::header::COOKIE,
            HeaderValue::from_static("theme=dark; flowgate_idt=tok123"),
        );
        assert_eq!(find_cookie(&headers, "flowgate_idt"), Some("tok123"));
        assert_eq!(find_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_origin_tag_verifies_only_own_value() {
        let origin = HttpOrigin::generate();
        let (name, value) = origin.tag();

        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        assert!(origin.verify(&headers));
        assert!(!HttpOrigin::generate().verify(&headers));

        let mut forged = HeaderMap::new();
        forged.insert(FROM_HTTP, HeaderValue::from_static("true"));
        assert!(!origin.verify(&forged));
        assert!(!origin.verify(&HeaderMap::new()));
    }

    #[test]
    fn test_auth_error_is_unauthenticated() {
        assert!(matches!(
            AdminError::from(AuthError::Expired),
            AdminError::Unauthenticated(_)
        ));
    }
}
