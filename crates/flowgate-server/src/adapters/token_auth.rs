//! Shared-secret bearer-token authentication.
//!
//! Tokens look like `<subject>.<expires_at>.<hex hmac>` where the MAC is
//! HMAC-SHA256 over `<subject>.<expires_at>` keyed with the shared secret.
//! An external identity provider that knows the secret mints them; the
//! browser receives one on `/callback` and keeps it in a cookie.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use flowgate_gateway::auth::{bearer_token, find_cookie, AuthRequest};
use flowgate_gateway::{AuthConfig, AuthError, AuthenticationContext, Claims};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub struct TokenAuthContext {
    secret: Vec<u8>,
    config: AuthConfig,
    custom_header: Option<HeaderName>,
}

impl TokenAuthContext {
    pub fn new(secret: impl Into<Vec<u8>>, config: AuthConfig) -> Self {
        let custom_header = config
            .custom_authorization_header
            .as_deref()
            .and_then(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    warn!(header = name, "ignoring invalid custom authorization header");
                    None
                }
            });

        Self {
            secret: secret.into(),
            config,
            custom_header,
        }
    }

    /// Mint a token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> String {
        let expires_at = Utc::now().timestamp().max(0) as u64 + ttl.as_secs();
        let payload = format!("{subject}.{expires_at}");
        let signature = hex::encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        // HMAC accepts keys of any length.
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let malformed = || AuthError::Malformed("expected <subject>.<expiry>.<signature>".into());

        let (payload, signature) = token.rsplit_once('.').ok_or_else(malformed)?;
        let (subject, expires_at) = payload.rsplit_once('.').ok_or_else(malformed)?;
        if subject.is_empty() {
            return Err(malformed());
        }
        let expires_at: u64 = expires_at.parse().map_err(|_| malformed())?;
        let provided = hex::decode(signature).map_err(|_| malformed())?;

        let expected = self.sign(payload);
        if expected.is_empty() || !bool::from(expected.ct_eq(&provided)) {
            return Err(AuthError::Invalid("signature mismatch".into()));
        }
        if expires_at <= Utc::now().timestamp().max(0) as u64 {
            return Err(AuthError::Expired);
        }

        Ok(Claims {
            subject: subject.to_string(),
            expires_at: Some(expires_at),
            scopes: vec!["all".to_string()],
        })
    }

    fn session_cookie(&self, token: &str) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name,
            token,
            self.config.session_ttl.as_secs()
        ))
        .ok()
    }

    fn established_response(&self, token: &str) -> Response {
        let mut response = redirect(&self.config.redirect_url);
        if let Some(cookie) = self.session_cookie(token) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        response
    }

    /// A browser that still holds a valid session gets a fresh token and
    /// goes straight back instead of through the identity provider.
    fn refresh_session(&self, headers: &HeaderMap) -> Option<Response> {
        let token = find_cookie(headers, &self.config.cookie_name)?;
        let claims = self.verify(token).ok()?;
        debug!(subject = %claims.subject, "session refreshed");
        let fresh = self.issue(&claims.subject, self.config.session_ttl);
        Some(self.established_response(&fresh))
    }

    fn request_claims(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            let token = bearer_token(value).ok_or(AuthError::MissingCredential)?;
            return self.verify(token);
        }
        let token = find_cookie(headers, &self.config.cookie_name).ok_or(AuthError::MissingCredential)?;
        self.verify(token)
    }
}

#[async_trait]
impl AuthenticationContext for TokenAuthContext {
    fn custom_authorization_header(&self) -> Option<HeaderName> {
        self.custom_header.clone()
    }

    async fn validate(&self, credential: &str) -> Result<Claims, AuthError> {
        let token = bearer_token(credential).ok_or(AuthError::MissingCredential)?;
        self.verify(token)
    }

    fn is_exempt(&self, _method: &str, from_http: bool) -> bool {
        if from_http {
            self.config.disable_for_http
        } else {
            self.config.disable_for_grpc
        }
    }

    fn cookie_to_metadata(&self, headers: &HeaderMap) -> Option<(HeaderName, HeaderValue)> {
        let token = find_cookie(headers, &self.config.cookie_name)?;
        let value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
        Some((AUTHORIZATION, value))
    }

    fn serves_user_info(&self) -> bool {
        self.config.user_info_url.is_some()
    }

    async fn login(&self, request: AuthRequest) -> Response {
        if let Some(response) = self.refresh_session(&request.headers) {
            return response;
        }
        let target = format!(
            "{}/authorize",
            self.config.authorization_server_url.trim_end_matches('/')
        );
        redirect(&target)
    }

    async fn callback(&self, request: AuthRequest) -> Response {
        let Some(token) = request.query.get("token") else {
            return (StatusCode::BAD_REQUEST, "missing token").into_response();
        };

        match self.verify(token) {
            Ok(claims) => {
                debug!(subject = %claims.subject, "session established");
                self.established_response(token)
            }
            Err(e) => (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
        }
    }

    async fn me(&self, request: AuthRequest) -> Response {
        match self.request_claims(&request.headers) {
            Ok(claims) => Json(claims).into_response(),
            Err(e) => (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
        }
    }

    fn metadata(&self) -> serde_json::Value {
        let issuer = self.config.authorization_server_url.trim_end_matches('/');
        serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "response_types_supported": ["token"],
            "token_endpoint_auth_methods_supported": ["client_secret_post"],
        })
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect target").into_response(),
    }
}
