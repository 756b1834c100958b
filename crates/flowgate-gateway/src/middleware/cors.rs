//! CORS for the HTTP mux.
//!
//! Wrapper around tower-http CORS with the server's security settings.

use crate::domain::config::ServerSecurityConfig;
use axum::http::{header, HeaderName, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Create CORS layer from security config.
///
/// `*` mirrors the caller's origin instead of answering with a wildcard, so
/// credentialed requests keep working.
pub fn create_cors_layer(config: &ServerSecurityConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok()),
        )
    };

    let mut headers: Vec<HeaderName> = vec![header::CONTENT_TYPE];
    headers.extend(
        config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse::<HeaderName>().ok())
            .filter(|h| *h != header::CONTENT_TYPE),
    );

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
        ])
        .allow_headers(headers)
        .allow_credentials(true)
}
