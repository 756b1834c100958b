//! HTTP mux: health, static documents, auth endpoints and the transcoder.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::{AuthHandle, AuthRequest, METADATA_PATH};
use crate::domain::config::ServerSecurityConfig;
use crate::middleware::{create_cors_layer, RequestSpanLayer};

use super::assets::AssetSource;

pub const HEALTHCHECK_PATH: &str = "/healthcheck";
pub const OPENAPI_PATH: &str = "/api/v1/openapi";

/// Build the HTTP mux. Unmatched paths fall through to `transcoder`.
pub fn http_mux(
    config: &ServerSecurityConfig,
    auth: Option<AuthHandle>,
    assets: Arc<dyn AssetSource>,
    transcoder: Router,
) -> Router {
    let mut router = Router::new()
        .route(HEALTHCHECK_PATH, get(healthcheck))
        .merge(
            Router::new()
                .route(OPENAPI_PATH, get(openapi))
                .with_state(assets),
        );

    if let Some(auth) = auth {
        router = router.merge(auth_routes(auth));
    }

    let mut router = router
        .fallback_service(transcoder)
        .layer(RequestSpanLayer::new());

    if config.allow_cors {
        router = router.layer(create_cors_layer(config));
    }

    router
}

fn auth_routes(auth: AuthHandle) -> Router {
    let mut router = Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route(METADATA_PATH, get(metadata));
    if auth.serves_user_info() {
        router = router.route("/me", get(me));
    }
    router.with_state(auth)
}

async fn healthcheck() -> StatusCode {
    StatusCode::OK
}

async fn openapi(State(assets): State<Arc<dyn AssetSource>>) -> Response {
    match assets.openapi() {
        Some(doc) => ([(CONTENT_TYPE, "application/json")], doc).into_response(),
        None => (
            StatusCode::FAILED_DEPENDENCY,
            "openapi document is not available",
        )
            .into_response(),
    }
}

fn auth_request(headers: HeaderMap, query: HashMap<String, String>) -> AuthRequest {
    AuthRequest { headers, query }
}

async fn login(
    State(auth): State<AuthHandle>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    auth.login(auth_request(headers, query)).await
}

async fn callback(
    State(auth): State<AuthHandle>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    auth.callback(auth_request(headers, query)).await
}

async fn me(
    State(auth): State<AuthHandle>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    auth.me(auth_request(headers, query)).await
}

async fn metadata(State(auth): State<AuthHandle>) -> Json<serde_json::Value> {
    Json(auth.metadata())
}
