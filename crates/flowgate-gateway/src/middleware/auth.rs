//! Credential verification stage.
//!
//! The `from_http` tag is checked against the process's [`HttpOrigin`] and
//! removed; only a verified tag marks the call as REST-originated. Exempt
//! methods then pass untouched. Everything else must carry an
//! `authorization` value the [`AuthenticationContext`] accepts; the resulting
//! [`Claims`] ride along in the request extensions for handlers and the audit
//! stage.
//!
//! [`AuthenticationContext`]: crate::auth::AuthenticationContext

use std::task::{Context, Poll};

use axum::{body::Body, http::Request, response::Response};
use http::header::AUTHORIZATION;
use tonic::Code;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::auth::{AuthHandle, Claims, HttpOrigin, ViaHttp, FROM_HTTP};

use super::grpc::{grpc_error_response, rpc_method};

/// Authentication layer. `None` passes every call through.
#[derive(Clone)]
pub struct AuthLayer {
    auth: Option<AuthHandle>,
    origin: HttpOrigin,
}

impl AuthLayer {
    pub fn new(auth: Option<AuthHandle>, origin: HttpOrigin) -> Self {
        Self { auth, origin }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            auth: self.auth.clone(),
            origin: self.origin.clone(),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    auth: Option<AuthHandle>,
    origin: HttpOrigin,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let Some(auth) = self.auth.clone() else {
            return Box::pin(inner.call(req));
        };

        let from_http = self.origin.verify(req.headers());
        req.headers_mut().remove(FROM_HTTP);
        if from_http {
            req.extensions_mut().insert(ViaHttp);
        }

        Box::pin(async move {
            let method = rpc_method(&req).to_string();

            if auth.is_exempt(&method, from_http) {
                debug!(method = %method, from_http, "authentication skipped");
                return inner.call(req).await;
            }

            let credential = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let Some(credential) = credential else {
                warn!(method = %method, "rpc rejected: no credential");
                return Ok(grpc_error_response(
                    Code::Unauthenticated,
                    "authorization metadata is required",
                ));
            };

            match auth.validate(&credential).await {
                Ok(claims) => {
                    debug!(method = %method, subject = %claims.subject, "rpc authenticated");
                    req.extensions_mut().insert::<Claims>(claims);
                    inner.call(req).await
                }
                Err(e) => {
                    warn!(method = %method, error = %e, "rpc rejected: invalid credential");
                    Ok(grpc_error_response(Code::Unauthenticated, &e.to_string()))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthRequest, AuthenticationContext};
    use crate::middleware::grpc::response_code;
    use async_trait::async_trait;
    use axum::response::IntoResponse;
    use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::{service_fn, ServiceExt};

    struct FixedToken;

    #[async_trait]
    impl AuthenticationContext for FixedToken {
        fn custom_authorization_header(&self) -> Option<HeaderName> {
            None
        }

        async fn validate(&self, credential: &str) -> Result<Claims, AuthError> {
            if credential == "Bearer good" {
                Ok(Claims {
                    subject: "alice".into(),
                    expires_at: None,
                    scopes: vec![],
                })
            } else {
                Err(AuthError::Invalid("bad token".into()))
            }
        }

        fn is_exempt(&self, method: &str, from_http: bool) -> bool {
            method == "GetExecution" || (from_http && method == "ListExecutions")
        }

        fn cookie_to_metadata(&self, _headers: &HeaderMap) -> Option<(HeaderName, HeaderValue)> {
            None
        }

        async fn login(&self, _request: AuthRequest) -> Response {
            StatusCode::NOT_FOUND.into_response()
        }

        async fn callback(&self, _request: AuthRequest) -> Response {
            StatusCode::NOT_FOUND.into_response()
        }

        async fn me(&self, _request: AuthRequest) -> Response {
            StatusCode::NOT_FOUND.into_response()
        }

        fn metadata(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    fn request(method: &str, credential: Option<&str>) -> Request<Body> {
        let mut builder =
            Request::builder().uri(format!("/flowgate.admin.v1.AdminService/{method}"));
        if let Some(credential) = credential {
            builder = builder.header(AUTHORIZATION, credential);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn run(method: &str, credential: Option<&str>) -> (Code, usize, Option<String>) {
        run_request(HttpOrigin::generate(), request(method, credential)).await
    }

    async fn run_request(origin: HttpOrigin, req: Request<Body>) -> (Code, usize, Option<String>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let (h, s) = (Arc::clone(&hits), Arc::clone(&seen));
        let inner = service_fn(move |req: Request<Body>| {
            h.fetch_add(1, Ordering::SeqCst);
            *s.lock() = req.extensions().get::<Claims>().map(|c| c.subject.clone());
            async { Ok::<_, Infallible>(Response::new(Body::empty())) }
        });

        let svc = AuthLayer::new(Some(Arc::new(FixedToken)), origin).layer(inner);
        let response = svc.oneshot(req).await.unwrap();
        let subject = seen.lock().clone();
        (response_code(&response), hits.load(Ordering::SeqCst), subject)
    }

    #[tokio::test]
    async fn test_missing_credential_never_reaches_handler() {
        let (code, hits, _) = run("CreateExecution", None).await;
        assert_eq!(code, Code::Unauthenticated);
        assert_eq!(hits, 0);
    }

    #[tokio::test]
    async fn test_invalid_credential_rejected() {
        let (code, hits, _) = run("CreateExecution", Some("Bearer bad")).await;
        assert_eq!(code, Code::Unauthenticated);
        assert_eq!(hits, 0);
    }

    #[tokio::test]
    async fn test_valid_credential_attaches_claims() {
        let (code, hits, subject) = run("CreateExecution", Some("Bearer good")).await;
        assert_eq!(code, Code::Ok);
        assert_eq!(hits, 1);
        assert_eq!(subject.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_exempt_method_skips_verification() {
        let (code, hits, subject) = run("GetExecution", None).await;
        assert_eq!(code, Code::Ok);
        assert_eq!(hits, 1);
        assert!(subject.is_none());
    }

    #[tokio::test]
    async fn test_disabled_layer_passes_through() {
        let svc = AuthLayer::new(None, HttpOrigin::generate()).layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        }));
        let response = svc.oneshot(request("CreateExecution", None)).await.unwrap();
        assert_eq!(response_code(&response), Code::Ok);
    }

    #[tokio::test]
    async fn test_verified_origin_uses_http_exemption() {
        let origin = HttpOrigin::generate();
        let mut req = request("ListExecutions", None);
        let (name, value) = origin.tag();
        req.headers_mut().insert(name, value);

        let (code, hits, _) = run_request(origin, req).await;
        assert_eq!(code, Code::Ok);
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn test_forged_origin_still_requires_credential() {
        let mut req = request("ListExecutions", None);
        req.headers_mut()
            .insert(FROM_HTTP, HeaderValue::from_static("true"));

        let (code, hits, _) = run_request(HttpOrigin::generate(), req).await;
        assert_eq!(code, Code::Unauthenticated);
        assert_eq!(hits, 0);
    }

    #[tokio::test]
    async fn test_origin_tag_is_stripped_before_handler() {
        let origin = HttpOrigin::generate();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let s = Arc::clone(&seen);
        let inner = service_fn(move |req: Request<Body>| {
            *s.lock() = Some((
                req.headers().contains_key(FROM_HTTP),
                req.extensions().get::<ViaHttp>().is_some(),
            ));
            async { Ok::<_, Infallible>(Response::new(Body::empty())) }
        });

        let mut req = request("CreateExecution", Some("Bearer good"));
        let (name, value) = origin.tag();
        req.headers_mut().insert(name, value);
        AuthLayer::new(Some(Arc::new(FixedToken)), origin)
            .layer(inner)
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(*seen.lock(), Some((false, true)));
    }
}
