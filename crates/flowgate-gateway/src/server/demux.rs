//! Per-request protocol demultiplexing for the shared TLS port.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, HttpBody};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, Version};
use axum::response::Response;
use axum::{BoxError, Router};
use bytes::Bytes;
use tower::{Service, ServiceExt};

/// Which handler a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Rpc,
    Http,
}

/// HTTP/2 with an `application/grpc*` content type is RPC; everything else
/// is plain HTTP.
pub fn classify<B>(req: &Request<B>) -> Protocol {
    let grpc_content = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/grpc"))
        .unwrap_or(false);

    if req.version() == Version::HTTP_2 && grpc_content {
        Protocol::Rpc
    } else {
        Protocol::Http
    }
}

/// Routes every request on a connection to the RPC or HTTP router.
#[derive(Clone)]
pub struct HybridService {
    rpc: Router,
    http: Router,
}

impl HybridService {
    pub fn new(rpc: Router, http: Router) -> Self {
        Self { rpc, http }
    }
}

impl<B> Service<Request<B>> for HybridService
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let target = match classify(&req) {
            Protocol::Rpc => self.rpc.clone(),
            Protocol::Http => self.http.clone(),
        };
        Box::pin(target.oneshot(req.map(Body::new)))
    }
}
