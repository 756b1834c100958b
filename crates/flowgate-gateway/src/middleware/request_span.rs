//! Request span for the HTTP mux.
//!
//! Every request on the HTTP side runs inside an `http_request` span carrying
//! the request id, so transcoder logs and the outbound RPC share one context.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::{body::Body, http::Request, response::Response};
use tower::{Layer, Service};
use tracing::{debug, info_span, Instrument, Span};

use super::grpc::request_id;

#[derive(Clone, Copy, Default)]
pub struct RequestSpanLayer;

impl RequestSpanLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestSpanLayer {
    type Service = RequestSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSpanService { inner }
    }
}

#[derive(Clone)]
pub struct RequestSpanService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestSpanService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!(
            "http_request",
            http.method = %req.method(),
            http.path = %req.uri().path(),
            request_id = %request_id(&req),
            http.status = tracing::field::Empty,
        );
        let started = Instant::now();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                if let Ok(response) = &result {
                    let status = response.status().as_u16();
                    Span::current().record("http.status", status);
                    debug!(
                        status,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "request completed"
                    );
                }
                result
            }
            .instrument(span),
        )
    }
}
