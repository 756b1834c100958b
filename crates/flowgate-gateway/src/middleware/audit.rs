//! Audit stage: one entry per completed call.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{body::Body, http::Request, response::Response};
use tonic::Code;
use tower::{Layer, Service};
use tracing::info;

use flowgate_types::status::code_name;

use crate::auth::{Claims, ViaHttp};

use super::grpc::{request_id, response_code, rpc_method};

/// What the audit stage knows about a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub method: String,
    pub request_id: String,
    /// Authenticated subject, if the auth stage attached one.
    pub subject: Option<String>,
    pub from_http: bool,
    pub code: Code,
    pub duration: Duration,
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, entry: &AuditEntry);
}

/// Writes entries to the `flowgate::audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        info!(
            target: "flowgate::audit",
            method = %entry.method,
            request_id = %entry.request_id,
            subject = entry.subject.as_deref().unwrap_or("-"),
            from_http = entry.from_http,
            code = code_name(entry.code),
            duration_ms = entry.duration.as_millis() as u64,
            "rpc completed"
        );
    }
}

/// Audit layer. `None` passes every call through.
#[derive(Clone, Default)]
pub struct AuditLayer {
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditLayer {
    pub fn new(sink: Option<Arc<dyn AuditSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            sink: self.sink.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    sink: Option<Arc<dyn AuditSink>>,
}

impl<S> Service<Request<Body>> for AuditService<S>
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

        let Some(sink) = self.sink.clone() else {
            return Box::pin(inner.call(req));
        };

        let method = rpc_method(&req).to_string();
        let request_id = request_id(&req);
        let subject = req.extensions().get::<Claims>().map(|c| c.subject.clone());
        let from_http = req.extensions().get::<ViaHttp>().is_some();

        Box::pin(async move {
            let started = Instant::now();
            let result = inner.call(req).await;
            let code = match &result {
                Ok(response) => response_code(response),
                Err(_) => Code::Internal,
            };
            sink.record(&AuditEntry {
                method,
                request_id,
                subject,
                from_http,
                code,
                duration: started.elapsed(),
            });
            result
        })
    }
}
