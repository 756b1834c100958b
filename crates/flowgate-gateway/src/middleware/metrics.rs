//! Per-method RPC counters and latency histograms.
//!
//! Each pipeline owns its own [`prometheus::Registry`] so several servers can
//! live in one process (tests do this) without colliding on metric names.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{body::Body, http::Request, response::Response};
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tonic::Code;
use tower::{Layer, Service};

use flowgate_types::status::code_name;

use super::grpc::{response_code, rpc_method};

/// RPC metric families
pub struct RpcMetrics {
    registry: Registry,
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl RpcMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(
                "flowgate_rpc_requests_total",
                "Completed RPC calls by method and status code",
            ),
            &["method", "code"],
        )?;

        // 1ms to ~16s
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "flowgate_rpc_request_duration_seconds",
                "RPC handling latency in seconds",
            )
            .buckets(exponential_buckets(0.001, 2.0, 15)?),
            &["method"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            duration,
        })
    }

    pub fn record(&self, method: &str, code: Code, elapsed: Duration) {
        self.requests
            .with_label_values(&[method, code_name(code)])
            .inc();
        self.duration
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    /// Count of completed calls to `method` that ended with `code`.
    pub fn request_count(&self, method: &str, code: Code) -> u64 {
        self.requests
            .with_label_values(&[method, code_name(code)])
            .get()
    }

    /// Prometheus text exposition of every family in this registry.
    pub fn encode_text(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode rpc metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn start(self: &Arc<Self>, method: String) -> RequestTimer {
        RequestTimer {
            metrics: Arc::clone(self),
            method,
            started: Instant::now(),
            finished: false,
        }
    }
}

/// Measures one call. Dropped unfinished, the call counts as cancelled.
struct RequestTimer {
    metrics: Arc<RpcMetrics>,
    method: String,
    started: Instant,
    finished: bool,
}

impl RequestTimer {
    fn finish(mut self, code: Code) {
        self.finished = true;
        self.metrics
            .record(&self.method, code, self.started.elapsed());
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.metrics
                .record(&self.method, Code::Cancelled, self.started.elapsed());
        }
    }
}

/// Outermost pipeline stage: times every call, including rejected ones.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<RpcMetrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<RpcMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<RpcMetrics>,
}

impl<S> Service<Request<Body>> for MetricsService<S>
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
        // Drive the instance that was polled ready; leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let timer = self.metrics.start(rpc_method(&req).to_string());

        Box::pin(async move {
            let result = inner.call(req).await;
            match &result {
                Ok(response) => timer.finish(response_code(response)),
                Err(_) => timer.finish(Code::Internal),
            }
            result
        })
    }
}
