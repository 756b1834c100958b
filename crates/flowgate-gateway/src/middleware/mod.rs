//! Interceptor pipeline applied to every RPC.
//!
//! Layer order (outermost first):
//! Request → Metrics → Metadata → Auth → Audit → Recovery → Handler
//!
//! With authentication disabled the metadata, auth and audit stages are
//! built as pass-throughs, so the effective chain is metrics timing plus
//! panic recovery. The HTTP mux has its own, separate stack (CORS and
//! request tracing) in front of the transcoder.

pub mod audit;
pub mod auth;
pub mod cors;
pub mod grpc;
pub mod metadata;
pub mod metrics;
pub mod recovery;
pub mod request_span;

pub use audit::{AuditEntry, AuditLayer, AuditSink, TracingAuditSink};
pub use auth::AuthLayer;
pub use cors::create_cors_layer;
pub use metadata::MetadataLayer;
pub use metrics::{MetricsLayer, RpcMetrics};
pub use recovery::RecoveryLayer;
pub use request_span::RequestSpanLayer;

use std::sync::Arc;

use tower::Layer;

use crate::auth::{AuthHandle, HttpOrigin};
use crate::domain::config::{ConfigError, ServerConfig};
use crate::domain::error::ServerError;

/// Fully assembled service type produced by [`InterceptorPipeline::layer`].
pub type PipelineService<S> = metrics::MetricsService<
    metadata::MetadataService<auth::AuthService<audit::AuditService<recovery::RecoveryService<S>>>>,
>;

/// Ordered interceptor chain, built once from config.
#[derive(Clone)]
pub struct InterceptorPipeline {
    metrics: Arc<RpcMetrics>,
    auth: Option<AuthHandle>,
    audit: Arc<dyn AuditSink>,
    origin: HttpOrigin,
}

impl InterceptorPipeline {
    /// Build the pipeline. `auth` is consulted only when `use_auth` is set,
    /// and must be present in that case.
    pub fn from_config(
        config: &ServerConfig,
        auth: Option<AuthHandle>,
    ) -> Result<Self, ServerError> {
        let auth = if config.security.use_auth {
            Some(auth.ok_or_else(|| {
                ConfigError::Invalid("use_auth is set but no authentication context was given".into())
            })?)
        } else {
            None
        };

        Ok(Self {
            metrics: Arc::new(RpcMetrics::new()?),
            auth,
            audit: Arc::new(TracingAuditSink),
            origin: HttpOrigin::generate(),
        })
    }

    /// Replace the default tracing audit sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Names of the active interceptors, outermost first.
    pub fn stages(&self) -> &'static [&'static str] {
        if self.auth.is_some() {
            &["metrics", "metadata", "auth", "audit"]
        } else {
            &["metrics"]
        }
    }

    pub fn metrics(&self) -> Arc<RpcMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn auth(&self) -> Option<&AuthHandle> {
        self.auth.as_ref()
    }

    /// Tag the REST gateway must attach for calls to count as HTTP-originated.
    pub fn http_origin(&self) -> &HttpOrigin {
        &self.origin
    }

    /// Wrap `service` in the full chain.
    pub fn layer<S>(&self, service: S) -> PipelineService<S> {
        let custom_header = self
            .auth
            .as_ref()
            .and_then(|auth| auth.custom_authorization_header());
        let audit = self.auth.as_ref().map(|_| Arc::clone(&self.audit));

        let service = RecoveryLayer.layer(service);
        let service = AuditLayer::new(audit).layer(service);
        let service = AuthLayer::new(self.auth.clone(), self.origin.clone()).layer(service);
        let service = MetadataLayer::new(custom_header).layer(service);
        MetricsLayer::new(Arc::clone(&self.metrics)).layer(service)
    }
}
