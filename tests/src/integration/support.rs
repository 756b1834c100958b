//! Shared fixtures: a server on ephemeral ports plus clients for it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use flowgate_gateway::{
    AuditEntry, AuditSink, AuthHandle, BoundServer, ProtocolServer, RpcMetrics, ServerConfig,
    ServerError,
};
use flowgate_resources::ResourceManager;
use flowgate_server::InMemoryExecutionRegistry;
use flowgate_types::admin::admin_service_client::AdminServiceClient;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

pub const PROJECT: &str = "flytesnacks";
pub const DOMAIN: &str = "development";

/// Config with both listeners on loopback ephemeral ports.
pub fn ephemeral_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.security.grpc_host_address = "127.0.0.1:0".into();
    config.security.http_host_address = "127.0.0.1:0".into();
    config
}

/// Audit sink that keeps every entry.
#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<AuditEntry>>);

impl RecordingSink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.0.lock().clone()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, entry: &AuditEntry) {
        self.0.lock().push(entry.clone());
    }
}

/// A running server. Stops when dropped.
pub struct TestServer {
    pub http: SocketAddr,
    pub grpc: SocketAddr,
    pub metrics: Arc<RpcMetrics>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    pub async fn start(config: ServerConfig) -> Self {
        Self::start_with(config, None, None).await
    }

    pub async fn start_with(
        config: ServerConfig,
        auth: Option<AuthHandle>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut server = ProtocolServer::new(
            config,
            Arc::new(InMemoryExecutionRegistry::new()),
            ResourceManager::in_memory(),
        )
        .unwrap();
        if let Some(auth) = auth {
            server = server.with_auth(auth);
        }
        if let Some(sink) = audit {
            server = server.with_audit_sink(sink);
        }

        let bound: BoundServer = server.bind().await.unwrap();
        let (http, grpc, metrics) = (bound.http_addr(), bound.grpc_addr(), bound.metrics());

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(bound.serve(async {
            let _ = stopped.await;
        }));

        Self {
            http,
            grpc,
            metrics,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http, path)
    }

    pub async fn grpc_client(&self) -> AdminServiceClient<Channel> {
        AdminServiceClient::connect(format!("http://{}", self.grpc))
            .await
            .unwrap()
    }

    /// Stop and wait for a clean exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Self-signed certificate for `localhost`, written to a temp dir.
pub struct TestCertificate {
    pub dir: tempfile::TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_pem: String,
}

impl TestCertificate {
    pub fn localhost() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = certified.cert.pem();
        let key_pem = certified.key_pair.serialize_pem();

        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, &cert_pem).unwrap();
        std::fs::write(&key_path, key_pem).unwrap();

        Self {
            dir,
            cert_path,
            key_path,
            cert_pem,
        }
    }
}
