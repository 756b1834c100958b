//! Protocol server - main entry point of the gateway.
//!
//! Insecure mode runs two listeners: native gRPC on `grpc_host_address` and
//! the HTTP mux on `http_host_address`. Secure mode runs a single TLS
//! listener on `http_host_address` and demultiplexes every request between
//! the two routers.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use flowgate_resources::ResourceManager;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{debug, error, info, warn};

use crate::auth::AuthHandle;
use crate::domain::config::{dialable, ConfigError, ListenAddr, ServerConfig};
use crate::domain::error::ServerError;
use crate::middleware::{AuditSink, InterceptorPipeline, RpcMetrics};
use crate::ports::outbound::ExecutionManager;
use crate::rest::TranscodingGateway;
use crate::rpc::{reflection_router, AdminRpc};
use crate::server::{http_mux, AssetSource, BundledAssets, HybridService, TlsMaterial};

/// Gateway server, configured but not yet listening.
pub struct ProtocolServer {
    config: ServerConfig,
    executions: Arc<dyn ExecutionManager>,
    resources: ResourceManager,
    auth: Option<AuthHandle>,
    assets: Arc<dyn AssetSource>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl ProtocolServer {
    /// Create a new server. The configuration is validated here.
    pub fn new(
        config: ServerConfig,
        executions: Arc<dyn ExecutionManager>,
        resources: ResourceManager,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        Ok(Self {
            config,
            executions,
            resources,
            auth: None,
            assets: Arc::new(BundledAssets),
            audit: None,
        })
    }

    /// Authentication context used when `security.use_auth` is set.
    pub fn with_auth(mut self, auth: AuthHandle) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetSource>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Bind and serve until `shutdown` resolves or a listener fails.
    pub async fn start<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.bind().await?.serve(shutdown).await
    }

    /// Open the listeners and assemble both routers.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let mut pipeline = InterceptorPipeline::from_config(&self.config, self.auth)?;
        if let Some(sink) = self.audit {
            pipeline = pipeline.with_audit_sink(sink);
        }
        info!(stages = ?pipeline.stages(), "interceptor pipeline ready");

        let mut rpc = AdminRpc::new(self.executions, self.resources).into_router(&pipeline);
        if self.config.grpc_server_reflection {
            rpc = rpc.merge(reflection_router()?);
            info!("gRPC server reflection enabled");
        }
        let rpc = with_request_id(rpc);
        let auth = pipeline.auth().cloned();
        let origin = pipeline.http_origin().clone();
        let security = &self.config.security;

        let mode = if security.secure {
            let certificate_file = security
                .certificate_file
                .as_deref()
                .ok_or(ConfigError::MissingTlsFile("certificate_file"))?;
            let key_file = security
                .key_file
                .as_deref()
                .ok_or(ConfigError::MissingTlsFile("key_file"))?;
            let tls = TlsMaterial::load(certificate_file, key_file)?;

            let listener = bind(&security.http_addr()?).await?;
            let addr = local_addr(&listener)?;
            let channel = secure_channel(&self.config, addr, &tls)?;

            let http = with_request_id(http_mux(
                security,
                auth.clone(),
                Arc::clone(&self.assets),
                TranscodingGateway::register(channel, auth, origin),
            ));

            info!(addr = %addr, "serving gRPC and HTTP on one TLS listener");
            Mode::Secure {
                listener,
                acceptor: tls.acceptor(),
                hybrid: HybridService::new(rpc, http),
            }
        } else {
            let grpc_listener = bind(&security.grpc_addr()?).await?;
            let http_listener = bind(&security.http_addr()?).await?;
            let grpc_addr = local_addr(&grpc_listener)?;
            let channel = insecure_channel(&self.config, grpc_addr)?;

            let http = with_request_id(http_mux(
                security,
                auth.clone(),
                Arc::clone(&self.assets),
                TranscodingGateway::register(channel, auth, origin),
            ));

            info!(
                grpc = %grpc_addr,
                http = %local_addr(&http_listener)?,
                "serving gRPC and HTTP on separate listeners"
            );
            Mode::Insecure {
                grpc_listener,
                http_listener,
                rpc,
                http,
            }
        };

        Ok(BoundServer {
            mode,
            metrics: pipeline.metrics(),
        })
    }
}

enum Mode {
    Insecure {
        grpc_listener: TcpListener,
        http_listener: TcpListener,
        rpc: Router,
        http: Router,
    },
    Secure {
        listener: TcpListener,
        acceptor: TlsAcceptor,
        hybrid: HybridService,
    },
}

/// Gateway server with its listeners open.
pub struct BoundServer {
    mode: Mode,
    metrics: Arc<RpcMetrics>,
}

impl BoundServer {
    /// Address of the HTTP listener (the only listener in secure mode).
    pub fn http_addr(&self) -> SocketAddr {
        match &self.mode {
            Mode::Insecure { http_listener, .. } => addr_or_unspecified(http_listener),
            Mode::Secure { listener, .. } => addr_or_unspecified(listener),
        }
    }

    /// Address native gRPC clients dial.
    pub fn grpc_addr(&self) -> SocketAddr {
        match &self.mode {
            Mode::Insecure { grpc_listener, .. } => addr_or_unspecified(grpc_listener),
            Mode::Secure { listener, .. } => addr_or_unspecified(listener),
        }
    }

    pub fn metrics(&self) -> Arc<RpcMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve until `shutdown` resolves. A gRPC server that stops on its own
    /// is an error.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.mode {
            Mode::Insecure {
                grpc_listener,
                http_listener,
                rpc,
                http,
            } => serve_insecure(grpc_listener, http_listener, rpc, http, shutdown).await,
            Mode::Secure {
                listener,
                acceptor,
                hybrid,
            } => serve_secure(listener, acceptor, hybrid, shutdown).await,
        }
    }
}

async fn serve_insecure<F>(
    grpc_listener: TcpListener,
    http_listener: TcpListener,
    rpc: Router,
    http: Router,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        let _ = shutdown_tx.send(true);
    });

    let rpc_shutdown = shutdown_rx.clone();
    let mut rpc_task = tokio::spawn(async move {
        axum::serve(grpc_listener, rpc)
            .with_graceful_shutdown(wait_for_shutdown(rpc_shutdown))
            .await
    });

    let http_server = axum::serve(http_listener, http)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    tokio::pin!(http_server);

    tokio::select! {
        result = &mut http_server => {
            result.map_err(ServerError::Serve)?;
            rpc_exit(rpc_task.await)?;
        }
        joined = &mut rpc_task => {
            if !*shutdown_rx.borrow() {
                let err = match rpc_exit(joined) {
                    Ok(()) => ServerError::RpcServerExited("stopped without shutdown".into()),
                    Err(e) => e,
                };
                error!(error = %err, "gRPC server failed");
                return Err(err);
            }
            http_server.await.map_err(ServerError::Serve)?;
        }
    }

    info!("gateway stopped");
    Ok(())
}

fn rpc_exit(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::RpcServerExited(e.to_string())),
        Err(e) => Err(ServerError::RpcServerExited(e.to_string())),
    }
}

/// Pause after a failed accept (e.g. EMFILE) before polling the listener again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn serve_secure<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    hybrid: HybridService,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::pin!(shutdown);

    loop {
        let Some((stream, peer)) = accept_with_backoff(|| listener.accept(), &mut shutdown).await
        else {
            break;
        };

        let acceptor = acceptor.clone();
        let hybrid = hybrid.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service = TowerToHyperService::new(hybrid);
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(tls), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }

    info!("gateway stopped");
    Ok(())
}

/// Next accepted connection, or `None` once `shutdown` fires. Failed
/// accepts are retried after [`ACCEPT_BACKOFF`].
async fn accept_with_backoff<T, A, Fut, S>(mut accept: A, shutdown: &mut Pin<&mut S>) -> Option<T>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
    S: Future<Output = ()>,
{
    loop {
        let accepted = tokio::select! {
            _ = shutdown.as_mut() => return None,
            accepted = accept() => accepted,
        };
        match accepted {
            Ok(conn) => return Some(conn),
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::select! {
                    _ = shutdown.as_mut() => return None,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Sender gone without a signal: keep serving.
        futures::future::pending::<()>().await;
    }
}

fn with_request_id(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn bind(listen: &ListenAddr) -> Result<TcpListener, ServerError> {
    let addr = listen.resolve().await.map_err(|source| ServerError::Resolve {
        addr: listen.to_string(),
        source,
    })?;
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr, ServerError> {
    listener.local_addr().map_err(ServerError::Serve)
}

fn addr_or_unspecified(listener: &TcpListener) -> SocketAddr {
    listener
        .local_addr()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)))
}

fn insecure_channel(config: &ServerConfig, grpc_addr: SocketAddr) -> Result<Channel, ServerError> {
    let endpoint = Endpoint::from_shared(format!("http://{}", dialable(grpc_addr)))
        .map_err(|e| ServerError::Client(e.to_string()))?
        .connect_timeout(config.dial_timeout);
    Ok(endpoint.connect_lazy())
}

fn secure_channel(
    config: &ServerConfig,
    addr: SocketAddr,
    tls: &TlsMaterial,
) -> Result<Channel, ServerError> {
    let tls_config = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(tls.ca_pem()))
        .domain_name(config.tls_server_name.clone());

    let endpoint = Endpoint::from_shared(format!("https://{}", dialable(addr)))
        .map_err(|e| ServerError::Client(e.to_string()))?
        .connect_timeout(config.dial_timeout)
        .tls_config(tls_config)
        .map_err(|e| ServerError::Client(e.to_string()))?;
    Ok(endpoint.connect_lazy())
}
