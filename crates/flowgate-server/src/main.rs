//! # Flowgate admin server
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `FLOWGATE_*` environment variables
//! 2. Install logging and the TLS crypto provider
//! 3. Bind the listeners (fatal on failure)
//! 4. Serve until Ctrl+C or a fatal listener error

use anyhow::{Context, Result};
use tracing::{error, info};

use flowgate_server::{build_server, init_logging, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    init_logging(config.log_json)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize logging")?;

    // Both tonic and tokio-rustls resolve the process-wide provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(
        version = flowgate_gateway::VERSION,
        secure = config.server.security.secure,
        use_auth = config.server.security.use_auth,
        "starting flowgate admin server"
    );

    let bound = build_server(&config)?.bind().await?;
    info!(http = %bound.http_addr(), grpc = %bound.grpc_addr(), "listeners ready");

    if let Err(e) = bound.serve(shutdown_signal()).await {
        error!(error = %e, "server terminated");
        return Err(e.into());
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
