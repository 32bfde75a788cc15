//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter
//! - Build the gateway (backup restore, sync client, router)
//! - Bind the listener and begin accepting traffic
//! - Translate OS signals into graceful shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GatewayConfig};
use crate::http::GatewayServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build management plane client: {0}")]
    Fetcher(#[from] reqwest::Error),

    #[error("invalid credential header name '{0}'")]
    AuthHeader(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("metrics exporter failed to start: {0}")]
    Metrics(#[from] BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        management = %config.management.endpoint_url,
        sync_interval_ms = config.management.sync_interval_ms,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config).await?;

    let shutdown = Shutdown::new();
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let finished = tokio::select! {
        _ = wait_for_shutdown_signal() => {
            shutdown.trigger();
            serving.await
        }
        finished = &mut serving => finished,
    };

    match finished {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Server task panicked"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
