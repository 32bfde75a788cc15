//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Restore the config store and build the sync client
//! - Create the Axum Router with probe routes and the proxy handler
//! - Wire up middleware (request ID, tracing, concurrency limit)
//! - Serve plain HTTP or TLS on the given listener
//! - Spawn the sync loop and the admin API next to the listener
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderName,
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{CacheConfig, GatewayConfig};
use crate::health::{liveness_handler, readiness_handler, HealthMonitor};
use crate::http::proxy::{proxy_handler, ProxyState};
use crate::http::request::MakeRequestUuid;
use crate::http::tls::load_tls_config;
use crate::lifecycle::startup::StartupError;
use crate::routing::RequestRouter;
use crate::snapshot::{BackupFile, ConfigStore};
use crate::sync::{ConfigFetcher, HttpConfigFetcher, SyncClient, SyncPolicy, SyncState};

/// The gateway: request path, sync loop and admin API.
pub struct GatewayServer {
    config: GatewayConfig,
    store: Arc<ConfigStore>,
    sync: SyncClient,
    router: Router,
}

impl GatewayServer {
    /// Build the gateway against the configured management plane.
    pub async fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let fetcher = HttpConfigFetcher::new(&config.management)?;
        Self::with_fetcher(config, Arc::new(fetcher)).await
    }

    /// Build the gateway with a custom snapshot source.
    pub async fn with_fetcher(
        config: GatewayConfig,
        fetcher: Arc<dyn ConfigFetcher>,
    ) -> Result<Self, StartupError> {
        let auth_header = HeaderName::from_bytes(config.auth.header.as_bytes())
            .map_err(|_| StartupError::AuthHeader(config.auth.header.clone()))?;

        let (store, initial) = restore_store(&config.cache).await;
        let policy = SyncPolicy::from(&config.management);
        let sync = SyncClient::new(fetcher, store.clone(), policy, initial);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = ProxyState {
            router: RequestRouter::new(store.clone()),
            client,
            auth_header,
            backend_timeout: Duration::from_secs(config.timeouts.backend_secs),
        };
        let health = HealthMonitor::new(store.clone(), sync.subscribe());
        let router = Self::build_router(&config, state, health);

        Ok(Self {
            config,
            store,
            sync,
            router,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: ProxyState, health: HealthMonitor) -> Router {
        let probes = Router::new()
            .route(&config.probes.liveness_path, get(liveness_handler))
            .route(&config.probes.readiness_path, get(readiness_handler))
            .with_state(health);

        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .merge(probes)
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_concurrent_requests,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn store(&self) -> Arc<ConfigStore> {
        self.store.clone()
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.sync.subscribe()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain for the configured grace
    /// period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let GatewayServer {
            config,
            store,
            sync,
            router,
        } = self;

        let addr = listener.local_addr()?;
        let listener = listener.into_std()?;
        tracing::info!(
            address = %addr,
            tls = config.listener.tls.is_some(),
            "HTTP server starting"
        );

        let tls = match &config.listener.tls {
            Some(tls) => Some(load_tls_config(tls).await?),
            None => None,
        };

        if config.admin.enabled {
            let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
            let admin = setup_admin_router(AdminState {
                store: store.clone(),
                sync: sync.subscribe(),
                trigger: sync.trigger(),
                api_key: Arc::from(config.admin.api_key.as_str()),
            });
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %config.admin.bind_address, "Admin API starting");
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let sync_task = tokio::spawn(sync.run(shutdown.resubscribe()));
        let sync_abort = sync_task.abort_handle();
        let sync_watch = tokio::spawn(watch_sync_task(sync_task));

        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
            drain.graceful_shutdown(Some(grace));
        });

        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let served = match tls {
            Some(rustls) => {
                axum_server::tls_rustls::from_tcp_rustls(listener, rustls)
                    .handle(handle)
                    .serve(app)
                    .await
            }
            None => axum_server::from_tcp(listener).handle(handle).serve(app).await,
        };

        if served.is_err() {
            sync_abort.abort();
        }
        let _ = sync_watch.await;

        tracing::info!("HTTP server stopped");
        served
    }
}

/// Wait for the sync loop and report how it ended.
///
/// Returns false when the loop panicked: the gateway keeps serving its last
/// snapshot, but configuration is no longer refreshed.
async fn watch_sync_task(task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) if e.is_cancelled() => true,
        Err(e) => {
            tracing::error!(
                error = %e,
                "Config sync task panicked, configuration is no longer refreshed"
            );
            false
        }
    }
}

/// Restore the backup into a fresh store.
///
/// Returns the persisted sync state when the backup was usable, otherwise
/// the never-synced default.
pub async fn restore_store(cache: &CacheConfig) -> (Arc<ConfigStore>, SyncState) {
    let backup = cache.enabled.then(|| BackupFile::in_dir(&cache.directory));
    let store = Arc::new(ConfigStore::new(backup));
    let initial = store.load_from_disk().await.unwrap_or_default();
    (store, initial)
}
