//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::snapshot::ConfigStore;
use edge_gateway::sync::{SyncMode, SyncState};
use edge_gateway::{GatewayConfig, GatewayServer};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const MANAGEMENT_TOKEN: &str = "test-sync-token";

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start a mock backend that answers `<name> <path and query>`.
///
/// The response also reports the request ID and a few forwarded headers
/// the backend received.
pub async fn start_mock_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| async move {
        let seen = |h: &str| {
            headers
                .get(h)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        (
            [
                ("x-backend", name.to_string()),
                ("x-seen-request-id", seen("x-request-id")),
                ("x-seen-forwarded-for", seen("x-forwarded-for")),
                ("x-seen-gateway", seen("x-gateway")),
                ("x-seen-api-key", seen("x-api-key")),
                ("x-seen-authorization", seen("authorization")),
                ("server", "mock-backend".to_string()),
            ],
            format!("{} {}", name, uri),
        )
    });
    serve(app).await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), body)
        }
    });
    serve(app).await
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Management plane document.
pub fn document(version: u64, routes: Value) -> Value {
    json!({
        "version": version,
        "routes": routes,
        "credentials": ["client-key-1"],
    })
}

/// Single `/hello` route to `backend`.
pub fn hello_route(backend: SocketAddr) -> Value {
    json!([{ "path_prefix": "/hello", "backend_target": format!("http://{}", backend) }])
}

struct PlaneState {
    up: AtomicBool,
    document: Mutex<Value>,
    requests: AtomicUsize,
}

/// Management plane whose availability and document tests can flip.
#[derive(Clone)]
pub struct MockManagementPlane {
    state: Arc<PlaneState>,
    pub endpoint: String,
}

impl MockManagementPlane {
    pub async fn start(document: Value) -> Self {
        let state = Arc::new(PlaneState {
            up: AtomicBool::new(true),
            document: Mutex::new(document),
            requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/v1/gateway-config", get(serve_document))
            .with_state(state.clone());
        let addr = serve(app).await;

        Self {
            state,
            endpoint: format!("http://{}/v1/gateway-config", addr),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.state.up.store(up, Ordering::SeqCst);
    }

    pub fn set_document(&self, document: Value) {
        *self.state.document.lock().unwrap() = document;
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

async fn serve_document(State(state): State<Arc<PlaneState>>, headers: HeaderMap) -> impl IntoResponse {
    state.requests.fetch_add(1, Ordering::SeqCst);

    if !state.up.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, String::new());
    }
    let expected = format!("Bearer {}", MANAGEMENT_TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }

    let document = state.document.lock().unwrap().clone();
    (StatusCode::OK, document.to_string())
}

/// Gateway config with fast sync timings, pointing at `endpoint`.
pub fn gateway_config(endpoint: &str, cache_dir: &Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    config.management.endpoint_url = endpoint.to_string();
    config.management.token = MANAGEMENT_TOKEN.into();
    config.management.sync_interval_ms = 100;
    config.management.retry_interval_ms = 20;
    config.management.max_retry_count = 2;
    config.management.max_backoff_ms = 50;
    config.management.fetch_timeout_ms = Some(500);

    config.cache.enabled = true;
    config.cache.directory = cache_dir.to_path_buf();

    config.timeouts.backend_secs = 1;
    config.timeouts.shutdown_grace_secs = 1;
    config.observability.metrics_enabled = false;
    config
}

/// A gateway serving on a random local port.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub store: Arc<ConfigStore>,
    pub sync: watch::Receiver<SyncState>,
    shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningGateway {
    pub async fn start(config: GatewayConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = GatewayServer::new(config).await.unwrap();
        let store = server.store();
        let sync = server.sync_state();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        Self {
            addr,
            store,
            sync,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until the active snapshot reaches `version`.
    pub async fn wait_for_version(&self, version: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.store.active_version() < version {
            assert!(
                tokio::time::Instant::now() < deadline,
                "snapshot version {} never activated (active: {})",
                version,
                self.store.active_version()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until the sync client reports `mode`.
    pub async fn wait_for_mode(&mut self, mode: SyncMode) {
        let reached = tokio::time::timeout(
            Duration::from_secs(5),
            self.sync.wait_for(|state| state.mode == mode),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
        assert!(
            reached,
            "sync mode {} never reached (current: {})",
            mode,
            self.sync.borrow().mode
        );
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("gateway did not stop in time");
        result.unwrap().unwrap();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
