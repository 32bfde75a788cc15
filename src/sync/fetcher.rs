//! Management plane fetch protocol.
//!
//! # Protocol
//! ```text
//! GET <endpoint_url>
//! Authorization: Bearer <token>
//! Accept: application/json
//!
//! 200 OK
//! { "version": 12, "routes": [ RouteRule, ... ], "credentials": [ "key", ... ] }
//! ```
//!
//! # Design Decisions
//! - Timeouts, transport errors, non-2xx statuses and bad documents are all
//!   "one failed fetch"; `FetchError` keeps the cause for logs and metrics only
//! - `ConfigFetcher` is the seam the sync client is tested through

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::ManagementConfig;
use crate::snapshot::types::{
    unix_millis, ConfigurationSnapshot, RouteRule, SnapshotError, SnapshotSource, SnapshotVersion,
};

/// Configuration document served by the management plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementDocument {
    pub version: SnapshotVersion,
    pub routes: Vec<RouteRule>,
    #[serde(default)]
    pub credentials: Vec<String>,
}

impl ManagementDocument {
    /// Validate the document and stamp it as a remote snapshot.
    pub fn into_snapshot(self, fetched_at: u64) -> Result<ConfigurationSnapshot, SnapshotError> {
        let snapshot = ConfigurationSnapshot {
            version: self.version,
            routes: self.routes,
            credentials: self.credentials,
            fetched_at,
            source: SnapshotSource::Remote,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Why a fetch attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("management plane timed out after {0:?}")]
    Timeout(Duration),

    #[error("management plane unreachable: {0}")]
    Network(String),

    #[error("management plane returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed configuration document: {0}")]
    Malformed(String),

    #[error("configuration document rejected: {0}")]
    Invalid(#[from] SnapshotError),
}

impl FetchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Network(_) => "network",
            FetchError::Status(_) => "status",
            FetchError::Malformed(_) => "malformed",
            FetchError::Invalid(_) => "invalid",
        }
    }
}

/// Source of configuration snapshots.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch(&self) -> Result<ConfigurationSnapshot, FetchError>;
}

/// Fetches snapshots over HTTP(S) with a bearer token.
pub struct HttpConfigFetcher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl HttpConfigFetcher {
    pub fn new(config: &ManagementConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.fetch_timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url.clone(),
            token: config.token.clone(),
            timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch(&self) -> Result<ConfigurationSnapshot, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("edge-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let document: ManagementDocument =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        Ok(document.into_snapshot(unix_millis())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/config", addr)
    }

    fn management_config(endpoint: String) -> ManagementConfig {
        ManagementConfig {
            endpoint_url: endpoint,
            token: "sync-token".into(),
            fetch_timeout_ms: Some(500),
            ..ManagementConfig::default()
        }
    }

    #[test]
    fn test_document_into_snapshot() {
        let document: ManagementDocument = serde_json::from_str(
            r#"{
                "version": 3,
                "routes": [
                    {"path_prefix": "/hello", "backend_target": "http://backend-a:8080", "requires_auth": true}
                ],
                "credentials": ["k1"]
            }"#,
        )
        .unwrap();

        let snapshot = document.into_snapshot(42).unwrap();
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.fetched_at, 42);
        assert_eq!(snapshot.source, SnapshotSource::Remote);
        assert_eq!(snapshot.credentials, vec!["k1".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let app = Router::new().route(
            "/config",
            get(|headers: HeaderMap| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
                if auth == Some("Bearer sync-token") {
                    (
                        StatusCode::OK,
                        r#"{"version": 5, "routes": [{"path_prefix": "/", "backend_target": "http://127.0.0.1:1"}]}"#,
                    )
                } else {
                    (StatusCode::UNAUTHORIZED, "")
                }
            }),
        );
        let fetcher = HttpConfigFetcher::new(&management_config(serve(app).await)).unwrap();

        let snapshot = fetcher.fetch().await.unwrap();
        assert_eq!(snapshot.version, 5);
        assert_eq!(snapshot.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let app = Router::new().route("/config", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let fetcher = HttpConfigFetcher::new(&management_config(serve(app).await)).unwrap();

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.kind(), "status");
    }

    #[tokio::test]
    async fn test_malformed_and_invalid_documents() {
        let app = Router::new()
            .route("/config", get(|| async { "not json" }))
            .route(
                "/dup",
                get(|| async {
                    r#"{"version": 2, "routes": [
                        {"path_prefix": "/a", "backend_target": "http://x"},
                        {"path_prefix": "/a", "backend_target": "http://y"}
                    ]}"#
                }),
            );
        let endpoint = serve(app).await;

        let fetcher = HttpConfigFetcher::new(&management_config(endpoint.clone())).unwrap();
        assert!(matches!(fetcher.fetch().await, Err(FetchError::Malformed(_))));

        let dup = endpoint.replace("/config", "/dup");
        let fetcher = HttpConfigFetcher::new(&management_config(dup)).unwrap();
        assert!(matches!(fetcher.fetch().await, Err(FetchError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let app = Router::new().route(
            "/config",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "{}"
            }),
        );
        let fetcher = HttpConfigFetcher::new(&management_config(serve(app).await)).unwrap();

        assert!(matches!(fetcher.fetch().await, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher =
            HttpConfigFetcher::new(&management_config(format!("http://{}/config", addr))).unwrap();
        assert!(matches!(fetcher.fetch().await, Err(FetchError::Network(_))));
    }
}
