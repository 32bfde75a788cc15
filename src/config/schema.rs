//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Management plane connection and sync cadence.
    pub management: ManagementConfig,

    /// Local configuration cache (CachedBackup).
    pub cache: CacheConfig,

    /// Credential extraction for routes that require auth.
    pub auth: AuthConfig,

    /// Liveness/readiness probe paths.
    pub probes: ProbeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum requests handled concurrently (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_concurrent_requests: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Management plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagementConfig {
    /// Configuration endpoint URL.
    pub endpoint_url: String,

    /// Bearer token sent with every fetch.
    pub token: String,

    /// Steady-state polling interval in milliseconds.
    pub sync_interval_ms: u64,

    /// Polling interval while degraded, in milliseconds.
    pub retry_interval_ms: u64,

    /// Consecutive failures before the gateway considers itself offline.
    pub max_retry_count: u32,

    /// Upper bound for the offline backoff in milliseconds.
    pub max_backoff_ms: u64,

    /// Fetch timeout in milliseconds. Derived from the sync interval when unset.
    pub fetch_timeout_ms: Option<u64>,
}

impl ManagementConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Fetch timeout, defaulting to the sync interval capped at 30 seconds.
    pub fn fetch_timeout(&self) -> Duration {
        match self.fetch_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.sync_interval().min(Duration::from_secs(30)),
        }
    }
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            token: String::new(),
            sync_interval_ms: 30_000,
            retry_interval_ms: 5_000,
            max_retry_count: 3,
            max_backoff_ms: 60_000,
            fetch_timeout_ms: None,
        }
    }
}

/// Local configuration cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist committed snapshots so restarts survive an unreachable management plane.
    pub enabled: bool,

    /// Directory holding the backup file.
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("./gateway-cache"),
        }
    }
}

/// Credential extraction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the subscription key. `Authorization: Bearer` is also accepted.
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: "x-api-key".to_string(),
        }
    }
}

/// Orchestrator probe paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub liveness_path: String,
    pub readiness_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            liveness_path: "/healthz".to_string(),
            readiness_path: "/readyz".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for a backend to produce response headers, in seconds.
    pub backend_secs: u64,

    /// How long in-flight requests may drain after shutdown begins, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            backend_secs: 30,
            shutdown_grace_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
