//! Routing configuration data model.

use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

/// Snapshot generation number. Version 0 is reserved for the builtin default.
pub type SnapshotVersion = u64;

/// Where the active snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Fetched from the management plane by this process.
    Remote,
    /// Restored from the on-disk backup at startup.
    Cache,
    /// Empty default, active until the first commit or restore.
    Builtin,
}

/// Header changes applied while forwarding.
///
/// An empty value removes the header instead of setting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderRewrites {
    /// Applied to the request sent to the backend.
    pub inbound: BTreeMap<String, String>,
    /// Applied to the response returned to the client.
    pub outbound: BTreeMap<String, String>,
}

impl HeaderRewrites {
    pub fn is_empty(&self) -> bool {
        self.inbound.is_empty() && self.outbound.is_empty()
    }
}

/// One routable API entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Label for logs and metrics. Falls back to the path prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Request path prefix this rule owns.
    pub path_prefix: String,

    /// Base URL requests are forwarded to.
    pub backend_target: Url,

    #[serde(default, skip_serializing_if = "HeaderRewrites::is_empty")]
    pub header_rewrites: HeaderRewrites,

    /// Reject requests without a known credential.
    #[serde(default)]
    pub requires_auth: bool,

    /// Remove the matched prefix before appending the path to the backend URL.
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteRule {
    pub fn new(path_prefix: impl Into<String>, backend_target: Url) -> Self {
        Self {
            name: None,
            path_prefix: path_prefix.into(),
            backend_target,
            header_rewrites: HeaderRewrites::default(),
            requires_auth: false,
            strip_prefix: false,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path_prefix)
    }
}

/// Reasons a snapshot is rejected before it can become active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("route {index}: path prefix '{prefix}' must start with '/'")]
    RelativePrefix { index: usize, prefix: String },

    #[error("route {index}: duplicate path prefix '{prefix}'")]
    DuplicatePrefix { index: usize, prefix: String },

    #[error("route {index}: backend '{target}' must be an http URL with a host")]
    UnsupportedBackend { index: usize, target: String },

    #[error("route {index}: invalid header name '{header}'")]
    InvalidHeader { index: usize, header: String },

    #[error("version 0 is reserved")]
    ReservedVersion,
}

/// One immutable, versioned generation of routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    pub version: SnapshotVersion,
    pub routes: Vec<RouteRule>,
    /// Subscription keys accepted by routes with `requires_auth`.
    #[serde(default)]
    pub credentials: Vec<String>,
    /// Unix milliseconds at which the snapshot was fetched.
    pub fetched_at: u64,
    pub source: SnapshotSource,
}

impl ConfigurationSnapshot {
    /// The builtin default: no routes, version 0.
    pub fn empty() -> Self {
        Self {
            version: 0,
            routes: Vec::new(),
            credentials: Vec::new(),
            fetched_at: 0,
            source: SnapshotSource::Builtin,
        }
    }

    /// A freshly fetched snapshot stamped with the current time.
    pub fn remote(version: SnapshotVersion, routes: Vec<RouteRule>) -> Self {
        Self {
            version,
            routes,
            credentials: Vec::new(),
            fetched_at: unix_millis(),
            source: SnapshotSource::Remote,
        }
    }

    pub fn with_credentials(mut self, credentials: Vec<String>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_source(mut self, source: SnapshotSource) -> Self {
        self.source = source;
        self
    }

    /// Check structural invariants: absolute, unique prefixes and usable backends.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version == 0 {
            return Err(SnapshotError::ReservedVersion);
        }

        let mut seen = HashSet::with_capacity(self.routes.len());
        for (index, rule) in self.routes.iter().enumerate() {
            if !rule.path_prefix.starts_with('/') {
                return Err(SnapshotError::RelativePrefix {
                    index,
                    prefix: rule.path_prefix.clone(),
                });
            }
            if !seen.insert(rule.path_prefix.as_str()) {
                return Err(SnapshotError::DuplicatePrefix {
                    index,
                    prefix: rule.path_prefix.clone(),
                });
            }
            // The forwarding client speaks plain HTTP only.
            if rule.backend_target.scheme() != "http" || rule.backend_target.host_str().is_none() {
                return Err(SnapshotError::UnsupportedBackend {
                    index,
                    target: rule.backend_target.to_string(),
                });
            }
            let rewrites = &rule.header_rewrites;
            for header in rewrites.inbound.keys().chain(rewrites.outbound.keys()) {
                if axum::http::HeaderName::from_bytes(header.as_bytes()).is_err() {
                    return Err(SnapshotError::InvalidHeader {
                        index,
                        header: header.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for ConfigurationSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
