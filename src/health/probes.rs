//! Liveness and readiness probes.
//!
//! # Responsibilities
//! - Liveness: the process answers requests
//! - Readiness: a snapshot has been committed or restored, so traffic can be
//!   routed
//! - Report management plane connectivity alongside both
//!
//! # Design Decisions
//! - Readiness ignores sync mode: an OFFLINE gateway with a cached snapshot
//!   keeps receiving traffic
//! - Probes read shared state only; they never trigger a fetch

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tokio::sync::watch;

use crate::snapshot::store::ConfigStore;
use crate::snapshot::types::{SnapshotSource, SnapshotVersion};
use crate::sync::state::{SyncMode, SyncState};

/// Management plane reachability as seen by the sync client.
#[derive(Debug, Clone, Serialize)]
pub struct Connectivity {
    pub mode: SyncMode,
    pub consecutive_failures: u32,
    pub last_successful_sync_at: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessReport {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub snapshot_version: SnapshotVersion,
    pub connectivity: Connectivity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub snapshot_version: SnapshotVersion,
    pub snapshot_source: SnapshotSource,
    pub routes: usize,
    pub connectivity: Connectivity,
}

/// Exposes probe results to the orchestrator.
#[derive(Clone)]
pub struct HealthMonitor {
    store: Arc<ConfigStore>,
    sync: watch::Receiver<SyncState>,
    started_at: Instant,
}

impl HealthMonitor {
    pub fn new(store: Arc<ConfigStore>, sync: watch::Receiver<SyncState>) -> Self {
        Self {
            store,
            sync,
            started_at: Instant::now(),
        }
    }

    pub fn liveness(&self) -> LivenessReport {
        LivenessReport {
            status: "alive",
            uptime_secs: self.started_at.elapsed().as_secs(),
            snapshot_version: self.store.active_version(),
            connectivity: self.connectivity(),
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        let state = self.sync.borrow();
        Connectivity {
            mode: state.mode,
            consecutive_failures: state.consecutive_failure_count,
            last_successful_sync_at: state.last_successful_sync_at,
        }
    }

    pub fn readiness(&self) -> ReadinessReport {
        let snapshot = self.store.active_snapshot();
        ReadinessReport {
            ready: self.store.is_ready(),
            snapshot_version: snapshot.version,
            snapshot_source: snapshot.source,
            routes: snapshot.routes.len(),
            connectivity: self.connectivity(),
        }
    }
}

pub async fn liveness_handler(State(monitor): State<HealthMonitor>) -> (StatusCode, Json<LivenessReport>) {
    (StatusCode::OK, Json(monitor.liveness()))
}

pub async fn readiness_handler(
    State(monitor): State<HealthMonitor>,
) -> (StatusCode, Json<ReadinessReport>) {
    let report = monitor.readiness();
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
