use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::snapshot::types::{RouteRule, SnapshotSource, SnapshotVersion};
use crate::sync::{SyncMode, SyncState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub ready: bool,
    pub mode: SyncMode,
    pub snapshot_version: SnapshotVersion,
}

/// Active snapshot with credentials reduced to a count.
#[derive(Serialize)]
pub struct SnapshotView {
    pub version: SnapshotVersion,
    pub source: SnapshotSource,
    pub fetched_at: u64,
    pub routes: Vec<RouteRule>,
    pub credentials: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        ready: state.store.is_ready(),
        mode: state.sync.borrow().mode,
        snapshot_version: state.store.active_version(),
    })
}

pub async fn get_sync(State(state): State<AdminState>) -> Json<SyncState> {
    Json(state.sync.borrow().clone())
}

pub async fn get_snapshot(State(state): State<AdminState>) -> Json<SnapshotView> {
    let snapshot = state.store.active_snapshot();
    Json(SnapshotView {
        version: snapshot.version,
        source: snapshot.source,
        fetched_at: snapshot.fetched_at,
        routes: snapshot.routes.clone(),
        credentials: snapshot.credentials.len(),
    })
}

pub async fn trigger_sync(State(state): State<AdminState>) -> (StatusCode, Json<serde_json::Value>) {
    state.trigger.notify_one();
    tracing::info!("Manual sync requested through admin API");
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "sync requested" })),
    )
}
