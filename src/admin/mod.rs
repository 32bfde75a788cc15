//! Operator API, served on its own listener.
//!
//! # Endpoints
//! ```text
//! GET  /admin/status        process and snapshot summary
//! GET  /admin/sync          full SyncState
//! GET  /admin/snapshot      active snapshot (credentials redacted)
//! POST /admin/sync/trigger  wake the sync loop now
//! ```
//!
//! Every endpoint requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::{watch, Notify};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::snapshot::ConfigStore;
use crate::sync::SyncState;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<ConfigStore>,
    pub sync: watch::Receiver<SyncState>,
    pub trigger: Arc<Notify>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/sync", get(get_sync))
        .route("/admin/snapshot", get(get_snapshot))
        .route("/admin/sync/trigger", post(trigger_sync))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
