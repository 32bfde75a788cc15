//! Background configuration sync loop.
//!
//! # Responsibilities
//! - Fetch from the management plane on the cadence the state machine picks
//! - Commit fetched snapshots to the config store
//! - Publish `SyncState` to the health monitor and admin API
//! - Contain every failure inside the loop
//!
//! # Design Decisions
//! - Sequential loop: exactly one fetch in flight, late ticks are skipped
//!   rather than queued
//! - A stale or duplicate version is a successful sync with nothing to apply
//! - Shutdown cancels both the timer and an in-flight fetch

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, watch, Notify};

use crate::observability::metrics;
use crate::snapshot::store::{ConfigStore, StoreError};
use crate::snapshot::types::{unix_millis, SnapshotVersion};
use crate::sync::fetcher::ConfigFetcher;
use crate::sync::state::{ModeTransition, SyncMode, SyncPolicy, SyncState};

/// Result of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A newer snapshot was committed.
    Applied(SnapshotVersion),
    /// Fetch succeeded but the active snapshot is already this new.
    Unchanged(SnapshotVersion),
    Failed,
}

pub struct SyncClient {
    fetcher: Arc<dyn ConfigFetcher>,
    store: Arc<ConfigStore>,
    policy: SyncPolicy,
    state: watch::Sender<SyncState>,
    trigger: Arc<Notify>,
}

impl SyncClient {
    /// Create a client starting from a restored (or default) state.
    pub fn new(
        fetcher: Arc<dyn ConfigFetcher>,
        store: Arc<ConfigStore>,
        policy: SyncPolicy,
        mut initial: SyncState,
    ) -> Self {
        initial.refresh(&policy, unix_millis());
        metrics::record_sync_state(initial.mode, initial.consecutive_failure_count);
        let (state, _) = watch::channel(initial);

        Self {
            fetcher,
            store,
            policy,
            state,
            trigger: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Handle that wakes the loop for an immediate sync.
    pub fn trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.trigger)
    }

    /// Perform one fetch attempt and fold the result into the sync state.
    pub async fn sync_once(&self) -> SyncOutcome {
        let started = Instant::now();
        let result = self.fetcher.fetch().await;
        let now = unix_millis();
        let mut next = self.state();

        match result {
            Ok(snapshot) => {
                let version = snapshot.version;
                let transition = next.record_success(&self.policy, now);
                metrics::record_fetch("success", started);

                let outcome = match self.store.commit(snapshot, &next).await {
                    Ok(_) => SyncOutcome::Applied(version),
                    Err(StoreError::StaleVersion { offered, active }) => {
                        tracing::debug!(
                            offered,
                            active,
                            "Fetched snapshot is not newer than the active one"
                        );
                        SyncOutcome::Unchanged(active)
                    }
                };

                let persisted = matches!(outcome, SyncOutcome::Applied(_));
                self.publish(next, transition, persisted).await;
                outcome
            }
            Err(e) => {
                let transition = next.record_failure(&self.policy, now, e.to_string());
                metrics::record_fetch(e.kind(), started);
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    consecutive_failures = next.consecutive_failure_count,
                    mode = %next.mode,
                    "Configuration fetch failed"
                );

                self.publish(next, transition, false).await;
                SyncOutcome::Failed
            }
        }
    }

    /// Run until shutdown. The first attempt happens immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            sync_interval = ?self.policy.sync_interval,
            retry_interval = ?self.policy.retry_interval,
            max_retry_count = self.policy.max_retry_count,
            "Config sync client starting"
        );

        loop {
            self.refresh_mode().await;

            tokio::select! {
                _ = self.sync_once() => {}
                _ = shutdown.recv() => {
                    tracing::info!("Sync client received shutdown signal during fetch, exiting loop");
                    return;
                }
            }

            let delay = self.state.borrow().delay_until_next(unix_millis());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.trigger.notified() => {
                    tracing::info!("Immediate configuration sync requested");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sync client received shutdown signal, exiting loop");
                    return;
                }
            }
        }
    }

    /// Apply purely time-based transitions (a success aging out of its window).
    async fn refresh_mode(&self) {
        let mut next = self.state();
        if let Some(transition) = next.refresh(&self.policy, unix_millis()) {
            self.publish(next, Some(transition), false).await;
        }
    }

    async fn publish(&self, state: SyncState, transition: Option<ModeTransition>, persisted: bool) {
        metrics::record_sync_state(state.mode, state.consecutive_failure_count);

        if let Some(t) = transition {
            metrics::record_mode_transition(t.from, t.to);
            match t.to {
                SyncMode::Connected => tracing::info!(
                    from = %t.from,
                    to = %t.to,
                    "Management plane connected"
                ),
                SyncMode::Degraded => tracing::warn!(
                    from = %t.from,
                    to = %t.to,
                    consecutive_failures = state.consecutive_failure_count,
                    "Management plane sync degraded"
                ),
                SyncMode::Offline => tracing::error!(
                    from = %t.from,
                    to = %t.to,
                    consecutive_failures = state.consecutive_failure_count,
                    active_version = self.store.active_version(),
                    "Management plane offline, serving cached configuration"
                ),
            }
            if !persisted {
                self.store.persist_sync_state(&state).await;
            }
        }

        self.state.send_replace(state);
    }
}
