//! The single active configuration snapshot.
//!
//! # Responsibilities
//! - Hand out the active snapshot to request handlers without blocking
//! - Accept strictly newer snapshots from the sync client
//! - Persist every commit to the on-disk backup before activating it
//! - Restore the backup once at startup
//!
//! # Design Decisions
//! - `ArcSwap` pointer: readers load an `Arc`, writers swap it; in-flight
//!   requests keep the generation they started with
//! - Commits are serialized by an async mutex that readers never touch
//! - Disk problems degrade to memory-only operation, never to a crash

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::snapshot::backup::{BackupError, BackupFile, CachedBackup};
use crate::snapshot::types::{ConfigurationSnapshot, SnapshotSource, SnapshotVersion};
use crate::sync::state::SyncState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot version {offered} is not newer than active version {active}")]
    StaleVersion {
        offered: SnapshotVersion,
        active: SnapshotVersion,
    },
}

/// Holder of the active `ConfigurationSnapshot`.
pub struct ConfigStore {
    active: ArcSwap<ConfigurationSnapshot>,
    backup: Option<BackupFile>,
    ready: AtomicBool,
    commit_lock: Mutex<()>,
}

impl ConfigStore {
    /// Create a store holding the builtin empty snapshot.
    ///
    /// Without a backup file the store is memory-only.
    pub fn new(backup: Option<BackupFile>) -> Self {
        Self {
            active: ArcSwap::from_pointee(ConfigurationSnapshot::empty()),
            backup,
            ready: AtomicBool::new(false),
            commit_lock: Mutex::new(()),
        }
    }

    /// The snapshot currently in effect. Never blocks.
    pub fn active_snapshot(&self) -> Arc<ConfigurationSnapshot> {
        self.active.load_full()
    }

    pub fn active_version(&self) -> SnapshotVersion {
        self.active.load().version
    }

    /// True once a snapshot was committed or restored from disk.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Persist and activate a strictly newer snapshot.
    pub async fn commit(
        &self,
        snapshot: ConfigurationSnapshot,
        sync_state: &SyncState,
    ) -> Result<Arc<ConfigurationSnapshot>, StoreError> {
        let _guard = self.commit_lock.lock().await;

        let active = self.active_version();
        if snapshot.version <= active {
            metrics::record_commit("stale");
            return Err(StoreError::StaleVersion {
                offered: snapshot.version,
                active,
            });
        }

        let snapshot = Arc::new(snapshot);
        if let Some(backup) = &self.backup {
            let record = CachedBackup {
                snapshot: (*snapshot).clone(),
                sync_state: sync_state.clone(),
            };
            write_backup(backup, &record).await;
        }

        self.active.store(Arc::clone(&snapshot));
        self.ready.store(true, Ordering::Release);
        metrics::record_commit("applied");
        metrics::record_snapshot_version(snapshot.version);

        tracing::info!(
            version = snapshot.version,
            previous_version = active,
            routes = snapshot.routes.len(),
            "Configuration snapshot activated"
        );
        Ok(snapshot)
    }

    /// Restore the backup written by a previous run.
    ///
    /// Any problem with the file is logged and treated as "no backup": the
    /// gateway starts empty and waits for its first successful fetch.
    pub async fn load_from_disk(&self) -> Option<SyncState> {
        let backup = self.backup.as_ref()?;

        let restored = match backup.read().await {
            Ok(restored) => restored,
            Err(BackupError::Missing(path)) => {
                tracing::info!(path = %path.display(), "No configuration backup found");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    path = %backup.path().display(),
                    error = %e,
                    "Ignoring unusable configuration backup"
                );
                return None;
            }
        };

        let _guard = self.commit_lock.lock().await;
        if restored.snapshot.version <= self.active_version() {
            return None;
        }

        let snapshot = restored.snapshot.with_source(SnapshotSource::Cache);
        tracing::info!(
            version = snapshot.version,
            routes = snapshot.routes.len(),
            fetched_at = snapshot.fetched_at,
            "Restored configuration snapshot from backup"
        );
        metrics::record_snapshot_version(snapshot.version);
        self.active.store(Arc::new(snapshot));
        self.ready.store(true, Ordering::Release);

        Some(restored.sync_state)
    }

    /// Rewrite the backup with the current snapshot and a new sync state.
    ///
    /// Does nothing before the first commit: an empty snapshot is never
    /// persisted, so a restart cannot mistake it for real configuration.
    pub async fn persist_sync_state(&self, sync_state: &SyncState) {
        let Some(backup) = &self.backup else {
            return;
        };
        let _guard = self.commit_lock.lock().await;
        if !self.is_ready() {
            return;
        }

        let record = CachedBackup {
            snapshot: (*self.active_snapshot()).clone(),
            sync_state: sync_state.clone(),
        };
        write_backup(backup, &record).await;
    }
}

async fn write_backup(backup: &BackupFile, record: &CachedBackup) {
    match backup.write(record).await {
        Ok(()) => metrics::record_backup_write(true),
        Err(e) => {
            metrics::record_backup_write(false);
            tracing::error!(
                path = %backup.path().display(),
                error = %e,
                "Failed to persist configuration backup"
            );
        }
    }
}
