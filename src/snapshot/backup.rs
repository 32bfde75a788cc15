//! On-disk persistence of the last committed snapshot.
//!
//! # Layout
//! ```text
//! <cache dir>/gateway-backup.json
//!     { "format": 1, "checksum": "<sha256 of payload>", "payload": "<CachedBackup json>" }
//! ```
//!
//! # Design Decisions
//! - Write to a temp file, fsync, then rename: readers never see a torn file
//! - The checksum covers the exact payload bytes, so truncation and bit rot
//!   are detected before deserialization is trusted
//! - File 0600 on unix, and 0700 for a cache directory this process creates

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::snapshot::types::{ConfigurationSnapshot, SnapshotError};
use crate::sync::state::SyncState;

pub const BACKUP_FILE_NAME: &str = "gateway-backup.json";
const FORMAT_VERSION: u32 = 1;

/// Snapshot plus sync bookkeeping, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBackup {
    pub snapshot: ConfigurationSnapshot,
    pub sync_state: SyncState,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format: u32,
    checksum: String,
    payload: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("no backup at {}", .0.display())]
    Missing(PathBuf),

    #[error("backup I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unsupported backup format {0}")]
    UnsupportedFormat(u32),

    #[error("backup checksum mismatch")]
    ChecksumMismatch,

    #[error("backup snapshot is invalid: {0}")]
    Invalid(#[from] SnapshotError),
}

/// Handle to the backup file inside the cache directory.
#[derive(Debug, Clone)]
pub struct BackupFile {
    path: PathBuf,
}

impl BackupFile {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(BACKUP_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and verify the backup.
    pub async fn read(&self) -> Result<CachedBackup, BackupError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::Missing(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.format != FORMAT_VERSION {
            return Err(BackupError::UnsupportedFormat(envelope.format));
        }
        if checksum(&envelope.payload) != envelope.checksum {
            return Err(BackupError::ChecksumMismatch);
        }

        let backup: CachedBackup = serde_json::from_str(&envelope.payload)?;
        backup.snapshot.validate()?;
        Ok(backup)
    }

    /// Atomically replace the backup.
    pub async fn write(&self, backup: &CachedBackup) -> Result<(), BackupError> {
        // Only a directory created here is narrowed; a shared one keeps its mode
        if let Some(dir) = self.path.parent() {
            if !tokio::fs::try_exists(dir).await? {
                tokio::fs::create_dir_all(dir).await?;
                restrict_dir(dir).await?;
            }
        }

        let payload = serde_json::to_string(backup)?;
        let envelope = Envelope {
            format: FORMAT_VERSION,
            checksum: checksum(&payload),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn checksum(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

#[cfg(unix)]
async fn restrict_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await
}

#[cfg(not(unix))]
async fn restrict_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
