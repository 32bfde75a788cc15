//! Configuration snapshot subsystem (the config store).
//!
//! # Data Flow
//! ```text
//! Startup:
//!     backup.rs (read + verify gateway-backup.json)
//!     → store.rs (activate as source=cache, mark ready)
//!
//! Successful fetch (sync client):
//!     ConfigurationSnapshot
//!     → store.rs commit (version check)
//!     → backup.rs (temp file + rename)
//!     → atomic swap of Arc<ConfigurationSnapshot>
//!     → request handlers observe the new generation
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; a new generation supersedes, never mutates
//! - Versions only move forward
//! - The read path is lock-free

pub mod backup;
pub mod store;
pub mod types;

pub use backup::{BackupError, BackupFile, CachedBackup};
pub use store::{ConfigStore, StoreError};
pub use types::{
    ConfigurationSnapshot, HeaderRewrites, RouteRule, SnapshotError, SnapshotSource,
    SnapshotVersion,
};
