//! Configuration sync subsystem.
//!
//! # Data Flow
//! ```text
//! timer (interval picked by state.rs)
//!     → fetcher.rs (authenticated GET, bounded timeout)
//!     → success: store commit, record_success → CONNECTED
//!     → failure: record_failure → DEGRADED / OFFLINE
//!     → watch channel (health monitor, admin API)
//! ```
//!
//! # Design Decisions
//! - Sync runs beside the request path and never blocks it
//! - Sync failures never leave the loop
//! - Unified timer: sync_interval when connected, retry_interval when
//!   degraded, capped exponential backoff when offline

pub mod client;
pub mod fetcher;
pub mod state;

pub use client::{SyncClient, SyncOutcome};
pub use fetcher::{ConfigFetcher, FetchError, HttpConfigFetcher, ManagementDocument};
pub use state::{ModeTransition, SyncMode, SyncPolicy, SyncState};
