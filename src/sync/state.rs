//! Management plane connectivity state machine.
//!
//! # States
//! - Connected: last fetch succeeded and is recent
//! - Degraded: some consecutive failures, or no recent success yet
//! - Offline: `max_retry_count` or more consecutive failures
//!
//! # State Transitions
//! ```text
//! Connected → Degraded: first failed fetch
//! Degraded  → Offline:  consecutive failures >= max_retry_count
//! any       → Connected: one successful fetch
//! Connected → Degraded: no success within 2 * sync_interval
//! ```
//!
//! # Design Decisions
//! - Mode is derived from the failure counter and the age of the last
//!   success, never stored as an independent flag
//! - One unified timer: the delay until the next attempt depends on the mode
//! - Pure: callers pass `now`, so transitions are tested without clocks

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ManagementConfig;
use crate::resilience::backoff::calculate_backoff;

/// Connectivity mode towards the management plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMode {
    Connected,
    Degraded,
    Offline,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Connected => "CONNECTED",
            SyncMode::Degraded => "DEGRADED",
            SyncMode::Offline => "OFFLINE",
        }
    }

    /// Numeric encoding for the mode gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            SyncMode::Connected => 0.0,
            SyncMode::Degraded => 1.0,
            SyncMode::Offline => 2.0,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync cadence and thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    pub sync_interval: Duration,
    pub retry_interval: Duration,
    pub max_retry_count: u32,
    pub max_backoff: Duration,
}

impl From<&ManagementConfig> for SyncPolicy {
    fn from(config: &ManagementConfig) -> Self {
        Self {
            sync_interval: config.sync_interval(),
            retry_interval: config.retry_interval(),
            max_retry_count: config.max_retry_count.max(1),
            max_backoff: config.max_backoff(),
        }
    }
}

impl SyncPolicy {
    /// Derive the mode from the failure counter and the age of the last success.
    pub fn mode_for(&self, failures: u32, last_success: Option<u64>, now: u64) -> SyncMode {
        if failures >= self.max_retry_count {
            return SyncMode::Offline;
        }
        if failures > 0 {
            return SyncMode::Degraded;
        }
        let window = millis(self.sync_interval).saturating_mul(2);
        match last_success {
            Some(at) if now.saturating_sub(at) <= window => SyncMode::Connected,
            _ => SyncMode::Degraded,
        }
    }

    /// Delay before the next attempt in the given mode.
    pub fn delay_for(&self, mode: SyncMode, failures: u32) -> Duration {
        match mode {
            SyncMode::Connected => self.sync_interval,
            SyncMode::Degraded => self.retry_interval,
            SyncMode::Offline => {
                let attempt = failures.saturating_sub(self.max_retry_count) + 1;
                calculate_backoff(
                    attempt,
                    millis(self.retry_interval),
                    millis(self.max_backoff),
                )
            }
        }
    }
}

/// A mode change caused by a sync attempt or by elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: SyncMode,
    pub to: SyncMode,
}

/// Process-wide sync bookkeeping. Persisted alongside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Unix millis of the last successful fetch.
    pub last_successful_sync_at: Option<u64>,
    pub consecutive_failure_count: u32,
    pub mode: SyncMode,
    /// Unix millis of the next scheduled attempt.
    pub next_retry_at: Option<u64>,
    /// Cause of the most recent failure, cleared on success.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            last_successful_sync_at: None,
            consecutive_failure_count: 0,
            mode: SyncMode::Degraded,
            next_retry_at: None,
            last_error: None,
        }
    }
}

impl SyncState {
    pub fn record_success(&mut self, policy: &SyncPolicy, now: u64) -> Option<ModeTransition> {
        self.consecutive_failure_count = 0;
        self.last_successful_sync_at = Some(now);
        self.last_error = None;
        self.apply(policy, now)
    }

    pub fn record_failure(
        &mut self,
        policy: &SyncPolicy,
        now: u64,
        reason: impl Into<String>,
    ) -> Option<ModeTransition> {
        self.consecutive_failure_count = self.consecutive_failure_count.saturating_add(1);
        self.last_error = Some(reason.into());
        self.apply(policy, now)
    }

    /// Re-derive the mode after time passed without an attempt.
    pub fn refresh(&mut self, policy: &SyncPolicy, now: u64) -> Option<ModeTransition> {
        let from = self.mode;
        self.mode = policy.mode_for(
            self.consecutive_failure_count,
            self.last_successful_sync_at,
            now,
        );
        (from != self.mode).then_some(ModeTransition { from, to: self.mode })
    }

    /// Time left until `next_retry_at`, zero when due or unscheduled.
    pub fn delay_until_next(&self, now: u64) -> Duration {
        self.next_retry_at
            .map(|at| Duration::from_millis(at.saturating_sub(now)))
            .unwrap_or(Duration::ZERO)
    }

    fn apply(&mut self, policy: &SyncPolicy, now: u64) -> Option<ModeTransition> {
        let transition = self.refresh(policy, now);
        let delay = policy.delay_for(self.mode, self.consecutive_failure_count);
        self.next_retry_at = Some(now.saturating_add(millis(delay)));
        transition
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
