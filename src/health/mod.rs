//! Health and connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator probe (GET /healthz, /readyz)
//!     → probes.rs
//!     → config store (has a snapshot been committed?)
//!     → sync watch channel (mode, failures, last success)
//!     → 200 / 503 with a JSON report
//! ```
//!
//! # Design Decisions
//! - Liveness and readiness are independent signals
//! - OFFLINE does not remove the gateway from service

pub mod probes;

pub use probes::{
    liveness_handler, readiness_handler, Connectivity, HealthMonitor, LivenessReport,
    ReadinessReport,
};
