//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed management plane fetch:
//!     → sync::state (count failure, derive mode)
//!     → backoff.rs (delay before next attempt while offline)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline (fetch timeout, backend timeout)
//! - Jittered backoff prevents a fleet of gateways hammering a recovering
//!   management plane
//! - Backend failures are reported per request and never retried by the
//!   gateway

pub mod backoff;
