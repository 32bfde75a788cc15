//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (already loaded and validated) → Metrics exporter
//!     → Restore backup → Sync client → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop sync loop and admin API
//!     → Stop accepting → Drain in-flight requests (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds even when the management plane is down; readiness
//!   reports whether traffic can be routed
//! - Shutdown has a deadline: connections still open after the grace
//!   period are closed

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
