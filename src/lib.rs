//! Edge gateway library.
//!
//! A reverse proxy whose routing table is pulled from a remote management
//! plane and keeps serving from the last known snapshot when that plane is
//! unreachable.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod snapshot;
pub mod sync;

// Operations
pub mod admin;
pub mod health;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
