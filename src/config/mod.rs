//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → tunables handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Static process configuration only; routing data comes from the
//!   management plane (see `sync`)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, CacheConfig, GatewayConfig, ListenerConfig, LogFormat,
    ManagementConfig, ObservabilityConfig, ProbeConfig, TimeoutConfig, TlsConfig,
};
