//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, credential)
//!     → router.rs (load active snapshot)
//!     → matcher.rs (longest prefix)
//!     → requires_auth check
//!     → Return: RouteMatch, NotFound or Unauthorized
//! ```
//!
//! # Design Decisions
//! - Routing correctness never depends on management plane reachability
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same snapshot and path always match the same rule

pub mod matcher;
pub mod router;

pub use router::{resolve, RequestRouter, RouteError, RouteMatch};
