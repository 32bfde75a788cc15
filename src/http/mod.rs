//! HTTP request path (the proxy front-end).
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, concurrency limit)
//!     → proxy.rs (route against the active snapshot)
//!     → request.rs (backend URI, forwarded headers, inbound rewrites)
//!     → hyper client → backend
//!     → response.rs (hop-by-hop strip, outbound rewrites, stream back)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::GatewayServer;
