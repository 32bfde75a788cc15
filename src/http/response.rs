//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map routing and backend failures to HTTP status codes
//! - Strip hop-by-hop headers in both directions
//! - Apply per-route header rewrites
//! - Hand the backend body back as a stream
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend timeouts result in 504 Gateway Timeout, connection failures in
//!   502 Bad Gateway; neither touches sync state

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode},
    response::IntoResponse,
};
use hyper::body::Incoming;

use crate::routing::RouteError;

/// Headers that only apply to a single connection.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Per-request failure surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("backend request failed: {0}")]
    BadGateway(String),

    #[error("backend did not respond within {0:?}")]
    GatewayTimeout(Duration),

    #[error("cannot build backend URI: {0}")]
    InvalidUpstream(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Route(RouteError::NotFound) => StatusCode::NOT_FOUND,
            ProxyError::Route(RouteError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ProxyError::Route(RouteError::InvalidPath) => StatusCode::BAD_REQUEST,
            ProxyError::BadGateway(_) | ProxyError::InvalidUpstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short label for backend error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Route(RouteError::NotFound) => "not_found",
            ProxyError::Route(RouteError::Unauthorized) => "unauthorized",
            ProxyError::Route(RouteError::InvalidPath) => "invalid_path",
            ProxyError::BadGateway(_) => "connect",
            ProxyError::GatewayTimeout(_) => "timeout",
            ProxyError::InvalidUpstream(_) => "invalid_upstream",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ProxyError::Route(RouteError::NotFound) => "No matching route found",
            ProxyError::Route(RouteError::Unauthorized) => "Missing or invalid credential",
            ProxyError::Route(RouteError::InvalidPath) => "Invalid request path",
            ProxyError::BadGateway(_) | ProxyError::InvalidUpstream(_) => "Upstream request failed",
            ProxyError::GatewayTimeout(_) => "Upstream request timed out",
        };

        let mut response = (status, message).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Set or (for empty values) remove headers.
pub fn apply_rewrites(headers: &mut HeaderMap, rewrites: &BTreeMap<String, String>) {
    for (name, value) in rewrites {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        if value.is_empty() {
            headers.remove(&name);
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, "Skipping header rewrite with invalid value"),
        }
    }
}

/// Turn a backend response into the client response.
pub fn finish_response(
    response: Response<Incoming>,
    outbound: &BTreeMap<String, String>,
) -> axum::response::Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    apply_rewrites(&mut parts.headers, outbound);
    Response::from_parts(parts, Body::new(body))
}
