//! Request forwarding.
//!
//! # Responsibilities
//! - Route each request against the active snapshot
//! - Forward to the rule's backend under the backend timeout
//! - Record per-route request metrics
//!
//! # Design Decisions
//! - No retries: a failed backend call is answered once with 502/504
//! - Routing and forwarding never consult sync state

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::http::request::{extract_credential, prepare_upstream_request, request_id, upstream_uri};
use crate::http::response::{finish_response, ProxyError};
use crate::observability::metrics;
use crate::routing::RequestRouter;
use crate::snapshot::types::RouteRule;

/// State shared by the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    pub router: RequestRouter,
    pub client: Client<HttpConnector, Body>,
    pub auth_header: HeaderName,
    pub backend_timeout: Duration,
}

/// Main proxy handler.
/// Looks up route, checks the credential and forwards the request.
pub async fn proxy_handler(
    State(state): State<ProxyState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let started = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %path,
        "Proxying request"
    );

    let credential = extract_credential(request.headers(), &state.auth_header);
    let matched = match state.router.route(&path, credential) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::debug!(request_id = %request_id, path = %path, error = %e, "Request rejected");
            let error = ProxyError::from(e);
            metrics::record_request("none", error.status().as_u16(), started);
            return error.into_response();
        }
    };

    let rule = matched.rule();
    let route = rule.label().to_string();

    match forward(&state, rule, request, peer).await {
        Ok(response) => {
            metrics::record_request(&route, response.status().as_u16(), started);
            tracing::debug!(
                request_id = %request_id,
                route = %route,
                snapshot_version = matched.snapshot_version(),
                status = response.status().as_u16(),
                "Request forwarded"
            );
            response
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                route = %route,
                backend = %rule.backend_target,
                error = %e,
                "Backend request failed"
            );
            metrics::record_backend_error(&route, e.kind());
            metrics::record_request(&route, e.status().as_u16(), started);
            e.into_response()
        }
    }
}

async fn forward(
    state: &ProxyState,
    rule: &RouteRule,
    request: Request<Body>,
    peer: SocketAddr,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let uri = upstream_uri(rule, &parts.uri)?;
    let upstream = prepare_upstream_request(parts, body, rule, uri, peer, &state.auth_header);

    let response = match tokio::time::timeout(state.backend_timeout, state.client.request(upstream)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return Err(ProxyError::BadGateway(e.to_string())),
        Err(_) => return Err(ProxyError::GatewayTimeout(state.backend_timeout)),
    };

    Ok(finish_response(response, &rule.header_rewrites.outbound))
}
