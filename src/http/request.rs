//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Extract the client credential
//! - Build the backend URI from the matched rule
//! - Prepare the request for forwarding to the backend
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The credential header is configurable; `Authorization: Bearer` (any case) is the
//!   fallback
//! - The client credential is stripped before forwarding
//! - Forwarded requests always use HTTP/1.1 towards the backend

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, HOST},
        request::Parts,
        HeaderMap, HeaderName, HeaderValue, Request, Uri,
    },
};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::{Position, Url};
use uuid::Uuid;

use crate::http::response::{apply_rewrites, strip_hop_by_hop, ProxyError};
use crate::routing::matcher::strip_matched_prefix;
use crate::snapshot::types::RouteRule;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// `MakeRequestId` producing random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Credential from the configured header, else from a bearer token.
pub fn extract_credential<'a>(headers: &'a HeaderMap, header: &HeaderName) -> Option<&'a str> {
    if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
        return Some(value.trim());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

/// Token of an `Authorization` value using the bearer scheme, any case.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Remove the client credential so it never reaches the backend.
fn strip_credential(headers: &mut HeaderMap, header: &HeaderName) {
    headers.remove(header);
    let is_bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| bearer_token(v).is_some());
    if is_bearer {
        headers.remove(AUTHORIZATION);
    }
}

/// Backend URI: target base path, then the (optionally stripped) request
/// path, then the original query.
pub fn upstream_uri(rule: &RouteRule, original: &Uri) -> Result<Uri, ProxyError> {
    let target: &Url = &rule.backend_target;
    let path = if rule.strip_prefix {
        strip_matched_prefix(original.path(), &rule.path_prefix)
    } else {
        Cow::Borrowed(original.path())
    };

    let mut uri = String::with_capacity(128);
    uri.push_str(&target[..Position::BeforePath]);
    uri.push_str(target.path().trim_end_matches('/'));
    uri.push_str(&path);
    if let Some(query) = original.query() {
        uri.push('?');
        uri.push_str(query);
    }

    uri.parse::<Uri>()
        .map_err(|e| ProxyError::InvalidUpstream(e.to_string()))
}

/// Rewrite the client request into the backend request.
pub fn prepare_upstream_request(
    parts: Parts,
    body: Body,
    rule: &RouteRule,
    uri: Uri,
    peer: SocketAddr,
    auth_header: &HeaderName,
) -> Request<Body> {
    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    strip_credential(&mut headers, auth_header);

    if let Some(host) = headers.remove(HOST) {
        if !headers.contains_key(X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, peer.ip()),
        None => peer.ip().to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    apply_rewrites(&mut headers, &rule.header_rewrites.inbound);

    let mut request = Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    request
}
