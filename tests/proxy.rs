//! Request path behaviour against a live gateway.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

use common::{client, document, gateway_config, MockManagementPlane, RunningGateway};
use edge_gateway::sync::SyncMode;

async fn gateway_with_routes(routes: serde_json::Value) -> (RunningGateway, MockManagementPlane, tempfile::TempDir) {
    let plane = MockManagementPlane::start(document(1, routes)).await;
    let cache = tempfile::tempdir().unwrap();
    let gateway = RunningGateway::start(gateway_config(&plane.endpoint, cache.path())).await;
    gateway.wait_for_version(1).await;
    (gateway, plane, cache)
}

#[tokio::test]
async fn test_longest_prefix_and_not_found() {
    let api = common::start_mock_backend("api").await;
    let users = common::start_mock_backend("users").await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/api", "backend_target": format!("http://{}", api) },
        { "path_prefix": "/api/users", "backend_target": format!("http://{}", users) },
    ]))
    .await;
    let http = client();

    let res = http.get(gateway.url("/api/users/7")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "users /api/users/7");

    let res = http.get(gateway.url("/api/orders")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "api /api/orders");

    let res = http.get(gateway.url("/other")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    gateway.stop().await;
}

#[tokio::test]
async fn test_requires_auth() {
    let backend = common::start_mock_backend("secure").await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/secure", "backend_target": format!("http://{}", backend), "requires_auth": true },
    ]))
    .await;
    let http = client();

    let res = http.get(gateway.url("/secure")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = http
        .get(gateway.url("/secure"))
        .header("x-api-key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = http
        .get(gateway.url("/secure"))
        .header("x-api-key", "client-key-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = http
        .get(gateway.url("/secure"))
        .bearer_auth("client-key-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-seen-authorization"], "");

    let res = http
        .get(gateway.url("/secure"))
        .header("authorization", "bearer client-key-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = http
        .get(gateway.url("/secure"))
        .header("x-api-key", "client-key-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-seen-api-key"], "");

    gateway.stop().await;
}

/// Send `request` verbatim and return the status line.
async fn raw_status_line(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    response.lines().next().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_dot_segments_cannot_reach_protected_route() {
    let backend = common::start_mock_backend("backend").await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/public", "backend_target": format!("http://{}", backend) },
        { "path_prefix": "/admin", "backend_target": format!("http://{}", backend), "requires_auth": true },
    ]))
    .await;

    for path in ["/public/../admin/secrets", "/public/%2e%2e/admin/secrets", "/public/./x"] {
        let request = format!("GET {} HTTP/1.1\r\nHost: gateway\r\nConnection: close\r\n\r\n", path);
        let status = raw_status_line(gateway.addr, &request).await;
        assert!(status.starts_with("HTTP/1.1 400"), "{}: {}", path, status);
    }

    // Plain paths are unaffected
    let request = "GET /public/x HTTP/1.1\r\nHost: gateway\r\nConnection: close\r\n\r\n";
    let status = raw_status_line(gateway.addr, request).await;
    assert!(status.starts_with("HTTP/1.1 200"), "{}", status);

    gateway.stop().await;
}

#[tokio::test]
async fn test_backend_failures() {
    let closed = common::closed_port();
    let slow = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "late".to_string())
    })
    .await;
    let (mut gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/down", "backend_target": format!("http://{}", closed) },
        { "path_prefix": "/slow", "backend_target": format!("http://{}", slow) },
    ]))
    .await;
    let http = client();
    gateway.wait_for_mode(SyncMode::Connected).await;

    let sync_view = |gateway: &RunningGateway| {
        let state = gateway.sync.borrow();
        (state.mode, state.consecutive_failure_count)
    };
    let before = sync_view(&gateway);
    assert_eq!(before, (SyncMode::Connected, 0));

    let res = http.get(gateway.url("/down")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let res = http.get(gateway.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    // Backend failures never count against the management plane
    assert_eq!(sync_view(&gateway), before);

    gateway.stop().await;
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_requests() {
    let slow = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(800)).await;
        (200, "drained".to_string())
    })
    .await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/slow", "backend_target": format!("http://{}", slow) },
    ]))
    .await;
    let addr = gateway.addr;

    let in_flight = tokio::spawn(client().get(gateway.url("/slow")).send());
    tokio::time::sleep(Duration::from_millis(200)).await;

    gateway.stop().await;

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "drained");

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_backend_status_passes_through() {
    let backend = common::start_programmable_backend(|| async { (503, "busy".to_string()) }).await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        { "path_prefix": "/", "backend_target": format!("http://{}", backend) },
    ]))
    .await;

    let res = client().get(gateway.url("/anything")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "busy");

    gateway.stop().await;
}

#[tokio::test]
async fn test_rewrites_strip_prefix_and_request_id() {
    let backend = common::start_mock_backend("v2").await;
    let (gateway, _plane, _cache) = gateway_with_routes(json!([
        {
            "name": "users-v2",
            "path_prefix": "/users",
            "backend_target": format!("http://{}/v2", backend),
            "strip_prefix": true,
            "header_rewrites": {
                "inbound": { "x-gateway": "edge" },
                "outbound": { "server": "", "x-served-by": "edge-gateway" }
            }
        },
    ]))
    .await;
    let http = client();

    let res = http
        .get(gateway.url("/users/42"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let headers = res.headers().clone();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-seen-request-id"], "req-123");
    assert_eq!(headers["x-seen-gateway"], "edge");
    assert_eq!(headers["x-seen-forwarded-for"], "127.0.0.1");
    assert_eq!(headers["x-served-by"], "edge-gateway");
    assert!(!headers.contains_key("server"));
    assert_eq!(res.text().await.unwrap(), "v2 /v2/42");

    // A request without an ID gets a generated one
    let res = http.get(gateway.url("/users")).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(generated.len(), 36);
    assert_eq!(res.headers()["x-seen-request-id"], generated.as_str());

    gateway.stop().await;
}
