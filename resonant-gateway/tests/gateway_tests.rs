use resonant_gateway::{GatewayError, HttpGateway, ReqwestGateway};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timeout() -> Duration {
    Duration::from_secs(5)
}

// ── Buffered requests ───────────────────────────────────────────

#[tokio::test]
async fn post_json_returns_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/activate"))
        .and(body_json(serde_json::json!({"code": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let response = gateway
        .post_json(
            &format!("{}/activate", server.uri()),
            &serde_json::json!({"code": "abc"}),
            &[],
            timeout(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn post_json_forwards_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/activate"))
        .and(header("apikey", "secret"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let response = gateway
        .post_json(
            &format!("{}/activate", server.uri()),
            &serde_json::json!({}),
            &[
                ("apikey".to_string(), "secret".to_string()),
                ("Authorization".to_string(), "Bearer secret".to_string()),
            ],
            timeout(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn get_returns_error_statuses_as_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let response = gateway
        .get(&format!("{}/missing", server.uri()), &[], timeout())
        .await
        .unwrap();

    // non-2xx is data, not a transport error
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert_eq!(response.body, b"gone");
}

#[tokio::test]
async fn json_decode_failure_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let response = gateway
        .get(&format!("{}/garbage", server.uri()), &[], timeout())
        .await
        .unwrap();

    assert!(response.json::<serde_json::Value>().is_none());
}

// ── Error mapping ───────────────────────────────────────────────

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let result = gateway
        .get(
            &format!("{}/slow", server.uri()),
            &[],
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(result, Err(GatewayError::Timeout)));
}

#[tokio::test]
async fn unparseable_url_maps_to_invalid_url() {
    let gateway = ReqwestGateway::new().unwrap();
    let result = gateway.get("not a url", &[], timeout()).await;

    assert!(matches!(result, Err(GatewayError::InvalidUrl(_))));
}

#[tokio::test]
async fn unreachable_host_maps_to_network_error() {
    let gateway = ReqwestGateway::new().unwrap();
    // nothing listens on port 1
    let result = gateway.get("http://127.0.0.1:1/x", &[], timeout()).await;

    assert!(matches!(result, Err(GatewayError::Network(_))));
}

// ── Streaming ───────────────────────────────────────────────────

#[tokio::test]
async fn get_stream_yields_whole_body() {
    let server = MockServer::start().await;
    let payload = vec![7u8; 256 * 1024];

    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let mut streamed = gateway
        .get_stream(&format!("{}/blob", server.uri()), &[], timeout())
        .await
        .unwrap();

    assert_eq!(streamed.status, 200);
    assert_eq!(streamed.content_length, Some(payload.len() as u64));

    let mut collected = Vec::new();
    while let Some(chunk) = streamed.stream.next_chunk().await.unwrap() {
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(collected, payload);
}

#[tokio::test]
async fn get_stream_surfaces_http_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let streamed = gateway
        .get_stream(&format!("{}/forbidden", server.uri()), &[], timeout())
        .await
        .unwrap();

    assert_eq!(streamed.status, 403);
}

#[tokio::test]
async fn get_stream_slow_headers_time_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stall"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new().unwrap();
    let result = gateway
        .get_stream(
            &format!("{}/stall", server.uri()),
            &[],
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(result, Err(GatewayError::Timeout)));
}
