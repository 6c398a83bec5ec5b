//! MuseScore bridge endpoint contract tests.

use assembly::bridge::{BridgeClient, BridgeRequest, BridgeStatus, HttpBridgeClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn prompt_command_posts_expected_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/musescore-command"))
        .and(body_partial_json(json!({"prompt": "add a coda"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "not_implemented",
            "received": {"hasPrompt": true, "hasCommand": false},
            "timestamp": "2025-05-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpBridgeClient::new(mock_server.uri());
    let response = client
        .send_command(BridgeRequest::prompt("add a coda"))
        .await
        .expect("bridge reachable");

    assert_eq!(response.status, BridgeStatus::NotImplemented);
    assert!(response.status_text().contains("not yet implemented"));
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/musescore-command"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "no score open",
        })))
        .mount(&mock_server)
        .await;

    let client = HttpBridgeClient::new(mock_server.uri());
    let response = client
        .send_command(BridgeRequest::prompt("set tempo"))
        .await
        .expect("bridge reachable");

    assert_eq!(response.status, BridgeStatus::Error);
    assert_eq!(response.status_text(), "no score open");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_bridge_error() {
    // Nothing is listening on this port.
    let client = HttpBridgeClient::new("http://127.0.0.1:1");
    let result = client.send_command(BridgeRequest::prompt("hi")).await;
    assert!(result.is_err());
}
