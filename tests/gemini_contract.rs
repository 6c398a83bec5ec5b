//! Gemini streaming contract tests.
//!
//! Verify the exact HTTP format of `streamGenerateContent?alt=sse` requests,
//! SSE fragment parsing, error classification, and the fail-fast paths that
//! never touch the network.

use assembly::chat::{ChatEvent, StreamErrorKind};
use assembly::personas::persona_by_id;
use assembly::transcript::Message;
use assembly::{CredentialResolver, GeminiClient, LocalStore};
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/v1beta/models/gemini-2.0-flash-exp:streamGenerateContent";

/// The env var would override the stored test key; tests that depend on the
/// key value (or its absence) clear it. No test in this process sets it.
fn clear_env_key() {
    unsafe { std::env::remove_var("GEMINI_API_KEY") };
}

fn client_with_key(base_url: &str) -> (tempfile::TempDir, GeminiClient) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalStore::new(dir.path());
    store.save_api_key("test-key");
    let client =
        GeminiClient::new(CredentialResolver::new(store)).with_base_url(base_url.to_owned());
    (dir, client)
}

async fn collect_events(client: &GeminiClient, text: &str) -> Vec<ChatEvent> {
    client.send_stream(text, None, None).collect().await
}

fn sse_chunk(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"candidates":[{"content":{"parts":[{"text": text}]}}]})
    )
}

#[tokio::test]
async fn streams_chunks_in_order_then_completes_once() {
    let mock_server = MockServer::start().await;

    let body = [sse_chunk("Hel"), sse_chunk("lo, "), sse_chunk("world!")].concat();
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("alt", "sse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let events = collect_events(&client, "greet me").await;

    assert_eq!(
        events,
        vec![
            ChatEvent::Chunk("Hel".to_owned()),
            ChatEvent::Chunk("lo, ".to_owned()),
            ChatEvent::Chunk("world!".to_owned()),
            ChatEvent::Completed,
        ]
    );
}

#[tokio::test]
async fn request_replays_history_and_system_instruction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "first"}]},
                {"role": "model", "parts": [{"text": "second"}]},
                {"role": "user", "parts": [{"text": "third"}]},
            ],
            "systemInstruction": {"parts": [{"text": "Answer briefly."}]},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_chunk("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let persona = persona_by_id(None);
    // Error and blank messages must be filtered out of the replay.
    let history = vec![
        Message::user("first"),
        Message::assistant(persona, "second"),
        Message::assistant_error(persona, "transient failure"),
        Message::user("   "),
    ];
    client.initialize_session("gemini-2.0-flash-exp", "Answer briefly.", &history);

    let events = collect_events(&client, "third").await;
    assert!(matches!(events.last(), Some(ChatEvent::Completed)));
}

#[tokio::test]
async fn credential_is_sent_as_query_parameter() {
    clear_env_key();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_chunk("hi")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let events = collect_events(&client, "hello").await;
    assert!(matches!(events.last(), Some(ChatEvent::Completed)));
}

#[tokio::test]
async fn unauthenticated_send_fails_fast_without_network() {
    clear_env_key();
    let mock_server = MockServer::start().await;

    // Any request reaching the server is a contract violation.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let client = GeminiClient::new(CredentialResolver::new(LocalStore::new(dir.path())))
        .with_base_url(mock_server.uri());

    let events = collect_events(&client, "hello").await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        ChatEvent::Failed { kind, message } => {
            assert_eq!(*kind, StreamErrorKind::MissingKey);
            assert!(message.contains("API key not configured"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_key_rejection_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#,
        ))
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let events = collect_events(&client, "hello").await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        ChatEvent::Failed { kind, .. } => assert_eq!(*kind, StreamErrorKind::InvalidKey),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn quota_exhaustion_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string(
            r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        ))
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let events = collect_events(&client, "hello").await;

    match &events[0] {
        ChatEvent::Failed { kind, message } => {
            assert_eq!(*kind, StreamErrorKind::QuotaExhausted);
            assert!(message.contains("quota"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn mid_stream_safety_block_terminates_the_stream() {
    let mock_server = MockServer::start().await;

    let body = format!(
        "{}data: {}\n\n",
        sse_chunk("partial"),
        json!({"promptFeedback":{"blockReason":"SAFETY"}})
    );
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    let events = collect_events(&client, "hm").await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ChatEvent::Chunk("partial".to_owned()));
    match &events[1] {
        ChatEvent::Failed { kind, .. } => {
            assert_eq!(*kind, StreamErrorKind::SafetyBlocked);
            assert!(!kind.is_definitive());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn completed_turn_is_recorded_as_session_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sse_chunk("the reply")))
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    client.initialize_session("gemini-2.0-flash-exp", "", &[]);

    let events = collect_events(&client, "the question").await;
    assert!(matches!(events.last(), Some(ChatEvent::Completed)));

    let history = client.session_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text, "the question");
    assert_eq!(history[1].text, "the reply");
}

#[tokio::test]
async fn failed_turn_leaves_history_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let (_dir, client) = client_with_key(&mock_server.uri());
    client.initialize_session("gemini-2.0-flash-exp", "", &[]);

    let events = collect_events(&client, "doomed").await;
    assert!(matches!(events.last(), Some(ChatEvent::Failed { .. })));
    assert!(client.session_history().is_empty());
}
