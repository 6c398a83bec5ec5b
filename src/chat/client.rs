//! Streaming chat client for the Gemini generative-language API.
//!
//! Owns the single logical conversation with the remote model: session
//! lifecycle, history replay, outbound request construction, and inbound
//! chunk delivery. The remote API is stateless, so the "session" is the
//! locally held `(model, system instruction, replay history)` triple; each
//! send posts the full history to `streamGenerateContent?alt=sse` and parses
//! the SSE fragment stream.
//!
//! The client performs no retries and surfaces every failure as a single
//! terminal [`ChatEvent::Failed`]; retry policy belongs to the caller.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::chat::events::{ChatEvent, ChatEventStream, StreamErrorKind};
use crate::chat::sse::SseDataParser;
use crate::credentials::CredentialResolver;
use crate::transcript::{AudioAttachment, ImageAttachment, Message, Sender};

/// Production endpoint for the generative-language API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Role labels in the remote API's two-role history format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Model,
}

impl HistoryRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One replayed turn in the session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub text: String,
}

/// Maps transcript messages to the remote history format, excluding error
/// messages and empty bodies.
#[must_use]
pub fn replay_history(messages: &[Message]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .filter(|m| m.is_replayable())
        .map(|m| HistoryEntry {
            role: match m.sender {
                Sender::User => HistoryRole::User,
                Sender::Ai => HistoryRole::Model,
            },
            text: m.text.clone(),
        })
        .collect()
}

/// Session state bound to exactly one `(model, system instruction)` pair.
#[derive(Debug, Clone)]
struct Session {
    model_id: String,
    system_instruction: String,
    history: Vec<HistoryEntry>,
}

/// Client-held conversation state. At most one session exists at a time.
#[derive(Debug)]
struct ClientState {
    session: Option<Session>,
    /// Last requested model/instruction, kept for lazy reinitialization.
    last_model: String,
    last_instruction: String,
}

/// Streaming chat client.
///
/// Owned by the conversation controller and injected explicitly; holds no
/// global state, so tests can run independent instances side by side.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialResolver,
    state: Arc<Mutex<ClientState>>,
}

impl GeminiClient {
    /// Creates a client against the production endpoint.
    #[must_use]
    pub fn new(credentials: CredentialResolver) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GEMINI_API_BASE.to_owned(),
            credentials,
            state: Arc::new(Mutex::new(ClientState {
                session: None,
                last_model: crate::config::DEFAULT_MODEL_ID.to_owned(),
                last_instruction: String::new(),
            })),
        }
    }

    /// Overrides the endpoint base URL (used by contract tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Discards any existing session and opens a new one scoped to
    /// `(model_id, system_instruction)`, replaying the given transcript as
    /// history (error and empty messages excluded).
    ///
    /// A missing credential leaves the session uninitialized; it is not an
    /// error here, and the next send reports it. The requested model and
    /// instruction are remembered either way.
    pub fn initialize_session(
        &self,
        model_id: &str,
        system_instruction: &str,
        history_messages: &[Message],
    ) {
        let mut state = self.lock_state();
        state.last_model = model_id.to_owned();
        state.last_instruction = system_instruction.to_owned();

        if self.credentials.api_key().is_none() {
            warn!("session not initialized: no API key configured");
            state.session = None;
            return;
        }

        let history = replay_history(history_messages);
        info!(
            model = model_id,
            history_len = history.len(),
            "chat session initialized"
        );
        state.session = Some(Session {
            model_id: model_id.to_owned(),
            system_instruction: system_instruction.to_owned(),
            history,
        });
    }

    /// Whether a session is currently open.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.lock_state().session.is_some()
    }

    /// The current session's replay history (for inspection and tests).
    #[must_use]
    pub fn session_history(&self) -> Vec<HistoryEntry> {
        self.lock_state()
            .session
            .as_ref()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Sends a multi-part user turn and returns the event stream.
    ///
    /// Yields one [`ChatEvent::Chunk`] per inbound fragment in arrival order,
    /// then exactly one [`ChatEvent::Completed`]; on failure a single
    /// [`ChatEvent::Failed`] terminates the stream instead. Fails fast when
    /// no credential is configured or all parts would be empty. An absent
    /// session is lazily reopened with the last known model and instruction
    /// and empty history.
    pub fn send_stream(
        &self,
        user_text: &str,
        image: Option<&ImageAttachment>,
        audio: Option<&AudioAttachment>,
    ) -> ChatEventStream {
        let Some(key) = self.credentials.api_key() else {
            return fail_fast(
                StreamErrorKind::MissingKey,
                "API key not configured. Please add your Gemini API key in settings.",
            );
        };

        let parts = build_parts(user_text, image, audio);
        if parts.is_empty() {
            return fail_fast(StreamErrorKind::Other, "No content to send");
        }

        let (body, model_id) = {
            let mut state = self.lock_state();
            if state.session.is_none() {
                let model = state.last_model.clone();
                let instruction = state.last_instruction.clone();
                info!(model = %model, "lazily reopening chat session with empty history");
                state.session = Some(Session {
                    model_id: model,
                    system_instruction: instruction,
                    history: Vec::new(),
                });
            }
            // Session is always present after the lazy init above.
            let Some(session) = state.session.as_ref() else {
                return fail_fast(StreamErrorKind::Other, "Failed to initialize chat session");
            };
            (build_request_body(session, &parts), session.model_id.clone())
        };

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model_id, key
        );
        let http = self.http.clone();
        let state = Arc::clone(&self.state);
        let user_text = user_text.trim().to_owned();

        Box::pin(async_stream::stream! {
            let response = match http.post(&url).json(&body).send().await {
                Ok(response) => response,
                Err(e) => {
                    yield ChatEvent::Failed {
                        kind: StreamErrorKind::Other,
                        message: format!("Error: {e}"),
                    };
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body_text = response.text().await.unwrap_or_default();
                let (kind, message) = classify_failure(status.as_u16(), &body_text);
                yield ChatEvent::Failed { kind, message };
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut parser = SseDataParser::new();
            let mut reply = String::new();

            use futures_util::StreamExt;
            loop {
                let payloads = match byte_stream.next().await {
                    Some(Ok(chunk)) => parser.push(&chunk),
                    Some(Err(e)) => {
                        yield ChatEvent::Failed {
                            kind: StreamErrorKind::Other,
                            message: format!("Error: stream read failed: {e}"),
                        };
                        return;
                    }
                    None => {
                        let mut trailing = Vec::new();
                        if let Some(payload) = parser.flush() {
                            trailing.push(payload);
                        }
                        for payload in trailing {
                            match parse_fragment(&payload) {
                                Fragment::Text(text) => {
                                    reply.push_str(&text);
                                    yield ChatEvent::Chunk(text);
                                }
                                Fragment::SafetyBlocked => {
                                    yield safety_failed();
                                    return;
                                }
                                Fragment::Empty => {}
                            }
                        }
                        break;
                    }
                };

                for payload in payloads {
                    match parse_fragment(&payload) {
                        Fragment::Text(text) => {
                            reply.push_str(&text);
                            yield ChatEvent::Chunk(text);
                        }
                        Fragment::SafetyBlocked => {
                            yield safety_failed();
                            return;
                        }
                        Fragment::Empty => {}
                    }
                }
            }

            // Record the exchanged turn so the next send carries context.
            {
                let mut state = match state.lock() {
                    Ok(state) => state,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(session) = state.session.as_mut() {
                    if !user_text.is_empty() {
                        session.history.push(HistoryEntry {
                            role: HistoryRole::User,
                            text: user_text,
                        });
                    }
                    if !reply.is_empty() {
                        session.history.push(HistoryEntry {
                            role: HistoryRole::Model,
                            text: reply,
                        });
                    }
                }
            }

            yield ChatEvent::Completed;
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A stream that fails immediately with a single definitive error.
fn fail_fast(kind: StreamErrorKind, message: &str) -> ChatEventStream {
    let event = ChatEvent::Failed {
        kind,
        message: message.to_owned(),
    };
    Box::pin(futures_util::stream::iter(vec![event]))
}

fn safety_failed() -> ChatEvent {
    ChatEvent::Failed {
        kind: StreamErrorKind::SafetyBlocked,
        message: "Response blocked by safety filters. Try rephrasing your message.".to_owned(),
    }
}

/// Builds the multi-part payload for one user turn. Absent parts are omitted.
fn build_parts(
    user_text: &str,
    image: Option<&ImageAttachment>,
    audio: Option<&AudioAttachment>,
) -> Vec<Value> {
    let mut parts = Vec::new();

    let text = user_text.trim();
    if !text.is_empty() {
        parts.push(json!({ "text": text }));
    }

    if let Some(image) = image {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": image.data_base64,
            }
        }));
    }

    if let Some(audio) = audio
        && let Some(payload) = audio.base64_payload()
    {
        parts.push(json!({
            "inlineData": {
                "mimeType": audio.mime_type,
                "data": payload,
            }
        }));
    }

    parts
}

/// Builds the full request body: system instruction, replayed history, and
/// the new user turn.
fn build_request_body(session: &Session, new_parts: &[Value]) -> Value {
    let mut contents: Vec<Value> = session
        .history
        .iter()
        .map(|entry| {
            json!({
                "role": entry.role.as_str(),
                "parts": [{ "text": entry.text }],
            })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": new_parts }));

    let mut body = json!({ "contents": contents });
    let instruction = session.system_instruction.trim();
    if !instruction.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    body
}

/// Outcome of parsing one SSE fragment.
#[derive(Debug, PartialEq, Eq)]
enum Fragment {
    Text(String),
    SafetyBlocked,
    Empty,
}

/// Extracts the text delta from a fragment payload, detecting safety blocks.
fn parse_fragment(payload: &str) -> Fragment {
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return Fragment::Empty;
    };

    if value
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
        .is_some()
    {
        return Fragment::SafetyBlocked;
    }

    let candidate = &value["candidates"][0];
    if candidate.get("finishReason").and_then(Value::as_str) == Some("SAFETY") {
        return Fragment::SafetyBlocked;
    }

    let mut text = String::new();
    if let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) {
        for part in parts {
            if let Some(fragment) = part.get("text").and_then(Value::as_str) {
                text.push_str(fragment);
            }
        }
    }

    if text.is_empty() {
        Fragment::Empty
    } else {
        Fragment::Text(text)
    }
}

/// Maps an HTTP failure to the error taxonomy.
fn classify_failure(status: u16, body: &str) -> (StreamErrorKind, String) {
    let message = extract_error_message(body);

    if message.contains("API_KEY_INVALID") || message.contains("API key") || status == 401 {
        return (
            StreamErrorKind::InvalidKey,
            "Invalid API key. Please check your Gemini API key in settings.".to_owned(),
        );
    }
    if status == 429 || message.contains("RESOURCE_EXHAUSTED") || message.contains("quota") {
        return (
            StreamErrorKind::QuotaExhausted,
            "API quota exceeded. Please try again later or check your API limits.".to_owned(),
        );
    }
    if message.contains("SAFETY") {
        return (
            StreamErrorKind::SafetyBlocked,
            "Response blocked by safety filters. Try rephrasing your message.".to_owned(),
        );
    }
    (StreamErrorKind::Other, format!("Error: {message}"))
}

/// Pulls `error.message` out of an API error body, falling back to the raw
/// body text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Unknown error occurred".to_owned()
            } else {
                body.trim().to_owned()
            }
        })
}
