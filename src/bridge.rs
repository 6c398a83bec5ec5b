//! MuseScore command bridge client.
//!
//! User input starting with the `/ms ` prefix is routed here instead of the
//! chat model. The bridge endpoint accepts either a free-form prompt or a
//! structured command and replies with a tri-state status. Bridge failures
//! are reported inline in the placeholder message and as a toast, kept
//! distinct from main chat errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AssemblyError, Result};

/// Reserved prefix that diverts input to the bridge.
pub const BRIDGE_COMMAND_PREFIX: &str = "/ms ";

/// A structured command for the bridge endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Request body for `POST /musescore-command`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<StructuredCommand>,
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl BridgeRequest {
    /// A prompt-only request, as produced by `/ms <prompt>` input.
    #[must_use]
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Tri-state bridge outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Ok,
    Error,
    NotImplemented,
}

/// Echo of what the endpoint received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReceived {
    #[serde(rename = "hasPrompt")]
    pub has_prompt: bool,
    #[serde(rename = "hasCommand")]
    pub has_command: bool,
}

/// Response body from the bridge endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub status: BridgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<BridgeReceived>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl BridgeResponse {
    /// User-facing status line for the placeholder message.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self.status {
            BridgeStatus::NotImplemented => {
                "MuseScore bridge not yet implemented. Received your command shape.".to_owned()
            }
            BridgeStatus::Ok => "Command executed successfully.".to_owned(),
            BridgeStatus::Error => self
                .message
                .clone()
                .unwrap_or_else(|| "Error processing MuseScore command.".to_owned()),
        }
    }
}

/// Sends commands to the bridge endpoint.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn send_command(&self, request: BridgeRequest) -> Result<BridgeResponse>;
}

/// HTTP implementation over `POST {base}/musescore-command`.
#[derive(Debug, Clone)]
pub struct HttpBridgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBridgeClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BridgeClient for HttpBridgeClient {
    async fn send_command(&self, request: BridgeRequest) -> Result<BridgeResponse> {
        let url = format!("{}/musescore-command", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssemblyError::Bridge(format!("failed to contact endpoint: {e}")))?;

        response
            .json::<BridgeResponse>()
            .await
            .map_err(|e| AssemblyError::Bridge(format!("invalid bridge response: {e}")))
    }
}
