//! Application settings.
//!
//! Settings are loaded once at startup and merged over hard-coded defaults so
//! fields added in later versions are backfilled on old snapshots. Every
//! mutation is persisted synchronously by the storage adapter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::personas::DEFAULT_PERSONA_ID;

/// Model id used when no selection has been stored.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash-exp";

/// User-tunable application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Id of the currently active persona.
    pub active_persona_id: String,
    /// Remote model identifier used for new sessions.
    pub selected_model: String,
    /// Per-persona replacement instruction text, keyed by persona id.
    pub custom_persona_instructions: HashMap<String, String>,
    /// Whether completed AI responses are spoken aloud automatically.
    pub auto_play_tts: bool,
    /// Optional cloud-session correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_cloud_session_id: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            active_persona_id: DEFAULT_PERSONA_ID.to_owned(),
            selected_model: DEFAULT_MODEL_ID.to_owned(),
            custom_persona_instructions: HashMap::new(),
            auto_play_tts: false,
            current_cloud_session_id: None,
        }
    }
}
