//! Streaming chat client for the remote generative-language API.

pub mod client;
pub mod events;
pub mod sse;

pub use client::{GEMINI_API_BASE, GeminiClient, HistoryEntry, HistoryRole, replay_history};
pub use events::{ChatEvent, ChatEventStream, StreamErrorKind};

use crate::transcript::{AudioAttachment, ImageAttachment, Message};

/// Seam between the conversation controller and the chat implementation.
///
/// The controller owns a boxed backend so tests can substitute a scripted
/// one without a network.
pub trait ChatBackend: Send + Sync {
    /// Opens a fresh session scoped to `(model_id, system_instruction)`,
    /// replaying the given transcript as history.
    fn initialize_session(&self, model_id: &str, system_instruction: &str, history: &[Message]);

    /// Sends one user turn and returns its event stream.
    fn send_stream(
        &self,
        user_text: &str,
        image: Option<&ImageAttachment>,
        audio: Option<&AudioAttachment>,
    ) -> ChatEventStream;
}

impl ChatBackend for GeminiClient {
    fn initialize_session(&self, model_id: &str, system_instruction: &str, history: &[Message]) {
        GeminiClient::initialize_session(self, model_id, system_instruction, history);
    }

    fn send_stream(
        &self,
        user_text: &str,
        image: Option<&ImageAttachment>,
        audio: Option<&AudioAttachment>,
    ) -> ChatEventStream {
        GeminiClient::send_stream(self, user_text, image, audio)
    }
}
