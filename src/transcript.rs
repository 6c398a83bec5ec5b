//! Message and transcript types.
//!
//! The transcript is an append-only, finite ordered sequence of [`Message`]s,
//! owned exclusively by the [`Controller`](crate::controller::Controller) and
//! persisted as a whole snapshot by the storage adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::personas::{ERROR_BUBBLE_STYLE, Persona};

/// Inline SVG data URL used as the user's avatar.
pub const USER_AVATAR: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAyNCAyNCIgZmlsbD0iY3VycmVudENvbG9yIj48cGF0aCBkPSJNMTIgMTJjMi4yMSAwIDQtMS43OSA0LTRzLTEuNzktNC00LTQtNCAxLjc5LTQgNCAxLjc5IDQgNCA0em0wIDJjLTIuNjcgMC04IDEuMzQtOCA0djJoMTZ2LTJjMC0yLjY2LTUuMzMtNC04LTR6Ii8+PC9zdmc+";

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// An image attached to a user message, sent inline to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64-encoded image bytes (no data-URL prefix).
    pub data_base64: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// An audio clip attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAttachment {
    /// Full `data:` URL as captured by the recorder.
    pub data_url: String,
    pub mime_type: String,
}

impl AudioAttachment {
    /// Extracts the raw base64 payload from the data URL, if present.
    #[must_use]
    pub fn base64_payload(&self) -> Option<&str> {
        let (_, payload) = self.data_url.split_once(',')?;
        if payload.is_empty() { None } else { Some(payload) }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Display avatar reference at the time the message was created.
    pub avatar: String,
    /// Display name at the time the message was created.
    pub name: String,
    /// Rendering style tag for AI bubbles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_style: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioAttachment>,
}

impl Message {
    /// Creates a user message, optionally carrying attachments.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            avatar: USER_AVATAR.to_owned(),
            name: "You".to_owned(),
            bubble_style: None,
            is_error: false,
            image: None,
            audio: None,
        }
    }

    /// Creates an AI message attributed to the given persona.
    #[must_use]
    pub fn assistant(persona: &Persona, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Ai,
            text: text.into(),
            timestamp: Utc::now(),
            avatar: persona.avatar_path.to_owned(),
            name: persona.name.to_owned(),
            bubble_style: Some(persona.color.to_owned()),
            is_error: false,
            image: None,
            audio: None,
        }
    }

    /// Creates an AI error message attributed to the given persona.
    #[must_use]
    pub fn assistant_error(persona: &Persona, text: impl Into<String>) -> Self {
        let mut msg = Self::assistant(persona, text);
        msg.is_error = true;
        msg.bubble_style = Some(ERROR_BUBBLE_STYLE.to_owned());
        msg
    }

    /// Attaches an image.
    #[must_use]
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Attaches an audio clip.
    #[must_use]
    pub fn with_audio(mut self, audio: AudioAttachment) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Flips the message into its error presentation.
    pub fn mark_error(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.is_error = true;
        self.bubble_style = Some(ERROR_BUBBLE_STYLE.to_owned());
    }

    /// Whether this message should be replayed as session history.
    ///
    /// Error bubbles and empty bodies are excluded.
    #[must_use]
    pub fn is_replayable(&self) -> bool {
        !self.is_error && !self.text.trim().is_empty()
    }
}

/// The welcome message shown on a fresh transcript.
#[must_use]
pub fn welcome_message(persona: &Persona) -> Message {
    Message::assistant(
        persona,
        format!(
            "**♠️🌿🎸🧵 G.MUSIC ASSEMBLY MODE ACTIVE**\n\nWelcome! **{}** here.\n\n{}\n\n*{}*\n\nHow can the Assembly assist you today?",
            persona.name, persona.description, persona.role
        ),
    )
}

/// Re-binds loaded AI messages to the active persona's display identity.
///
/// Avatars, names, and bubble styles are denormalized into the snapshot, so a
/// transcript restored under a different active persona would otherwise show
/// stale attribution. Error styling is preserved.
pub fn rebind_to_persona(messages: &mut [Message], persona: &Persona) {
    for msg in messages.iter_mut().filter(|m| m.sender == Sender::Ai) {
        msg.avatar = persona.avatar_path.to_owned();
        msg.name = persona.name.to_owned();
        msg.bubble_style = Some(if msg.is_error {
            ERROR_BUBBLE_STYLE.to_owned()
        } else {
            persona.color.to_owned()
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::personas::persona_by_id;

    #[test]
    fn user_message_has_user_identity() {
        let msg = Message::user("hello");
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.name, "You");
        assert!(!msg.is_error);
    }

    #[test]
    fn assistant_message_carries_persona_style() {
        let persona = persona_by_id(Some("aureon"));
        let msg = Message::assistant(persona, "hi");
        assert_eq!(msg.bubble_style.as_deref(), Some("bg-green-500"));
        assert_eq!(msg.name, persona.name);
    }

    #[test]
    fn error_message_uses_error_style() {
        let persona = persona_by_id(None);
        let msg = Message::assistant_error(persona, "boom");
        assert!(msg.is_error);
        assert_eq!(msg.bubble_style.as_deref(), Some(ERROR_BUBBLE_STYLE));
    }

    #[test]
    fn replayable_excludes_errors_and_blank_text() {
        let persona = persona_by_id(None);
        assert!(Message::user("hi").is_replayable());
        assert!(!Message::user("   ").is_replayable());
        assert!(!Message::assistant_error(persona, "err").is_replayable());
    }

    #[test]
    fn audio_payload_extraction() {
        let audio = AudioAttachment {
            data_url: "data:audio/webm;base64,QUJD".to_owned(),
            mime_type: "audio/webm".to_owned(),
        };
        assert_eq!(audio.base64_payload(), Some("QUJD"));

        let empty = AudioAttachment {
            data_url: "data:audio/webm;base64,".to_owned(),
            mime_type: "audio/webm".to_owned(),
        };
        assert!(empty.base64_payload().is_none());
    }

    #[test]
    fn snapshot_round_trip() {
        let persona = persona_by_id(Some("synth"));
        let messages = vec![
            Message::user("question").with_image(ImageAttachment {
                data_base64: "aGk=".to_owned(),
                mime_type: "image/png".to_owned(),
                file_name: Some("shot.png".to_owned()),
            }),
            Message::assistant(persona, "answer"),
        ];
        let json = serde_json::to_string(&messages).unwrap();
        let restored: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, messages);
    }

    #[test]
    fn rebind_updates_ai_messages_only() {
        let jerry = persona_by_id(Some("jerry"));
        let nyro = persona_by_id(Some("nyro"));
        let mut messages = vec![
            Message::user("q"),
            Message::assistant(jerry, "a"),
            Message::assistant_error(jerry, "e"),
        ];
        rebind_to_persona(&mut messages, nyro);

        assert_eq!(messages[0].name, "You");
        assert_eq!(messages[1].name, nyro.name);
        assert_eq!(messages[1].bubble_style.as_deref(), Some(nyro.color));
        // Error styling is preserved through rebinding.
        assert_eq!(
            messages[2].bubble_style.as_deref(),
            Some(ERROR_BUBBLE_STYLE)
        );
    }
}
