//! Streaming chat event model.
//!
//! [`GeminiClient::send_stream`](crate::chat::client::GeminiClient::send_stream)
//! yields a lazy, finite, non-restartable sequence of [`ChatEvent`]s:
//!
//! ```text
//! Chunk* → Completed
//! Chunk* → Failed          (at most one, terminal)
//! ```
//!
//! The controller applies chunks to the placeholder message in arrival order
//! and decides retry policy; the client never retries on its own.

use std::pin::Pin;

use futures_util::Stream;

/// Classification of a streaming failure, mirroring the error taxonomy of
/// the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// No credential configured; session unusable until the user adds one.
    MissingKey,
    /// Credential rejected by the API.
    InvalidKey,
    /// Quota or resource exhaustion; retry later, never automatically.
    QuotaExhausted,
    /// Content-safety rejection; the message itself may be edited and resent.
    SafetyBlocked,
    /// Anything else, carrying the raw failure text.
    Other,
}

impl StreamErrorKind {
    /// Definitive failures leave the request dead; only safety blocks are
    /// worth retrying with an edited message.
    #[must_use]
    pub fn is_definitive(self) -> bool {
        !matches!(self, Self::SafetyBlocked)
    }
}

/// One event in a streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// One incremental text fragment, in arrival order.
    Chunk(String),
    /// The stream finished; no further events follow.
    Completed,
    /// The stream failed; no further events follow.
    Failed {
        kind: StreamErrorKind,
        message: String,
    },
}

/// A boxed stream of chat events.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;
