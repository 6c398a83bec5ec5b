//! Assembly: persona chat front end for the Gemini streaming API.
//!
//! This crate provides the conversation core behind the Assembly chat
//! experience plus a small companion multi-agent demo server:
//!
//! - **Personas**: a fixed registry of named system-prompt configurations
//! - **Chat**: a streaming client for `streamGenerateContent?alt=sse`
//! - **Controller**: owns the transcript and coordinates sends, persona and
//!   model changes, the MuseScore bridge, and speech playback
//! - **Storage**: best-effort JSON snapshots under `~/.assembly`
//! - **Server**: REST + WebSocket fan-out of queries to canned agents

pub mod bridge;
pub mod chat;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod personas;
pub mod server;
pub mod speech;
pub mod storage;
pub mod toast;
pub mod transcript;

pub use chat::{ChatBackend, ChatEvent, ChatEventStream, GeminiClient, StreamErrorKind};
pub use config::AppSettings;
pub use controller::{Controller, SendOutcome};
pub use credentials::CredentialResolver;
pub use error::{AssemblyError, Result};
pub use personas::{Persona, all_personas, persona_by_id};
pub use storage::LocalStore;
pub use transcript::{Message, Sender};
