//! Conversation controller.
//!
//! Central coordinator between the transcript, settings, storage, the chat
//! backend, the MuseScore bridge, and speech playback. The controller owns
//! the transcript exclusively: every message append, placeholder update, and
//! error rewrite goes through it, and each change is snapshotted to the
//! local store.
//!
//! At most one send is in flight at a time; a send attempted while another
//! is active is rejected without touching the transcript.

use futures_util::StreamExt;
use tracing::{info, warn};

use crate::bridge::{BRIDGE_COMMAND_PREFIX, BridgeClient, BridgeRequest, BridgeStatus};
use crate::chat::{ChatBackend, ChatEvent};
use crate::config::AppSettings;
use crate::credentials::CredentialResolver;
use crate::personas::{ERROR_BUBBLE_STYLE, Persona, effective_instruction, persona_by_id};
use crate::speech::{SpeechPlayer, sanitize_text_for_speech};
use crate::storage::LocalStore;
use crate::toast::{ToastKind, ToastTray};
use crate::transcript::{
    AudioAttachment, ImageAttachment, Message, rebind_to_persona, welcome_message,
};

/// TTL for the startup credential warning.
const KEY_WARNING_TTL_MS: i64 = 10_000;

/// Lifecycle of the single in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestPhase {
    Idle,
    Sending,
    Streaming,
}

/// Terminal result of one [`Controller::send_message`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The response streamed to completion.
    Completed,
    /// The stream failed; the placeholder carries the error text.
    Failed { message: String },
    /// The input was routed to the MuseScore bridge.
    Bridge,
    /// The input was not sent at all.
    Rejected { reason: String },
}

/// Owns conversation state and coordinates all collaborators.
pub struct Controller {
    transcript: Vec<Message>,
    settings: AppSettings,
    store: LocalStore,
    credentials: CredentialResolver,
    client: Box<dyn ChatBackend>,
    bridge: Box<dyn BridgeClient>,
    speech: Box<dyn SpeechPlayer>,
    toasts: ToastTray,
    phase: RequestPhase,
}

impl Controller {
    /// Builds the controller and runs the startup sequence: load settings,
    /// restore (or seed) the transcript, re-bind restored messages to the
    /// active persona, warn about a missing credential, and open the chat
    /// session.
    #[must_use]
    pub fn new(
        store: LocalStore,
        credentials: CredentialResolver,
        client: Box<dyn ChatBackend>,
        bridge: Box<dyn BridgeClient>,
        speech: Box<dyn SpeechPlayer>,
    ) -> Self {
        let settings = store.load_settings();
        let persona = persona_by_id(Some(&settings.active_persona_id));

        let mut transcript = store.load_transcript().unwrap_or_default();
        if transcript.is_empty() {
            transcript.push(welcome_message(persona));
        } else {
            rebind_to_persona(&mut transcript, persona);
        }

        let mut toasts = ToastTray::new();
        let status = credentials.status();
        if !status.configured {
            toasts.push_with_ttl(
                format!(
                    "{} Please add your Gemini API key in settings.",
                    status.message
                ),
                ToastKind::Warning,
                KEY_WARNING_TTL_MS,
            );
        }

        let instruction = effective_instruction(persona.id, &settings.custom_persona_instructions);
        client.initialize_session(&settings.selected_model, &instruction, &transcript);
        store.save_transcript(&transcript);

        info!(
            persona = persona.id,
            model = %settings.selected_model,
            restored = transcript.len(),
            "controller started"
        );

        Self {
            transcript,
            settings,
            store,
            credentials,
            client,
            bridge,
            speech,
            toasts,
            phase: RequestPhase::Idle,
        }
    }

    /// The full transcript in order.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// The active persona.
    #[must_use]
    pub fn active_persona(&self) -> &'static Persona {
        persona_by_id(Some(&self.settings.active_persona_id))
    }

    /// Mutable access to the toast tray (for dismissal and expiry sweeps).
    pub fn toasts_mut(&mut self) -> &mut ToastTray {
        &mut self.toasts
    }

    /// Whether a request is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != RequestPhase::Idle
    }

    /// Snapshots the transcript. Used as a periodic safety net on top of the
    /// save-on-change writes.
    pub fn flush(&self) {
        self.store.save_transcript(&self.transcript);
    }

    /// Stores a new API credential and re-opens the session so the next send
    /// can use it.
    pub fn set_api_key(&mut self, key: &str) {
        self.credentials.store_key(key);
        self.reinitialize_session();
        self.toasts
            .push("Gemini API key saved.", ToastKind::Success);
    }

    /// Sends one user turn: appends it optimistically, routes `/ms ` input to
    /// the bridge, otherwise streams the model response into a placeholder
    /// message. `on_chunk` observes each text fragment as it lands.
    pub async fn send_message<F>(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
        audio: Option<AudioAttachment>,
        mut on_chunk: F,
    ) -> SendOutcome
    where
        F: FnMut(&str),
    {
        if self.is_busy() {
            let reason = "A request is already in progress.".to_owned();
            self.toasts.push(reason.clone(), ToastKind::Warning);
            return SendOutcome::Rejected { reason };
        }

        let trimmed = text.trim();
        if trimmed.is_empty() && image.is_none() && audio.is_none() {
            return SendOutcome::Rejected {
                reason: "Nothing to send.".to_owned(),
            };
        }

        let mut user = Message::user(trimmed);
        if let Some(image) = image.clone() {
            user = user.with_image(image);
        }
        if let Some(audio) = audio.clone() {
            user = user.with_audio(audio);
        }
        self.transcript.push(user);

        if let Some(prompt) = trimmed.strip_prefix(BRIDGE_COMMAND_PREFIX) {
            return self.send_bridge_command(prompt.trim().to_owned()).await;
        }

        let persona = self.active_persona();
        self.transcript.push(Message::assistant(persona, ""));
        let placeholder = self.transcript.len() - 1;
        self.flush();

        self.phase = RequestPhase::Sending;
        let mut stream = self
            .client
            .send_stream(trimmed, image.as_ref(), audio.as_ref());

        let mut outcome = SendOutcome::Completed;
        while let Some(event) = stream.next().await {
            match event {
                ChatEvent::Chunk(fragment) => {
                    self.phase = RequestPhase::Streaming;
                    on_chunk(&fragment);
                    self.transcript[placeholder].text.push_str(&fragment);
                    self.flush();
                }
                ChatEvent::Completed => {
                    let reply = self.transcript[placeholder].text.clone();
                    if self.settings.auto_play_tts && !reply.trim().is_empty() {
                        self.speech.speak(&sanitize_text_for_speech(&reply));
                    }
                    outcome = SendOutcome::Completed;
                    break;
                }
                ChatEvent::Failed { kind, message } => {
                    warn!(?kind, "chat stream failed: {message}");
                    let slot = &mut self.transcript[placeholder];
                    slot.text = message.clone();
                    slot.bubble_style = Some(ERROR_BUBBLE_STYLE.to_owned());
                    // Safety blocks are retryable with an edited message, so
                    // they are styled as errors without being replay-excluded
                    // forever.
                    slot.is_error = kind.is_definitive();
                    self.toasts.push(message.clone(), ToastKind::Error);
                    outcome = SendOutcome::Failed { message };
                    break;
                }
            }
        }

        self.phase = RequestPhase::Idle;
        self.flush();
        outcome
    }

    /// Switches the active persona. A no-op (with a notice) when the persona
    /// is already active; otherwise the session is rebuilt with the new
    /// instruction and the existing non-error history, and a system notice is
    /// appended to the transcript.
    pub fn change_persona(&mut self, persona_id: &str) {
        let persona = persona_by_id(Some(persona_id));
        if persona.id == self.settings.active_persona_id {
            self.toasts.push("Persona already active.", ToastKind::Info);
            return;
        }

        self.settings.active_persona_id = persona.id.to_owned();
        self.store.save_settings(&self.settings);
        self.reinitialize_session();

        let notice = Message::assistant(
            persona,
            format!(
                "**{}** is now active.\n\n{}\n\n*{}*",
                persona.name, persona.description, persona.role
            ),
        );
        if self.settings.auto_play_tts {
            self.speech
                .speak(&sanitize_text_for_speech(&notice.text));
        }
        self.transcript.push(notice);
        self.flush();

        info!(persona = persona.id, "persona changed");
        self.toasts.push(
            format!("Persona changed to {}.", persona.name),
            ToastKind::Info,
        );
    }

    /// Applies a full settings update. The session is rebuilt only when the
    /// selected model actually changed.
    pub fn apply_settings(&mut self, new_settings: AppSettings) {
        let model_changed = new_settings.selected_model != self.settings.selected_model;
        let instructions_changed =
            new_settings.custom_persona_instructions != self.settings.custom_persona_instructions;
        self.settings = new_settings;
        self.store.save_settings(&self.settings);

        if model_changed || instructions_changed {
            self.reinitialize_session();
            if model_changed {
                self.toasts.push(
                    format!("Model changed to {}.", self.settings.selected_model),
                    ToastKind::Info,
                );
            }
        }
        self.toasts
            .push("Settings saved successfully.", ToastKind::Success);
    }

    /// Convenience wrapper for a model-only change.
    pub fn change_model(&mut self, model_id: &str) {
        let mut settings = self.settings.clone();
        settings.selected_model = model_id.to_owned();
        self.apply_settings(settings);
    }

    /// Discards the transcript and starts over with a fresh welcome message
    /// and an empty session.
    pub fn reset_conversation(&mut self) {
        let persona = self.active_persona();
        self.transcript.clear();
        self.transcript.push(welcome_message(persona));
        self.store.clear_transcript();
        self.reinitialize_session();
        self.flush();
        self.toasts.push("Conversation cleared.", ToastKind::Info);
    }

    /// Routes a `/ms ` prompt to the bridge, reporting the outcome through
    /// the placeholder message and a toast.
    async fn send_bridge_command(&mut self, prompt: String) -> SendOutcome {
        let persona = self.active_persona();
        self.transcript
            .push(Message::assistant(persona, "Sending command to MuseScore..."));
        let placeholder = self.transcript.len() - 1;
        self.flush();

        self.phase = RequestPhase::Sending;
        let result = self.bridge.send_command(BridgeRequest::prompt(prompt)).await;
        self.phase = RequestPhase::Idle;

        match result {
            Ok(response) => {
                let text = format!("🪄 MuseScore: {}", response.status_text());
                match response.status {
                    BridgeStatus::Ok => {
                        self.transcript[placeholder].text = text;
                        self.toasts
                            .push("MuseScore command executed.", ToastKind::Success);
                    }
                    BridgeStatus::NotImplemented => {
                        self.transcript[placeholder].text = text;
                        self.toasts
                            .push("MuseScore bridge is not yet implemented.", ToastKind::Info);
                    }
                    BridgeStatus::Error => {
                        self.transcript[placeholder].mark_error(text);
                        self.toasts
                            .push(response.status_text(), ToastKind::Error);
                    }
                }
            }
            Err(e) => {
                warn!("bridge request failed: {e}");
                self.transcript[placeholder]
                    .mark_error(format!("🪄 MuseScore bridge error: {e}"));
                self.toasts
                    .push("Failed to reach the MuseScore bridge.", ToastKind::Error);
            }
        }

        self.flush();
        SendOutcome::Bridge
    }

    /// Rebuilds the chat session from current settings and the non-error
    /// transcript history.
    fn reinitialize_session(&mut self) {
        let persona = self.active_persona();
        let instruction =
            effective_instruction(persona.id, &self.settings.custom_persona_instructions);
        self.client.initialize_session(
            &self.settings.selected_model,
            &instruction,
            &self.transcript,
        );
    }
}
