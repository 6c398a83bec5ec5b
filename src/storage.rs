//! Local persistence adapter.
//!
//! Mirrors the transcript, settings, and API credential to JSON files under
//! the data directory (`~/.assembly` by default). All operations are
//! synchronous and best-effort: a read or write failure is logged and treated
//! as "no data" so the rest of the system degrades to defaults instead of
//! crashing on corrupt or missing storage.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::AppSettings;
use crate::transcript::Message;

const TRANSCRIPT_FILE: &str = "transcript.json";
const SETTINGS_FILE: &str = "settings.json";
const API_KEY_FILE: &str = "api_key";

/// File-backed store for per-user chat state.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Creates a store rooted at an explicit directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store at the platform default location (`~/.assembly`).
    #[must_use]
    pub fn at_default_location() -> Self {
        let root = dirs::home_dir()
            .map_or_else(|| PathBuf::from("/tmp/.assembly"), |h| h.join(".assembly"));
        Self::new(root)
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshots the whole transcript. Failures are logged and swallowed.
    pub fn save_transcript(&self, messages: &[Message]) {
        self.write_json(TRANSCRIPT_FILE, messages);
    }

    /// Loads the transcript snapshot, or `None` when absent or unreadable.
    #[must_use]
    pub fn load_transcript(&self) -> Option<Vec<Message>> {
        self.read_json(TRANSCRIPT_FILE)
    }

    /// Removes the transcript snapshot.
    pub fn clear_transcript(&self) {
        let path = self.root.join(TRANSCRIPT_FILE);
        if path.exists()
            && let Err(e) = std::fs::remove_file(&path)
        {
            warn!("failed to clear transcript snapshot: {e}");
        }
    }

    /// Persists settings synchronously. Failures are logged and swallowed.
    pub fn save_settings(&self, settings: &AppSettings) {
        self.write_json(SETTINGS_FILE, settings);
    }

    /// Loads settings, merging the stored snapshot over hard-coded defaults.
    ///
    /// Missing file, unreadable file, and invalid JSON all yield defaults.
    #[must_use]
    pub fn load_settings(&self) -> AppSettings {
        self.read_json(SETTINGS_FILE).unwrap_or_default()
    }

    /// Stores the opaque API credential.
    pub fn save_api_key(&self, key: &str) {
        if let Err(e) = self.ensure_root() {
            warn!("failed to create data directory: {e}");
            return;
        }
        if let Err(e) = std::fs::write(self.root.join(API_KEY_FILE), key) {
            warn!("failed to store API key: {e}");
        }
    }

    /// Loads the stored API credential, trimmed. `None` when absent or blank.
    #[must_use]
    pub fn load_api_key(&self) -> Option<String> {
        let raw = std::fs::read_to_string(self.root.join(API_KEY_FILE)).ok()?;
        let key = raw.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_owned())
        }
    }

    fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, file: &str, value: &T) {
        if let Err(e) = self.ensure_root() {
            warn!("failed to create data directory: {e}");
            return;
        }
        let json = match serde_json::to_vec_pretty(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize {file}: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(self.root.join(file), json) {
            warn!("failed to write {file}: {e}");
        } else {
            debug!("saved {file}");
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.root.join(file);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to read {file}: {e}");
                }
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring corrupt {file}: {e}");
                None
            }
        }
    }
}
