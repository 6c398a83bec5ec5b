//! API credential resolution.
//!
//! The Gemini key comes from one of two places, checked in order:
//!
//! 1. The `GEMINI_API_KEY` environment variable (ignored when blank or left
//!    at the `your_api_key_here` placeholder).
//! 2. The opaque key stored by the [`LocalStore`](crate::storage::LocalStore).
//!
//! Resolution never fails; an unconfigured key is an ordinary state surfaced
//! through [`ApiKeyStatus`] and reported again on the next send attempt.

use crate::storage::LocalStore;

/// Environment variable consulted before stored credentials.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

const PLACEHOLDER_KEY: &str = "your_api_key_here";

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Stored,
}

/// Result of a credential status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub source: Option<KeySource>,
    /// Human-readable status line for startup toasts.
    pub message: String,
}

/// Resolves credentials from the environment and local storage.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    store: LocalStore,
}

impl CredentialResolver {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Returns the effective API key, or `None` when unconfigured.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = env_key() {
            return Some(key);
        }
        self.store.load_api_key()
    }

    /// Reports whether a key is configured and where it came from.
    #[must_use]
    pub fn status(&self) -> ApiKeyStatus {
        if env_key().is_some() {
            return ApiKeyStatus {
                configured: true,
                source: Some(KeySource::Environment),
                message: "Gemini API key is configured.".to_owned(),
            };
        }
        if self.store.load_api_key().is_some() {
            return ApiKeyStatus {
                configured: true,
                source: Some(KeySource::Stored),
                message: "Gemini API key is configured.".to_owned(),
            };
        }
        ApiKeyStatus {
            configured: false,
            source: None,
            message: "Gemini API key is not configured.".to_owned(),
        }
    }

    /// Stores a key for future sessions.
    pub fn store_key(&self, key: &str) {
        self.store.save_api_key(key);
    }
}

fn env_key() -> Option<String> {
    let value = std::env::var(API_KEY_ENV_VAR).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER_KEY {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
