//! Ephemeral UI notifications.
//!
//! Toasts are a bounded, self-expiring set; they are never persisted. The
//! presentation layer drains expired entries on its own cadence via
//! [`ToastTray::expire`].

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Default time-to-live for a toast.
pub const DEFAULT_TOAST_TTL_MS: i64 = 5_000;

/// Severity class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// One transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub kind: ToastKind,
    pub expires_at: DateTime<Utc>,
}

/// Holds live toasts and drops them as their TTL elapses.
#[derive(Debug, Default)]
pub struct ToastTray {
    toasts: Vec<Toast>,
}

impl ToastTray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a toast with the default TTL.
    pub fn push(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.push_with_ttl(message, kind, DEFAULT_TOAST_TTL_MS);
    }

    /// Adds a toast with an explicit TTL in milliseconds.
    pub fn push_with_ttl(&mut self, message: impl Into<String>, kind: ToastKind, ttl_ms: i64) {
        self.toasts.push(Toast {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
            expires_at: Utc::now() + Duration::milliseconds(ttl_ms),
        });
    }

    /// Removes a toast by id (user dismissal).
    pub fn dismiss(&mut self, id: Uuid) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Drops expired toasts as of `now`.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    /// Live toasts in insertion order.
    #[must_use]
    pub fn active(&self) -> &[Toast] {
        &self.toasts
    }
}
