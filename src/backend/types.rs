//! Backend types: provider-neutral user identity, errors, and change events.
//!
//! Shared by the GoTrue HTTP client and the in-memory backend. The store only
//! ever sees these types, never a provider's wire format.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend message text that signals a sign-in against a nonexistent account.
///
/// Kept as a compatibility contract: any replacement backend must emit this
/// text (or the [`NO_ACCOUNT_CODE`] error code) for the sign-up fallback to run.
pub const NO_ACCOUNT_MESSAGE: &str = "Invalid login credentials";

/// Structured error code GoTrue attaches to [`NO_ACCOUNT_MESSAGE`].
pub const NO_ACCOUNT_CODE: &str = "invalid_credentials";

// =============================================================================
// USER
// =============================================================================

/// Identity record owned by the external auth backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form profile metadata. Sign-up stores the display name under `name`.
    #[serde(default = "empty_metadata")]
    pub user_metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl AuthUser {
    #[must_use]
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self { id, email: Some(email.into()), user_metadata: empty_metadata() }
    }

    /// Attach a display name to the profile metadata.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        if let serde_json::Value::Object(map) = &mut self.user_metadata {
            map.insert("name".into(), serde_json::Value::String(name.to_owned()));
        } else {
            self.user_metadata = serde_json::json!({ "name": name });
        }
        self
    }

    /// Display name from metadata (`name`, then `full_name`).
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        ["name", "full_name"]
            .iter()
            .find_map(|key| self.user_metadata.get(key).and_then(serde_json::Value::as_str))
            .filter(|name| !name.trim().is_empty())
    }
}

// =============================================================================
// ERROR
// =============================================================================

/// Failure reported by the auth backend.
///
/// Displays as the backend's message verbatim so it can be shown to the
/// operator without rewording.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Machine-readable code, when the backend supplies one.
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: None, code: None, message: message.into() }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Transport-level failure (connect, timeout, body read).
    #[must_use]
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::new(format!("auth request failed: {err}"))
    }

    /// Error for a sign-in against an account that does not exist.
    #[must_use]
    pub fn no_account() -> Self {
        Self::new(NO_ACCOUNT_MESSAGE).with_code(NO_ACCOUNT_CODE).with_status(400)
    }

    /// Whether this failure means "no matching account" and sign-up should be offered.
    ///
    /// The typed code wins when present; otherwise fall back to matching the
    /// message text.
    #[must_use]
    pub fn is_no_account(&self) -> bool {
        match self.code.as_deref() {
            Some(NO_ACCOUNT_CODE) => true,
            _ => self.message.contains(NO_ACCOUNT_MESSAGE),
        }
    }
}

// =============================================================================
// CHANGE EVENTS
// =============================================================================

/// Session change notification emitted by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    SignedIn(AuthUser),
    SignedOut,
    UserUpdated(AuthUser),
    TokenRefreshed(AuthUser),
}

impl AuthChange {
    /// The user carried by the event, if the session is still live.
    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn(user) | Self::UserUpdated(user) | Self::TokenRefreshed(user) => Some(user),
            Self::SignedOut => None,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
