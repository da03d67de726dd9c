//! Auth backend: contract for the external managed auth service.
//!
//! DESIGN
//! ======
//! The store never talks HTTP. It depends on the [`AuthBackend`] trait, which
//! is implemented by the GoTrue client for production and by
//! [`memory::MemoryBackend`] for offline runs and tests. Credential checks,
//! session issuance and token refresh all stay on the backend side.

pub mod gotrue;
pub mod memory;
pub mod types;

use tokio::sync::broadcast;

pub use types::{AuthChange, AuthUser, BackendError, NO_ACCOUNT_CODE, NO_ACCOUNT_MESSAGE};

/// Capacity of the change-notification channel each backend owns.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Operations the session store needs from an auth backend.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`]; a nonexistent account must satisfy
    /// [`BackendError::is_no_account`].
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser, BackendError>;

    /// Create an account with profile metadata attached.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the account cannot be created.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError>;

    /// Invalidate the current session. A session the backend no longer
    /// recognizes counts as already signed out.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend refuses or is unreachable.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Return the user of the current session, `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the session cannot be checked.
    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError>;

    /// Subscribe to session change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}
