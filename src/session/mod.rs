//! Session snapshot and the store that owns it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The snapshot is what route guards and user-aware widgets read. It is
//! published through a `watch` channel by [`SessionStore`]; nothing else
//! mutates it. No field is ever persisted locally: the backend owns the
//! durable session.

pub mod store;

pub use store::SessionStore;

use crate::backend::AuthUser;
use crate::error::SessionError;

/// Last operation attempted on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastAction {
    SignIn,
    SignUp,
    SignOut,
    FetchUser,
}

/// State-machine view of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    AwaitingName,
    Authenticated,
    Failed,
}

/// Authentication state for the current operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<AuthUser>,
    pub is_loading: bool,
    pub error: Option<SessionError>,
    /// The last sign-up was declined at the name prompt.
    pub cancelled: bool,
    pub last_action: Option<LastAction>,
    /// A name prompt is open and the flow is suspended on it.
    pub awaiting_name: bool,
}

impl Session {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            if self.awaiting_name { SessionPhase::AwaitingName } else { SessionPhase::Authenticating }
        } else if self.is_authenticated {
            SessionPhase::Authenticated
        } else if self.error.is_some() {
            SessionPhase::Failed
        } else {
            SessionPhase::Anonymous
        }
    }

    /// Display name for header widgets: profile name, then email.
    #[must_use]
    pub fn user_label(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.display_name().or(user.email.as_deref())
    }

    /// Error text suitable for inline display, skipping user cancellation.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .filter(|e| !e.is_cancelled())
            .map(ToString::to_string)
    }

    fn authenticated(&mut self, user: AuthUser) {
        self.is_authenticated = true;
        self.user = Some(user);
        self.error = None;
        self.is_loading = false;
        self.awaiting_name = false;
    }

    fn failed(&mut self, error: SessionError) {
        self.is_authenticated = false;
        self.user = None;
        self.error = Some(error);
        self.is_loading = false;
        self.awaiting_name = false;
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
