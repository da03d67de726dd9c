//! Session error taxonomy.
//!
//! Auth failures never escape the store as `Err`; they land in
//! `Session::error` as a [`SessionError`]. Only [`StoreError`] (contract
//! misuse) is returned to the caller.

use crate::backend::BackendError;
use crate::session::LastAction;

pub const VALIDATION_MESSAGE: &str = "Email and password are required.";
pub const CANCELLED_MESSAGE: &str = "Sign up cancelled by user";

/// Error value recorded in the session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Input rejected locally before any backend call.
    #[error("{0}")]
    Validation(String),
    /// Backend failure, message shown verbatim.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The operator declined the name prompt.
    #[error("Sign up cancelled by user")]
    Cancelled,
}

impl SessionError {
    /// Missing email or password.
    #[must_use]
    pub fn missing_credentials() -> Self {
        Self::Validation(VALIDATION_MESSAGE.to_owned())
    }

    /// Cancellation is an outcome, not a failure; callers may skip error toasts for it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors returned by store operations themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Another operation is still in flight; the call was rejected and state left untouched.
    #[error("session store busy: {in_flight:?} still in progress")]
    Busy { in_flight: Option<LastAction> },
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
