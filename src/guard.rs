//! Route guard decisions.
//!
//! SYSTEM CONTEXT
//! ==============
//! Navigation layers apply identical unauthenticated-redirect behavior. This
//! is a UX guard only; real access control lives on the backend.

use tokio::sync::watch;

use crate::session::Session;

/// Landing view for unauthenticated operators.
pub const UNAUTHENTICATED_ROUTE: &str = "/auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// An operation is in flight; render a loading placeholder.
    Pending,
    Redirect(&'static str),
    Allow,
}

#[must_use]
pub fn evaluate(session: &Session) -> GuardDecision {
    if session.is_loading {
        GuardDecision::Pending
    } else if !session.is_authenticated {
        GuardDecision::Redirect(UNAUTHENTICATED_ROUTE)
    } else {
        GuardDecision::Allow
    }
}

/// Redirect only once loading has finished and nobody is signed in.
#[must_use]
pub fn should_redirect_unauth(session: &Session) -> bool {
    matches!(evaluate(session), GuardDecision::Redirect(_))
}

/// Wait until no operation is in flight, then decide.
///
/// If the store is gone, decide on the last snapshot seen.
pub async fn resolve(session: &mut watch::Receiver<Session>) -> GuardDecision {
    if let Ok(settled) = session.wait_for(|s| !s.is_loading).await {
        return evaluate(&settled);
    }
    evaluate(&session.borrow())
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
