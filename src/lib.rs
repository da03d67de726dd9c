//! Clinic dashboard session core.
//!
//! ARCHITECTURE
//! ============
//! - [`session`]: the session snapshot and the store that runs the
//!   sign-in-or-sign-up, sign-out and fetch-user flows.
//! - [`prompt`]: the name prompt the sign-up fallback suspends on.
//! - [`guard`]: route-guard decisions over a snapshot.
//! - [`backend`]: the external auth service contract, with GoTrue and
//!   in-memory implementations.
//! - [`config`] / [`error`]: environment configuration and error taxonomy.

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod prompt;
pub mod session;

pub use backend::{AuthBackend, AuthUser, BackendError};
pub use error::{SessionError, StoreError};
pub use prompt::{NamePrompt, NamePromptChannel, PromptDialog, PromptRequest};
pub use session::{LastAction, Session, SessionPhase, SessionStore};
