//! Session store: sign-in-or-sign-up, sign-out, and user rehydration.
//!
//! DESIGN
//! ======
//! One owned store per app (or per test), holding the backend behind an
//! `Arc` and publishing snapshots through a `watch` channel. Every operation
//! folds backend failures into `Session::error` and returns the final
//! snapshot; callers read the outcome from it.
//!
//! Operations are serialized with a `try_lock`: a second call while one is in
//! flight is rejected with [`StoreError::Busy`] rather than queued, and the
//! rejected call does not touch state.
//!
//! FLOW
//! ====
//! sign-in ──ok──▶ Authenticated
//!    │
//!    ├─ no account ─▶ AwaitingName ─name─▶ sign-up ─ok/err─▶ Authenticated | Failed
//!    │                     └─cancel─▶ Failed (cancelled)
//!    └─ other error ─▶ Failed

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, MutexGuard, broadcast, watch};
use tokio::task::JoinHandle;

use super::{LastAction, Session, SessionPhase};
use crate::backend::{AuthBackend, AuthChange};
use crate::error::{SessionError, StoreError};
use crate::prompt::{NamePrompt, PromptRequest};

pub struct SessionStore<B: AuthBackend + ?Sized> {
    backend: Arc<B>,
    state: watch::Sender<Session>,
    op_lock: Mutex<()>,
}

impl<B: AuthBackend + ?Sized> SessionStore<B> {
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self { backend, state, op_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.op_lock.try_lock().map_err(|_| {
            let in_flight = self.state.borrow().last_action;
            tracing::warn!(?in_flight, "session operation rejected: another is in flight");
            StoreError::Busy { in_flight }
        })
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        self.state.send_modify(f);
    }

    // =========================================================================
    // SIGN IN / SIGN UP
    // =========================================================================

    /// Sign in, falling back to sign-up (with a prompted display name) when
    /// the backend reports no matching account.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::Busy`]. Auth failures are recorded in the returned
    /// snapshot's `error`.
    pub async fn sign_in_or_sign_up<P: NamePrompt + ?Sized>(
        &self,
        email: &str,
        password: &str,
        prompt: &P,
    ) -> Result<Session, StoreError> {
        let _op = self.begin()?;
        let email = email.trim();

        if email.is_empty() || password.is_empty() {
            tracing::warn!("sign-in rejected locally: missing email or password");
            self.update(|s| {
                s.last_action = Some(LastAction::SignIn);
                s.cancelled = false;
                s.failed(SessionError::missing_credentials());
            });
            return Ok(self.snapshot());
        }

        self.update(|s| {
            s.is_loading = true;
            s.error = None;
            s.cancelled = false;
            s.awaiting_name = false;
            s.last_action = Some(LastAction::SignIn);
        });

        match self.backend.sign_in_with_password(email, password).await {
            Ok(user) => {
                tracing::info!(%email, user_id = %user.id, "signed in");
                self.update(|s| s.authenticated(user));
            }
            Err(e) if e.is_no_account() => {
                tracing::info!(%email, "no account found; offering sign-up");
                self.sign_up_with_prompt(email, password, prompt).await;
            }
            Err(e) => {
                tracing::warn!(%email, error = %e, "sign-in failed");
                self.update(|s| s.failed(e.into()));
            }
        }

        Ok(self.snapshot())
    }

    async fn sign_up_with_prompt<P: NamePrompt + ?Sized>(&self, email: &str, password: &str, prompt: &P) {
        self.update(|s| {
            s.last_action = Some(LastAction::SignUp);
            s.awaiting_name = true;
        });

        let name = prompt
            .prompt_for_name(&PromptRequest::for_email(email))
            .await
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        let Some(name) = name else {
            tracing::info!(%email, "sign-up cancelled at name prompt");
            self.update(|s| {
                s.failed(SessionError::Cancelled);
                s.cancelled = true;
            });
            return;
        };

        self.update(|s| s.awaiting_name = false);
        let metadata = serde_json::json!({ "name": name });
        match self.backend.sign_up(email, password, metadata).await {
            Ok(user) => {
                tracing::info!(%email, user_id = %user.id, "account created");
                self.update(|s| s.authenticated(user));
            }
            Err(e) => {
                tracing::warn!(%email, error = %e, "sign-up failed");
                self.update(|s| s.failed(e.into()));
            }
        }
    }

    // =========================================================================
    // SIGN OUT
    // =========================================================================

    /// Sign out on the backend, then reset to the initial state.
    ///
    /// On backend failure the user stays signed in locally and `error` is set.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::Busy`].
    pub async fn sign_out(&self) -> Result<Session, StoreError> {
        let _op = self.begin()?;
        self.update(|s| {
            s.is_loading = true;
            s.last_action = Some(LastAction::SignOut);
        });

        match self.backend.sign_out().await {
            Ok(()) => {
                tracing::info!("signed out");
                self.state.send_replace(Session::default());
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-out failed; keeping local session");
                self.update(|s| {
                    s.is_loading = false;
                    s.error = Some(e.into());
                });
            }
        }

        Ok(self.snapshot())
    }

    // =========================================================================
    // FETCH USER
    // =========================================================================

    /// Rehydrate `user` from the backend's current session.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::Busy`].
    pub async fn fetch_user(&self) -> Result<Session, StoreError> {
        let _op = self.begin()?;
        Ok(self.rehydrate().await)
    }

    /// Wait for any in-flight operation to finish, then rehydrate.
    async fn fetch_user_when_idle(&self) -> Session {
        let _op = self.op_lock.lock().await;
        self.rehydrate().await
    }

    async fn rehydrate(&self) -> Session {
        self.update(|s| {
            s.is_loading = true;
            s.last_action = Some(LastAction::FetchUser);
        });

        match self.backend.current_user().await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = %user.id, "session rehydrated");
                self.update(|s| {
                    s.cancelled = false;
                    s.authenticated(user);
                });
            }
            Ok(None) => {
                tracing::debug!("no active session");
                self.update(|s| {
                    s.is_authenticated = false;
                    s.user = None;
                    s.error = None;
                    s.cancelled = false;
                    s.is_loading = false;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetching current user failed");
                self.update(|s| s.failed(e.into()));
            }
        }

        self.snapshot()
    }

    // =========================================================================
    // HOUSEKEEPING
    // =========================================================================

    /// Clear `error` and `cancelled` before a fresh attempt.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::Busy`].
    pub fn reset(&self) -> Result<(), StoreError> {
        let _op = self.begin()?;
        self.state.send_if_modified(|s| {
            let changed = s.error.is_some() || s.cancelled;
            s.error = None;
            s.cancelled = false;
            changed
        });
        Ok(())
    }

    /// Apply a backend change notification. Returns whether state changed.
    ///
    /// Ignored while an operation is in flight; that operation's own result wins.
    pub fn apply_auth_change(&self, change: &AuthChange) -> bool {
        let Ok(_op) = self.op_lock.try_lock() else {
            tracing::debug!(?change, "auth change ignored during in-flight operation");
            return false;
        };

        self.state.send_if_modified(|s| match change.user() {
            Some(user) => {
                if s.is_authenticated && s.user.as_ref() == Some(user) {
                    return false;
                }
                s.is_authenticated = true;
                s.user = Some(user.clone());
                s.error = None;
                s.cancelled = false;
                true
            }
            None => {
                if !s.is_authenticated && s.user.is_none() {
                    return false;
                }
                s.is_authenticated = false;
                s.user = None;
                true
            }
        })
    }
}

impl<B: AuthBackend + ?Sized + 'static> SessionStore<B> {
    /// Follow backend change notifications until the backend's channel closes
    /// or the store is dropped.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.backend.subscribe();
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let change = changes.recv().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                match change {
                    Ok(change) => {
                        store.apply_auth_change(&change);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth change listener lagged; rehydrating");
                        store.fetch_user_when_idle().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
