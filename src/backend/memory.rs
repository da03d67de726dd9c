//! In-memory auth backend.
//!
//! Keeps an account table and a single current session in process memory.
//! Used by `clinic-login --backend memory` and by tests that need a backend
//! with real account semantics. Failures can be injected per operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use uuid::Uuid;

use super::types::{AuthChange, AuthUser, BackendError};
use super::{AuthBackend, CHANGE_CHANNEL_CAPACITY};

const MIN_PASSWORD_LEN: usize = 6;

/// Backend operation, used to target injected failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    SignIn,
    SignUp,
    SignOut,
    CurrentUser,
}

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    current: Option<AuthUser>,
    failures: HashMap<BackendOp, BackendError>,
    calls: HashMap<BackendOp, usize>,
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<AuthChange>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { state: Mutex::new(MemoryState::default()), changes }
    }

    /// Builder form of [`MemoryBackend::add_account`].
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, name: &str) -> Self {
        self.add_account(email, password, name);
        self
    }

    /// Register an account directly, bypassing sign-up. Returns the new user.
    pub fn add_account(&self, email: &str, password: &str, name: &str) -> AuthUser {
        let key = normalize(email);
        let user = AuthUser::new(Uuid::new_v4(), key.clone()).with_name(name);
        self.lock().accounts.insert(key, Account { password: password.to_owned(), user: user.clone() });
        user
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: BackendOp, err: BackendError) {
        self.lock().failures.insert(op, err);
    }

    /// Number of times `op` has been invoked.
    #[must_use]
    pub fn calls(&self, op: BackendOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// User of the current session, if any.
    #[must_use]
    pub fn session_user(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }

    /// Whether an account exists for `email`.
    #[must_use]
    pub fn has_account(&self, email: &str) -> bool {
        self.lock().accounts.contains_key(&normalize(email))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: AuthChange) {
        let _ = self.changes.send(change);
    }
}

/// Count the call and pop any injected failure.
fn enter(state: &mut MemoryState, op: BackendOp) -> Result<(), BackendError> {
    *state.calls.entry(op).or_default() += 1;
    match state.failures.remove(&op) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait::async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let user = {
            let mut state = self.lock();
            enter(&mut state, BackendOp::SignIn)?;
            let user = match state.accounts.get(&normalize(email)) {
                None => return Err(BackendError::no_account()),
                Some(account) if account.password != password => {
                    return Err(BackendError::new("Invalid password").with_status(400));
                }
                Some(account) => account.user.clone(),
            };
            state.current = Some(user.clone());
            user
        };
        self.notify(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError> {
        let user = {
            let mut state = self.lock();
            enter(&mut state, BackendOp::SignUp)?;
            let key = normalize(email);
            if state.accounts.contains_key(&key) {
                return Err(BackendError::new("User already registered")
                    .with_code("user_already_exists")
                    .with_status(422));
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(BackendError::new(format!(
                    "Password should be at least {MIN_PASSWORD_LEN} characters."
                ))
                .with_code("weak_password")
                .with_status(422));
            }
            let mut user = AuthUser::new(Uuid::new_v4(), key.clone());
            if metadata.is_object() {
                user.user_metadata = metadata;
            }
            state.accounts.insert(key, Account { password: password.to_owned(), user: user.clone() });
            state.current = Some(user.clone());
            user
        };
        self.notify(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let had_session = {
            let mut state = self.lock();
            enter(&mut state, BackendOp::SignOut)?;
            state.current.take().is_some()
        };
        if had_session {
            self.notify(AuthChange::SignedOut);
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let mut state = self.lock();
        enter(&mut state, BackendOp::CurrentUser)?;
        Ok(state.current.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
