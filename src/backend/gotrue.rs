//! GoTrue (Supabase Auth) REST client.
//!
//! Thin HTTP wrapper for `/auth/v1/*`. Tokens are held in memory only; the
//! backend owns the durable session. Pure parsing lives in `parse_*` helpers
//! for testability.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::broadcast;

use super::types::{AuthChange, AuthUser, BackendError};
use super::{AuthBackend, CHANGE_CHANNEL_CAPACITY};
use crate::config::{AuthConfig, ConfigError};

/// Refresh this long before the server-side expiry to avoid racing it.
const EXPIRY_MARGIN: Duration = Duration::from_secs(10);

// =============================================================================
// CLIENT
// =============================================================================

struct StoredSession {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

impl StoredSession {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at
            .is_some_and(|at| now + EXPIRY_MARGIN >= at)
    }
}

pub struct GoTrueClient {
    http: reqwest::Client,
    config: AuthConfig,
    session: Mutex<Option<StoredSession>>,
    changes: broadcast::Sender<AuthChange>,
}

#[derive(Debug, thiserror::Error)]
pub enum GoTrueInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GoTrueClient {
    /// Build a client from `AUTH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is incomplete or the HTTP client fails.
    pub fn from_env() -> Result<Self, GoTrueInitError> {
        let config = AuthConfig::from_env()?;
        Self::new(config)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: AuthConfig) -> Result<Self, GoTrueInitError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| GoTrueInitError::HttpClientBuild(e.to_string()))?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self { http, config, session: Mutex::new(None), changes })
    }

    /// Whether an access token is currently held.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.lock_session().is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.base_url)
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        // A poisoned lock only means a panic mid-assignment; the Option is still valid.
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn store_tokens(&self, tokens: TokenGrant) {
        // An expiry past what `Instant` can represent is treated as none.
        let expires_at = tokens
            .expires_in
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
        *self.lock_session() = Some(StoredSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        });
    }

    fn clear_tokens(&self) {
        *self.lock_session() = None;
    }

    /// Drop local tokens and tell subscribers the session ended.
    fn end_session(&self) {
        self.clear_tokens();
        self.notify(AuthChange::SignedOut);
    }

    fn notify(&self, change: AuthChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = request
            .header("apikey", &self.config.anon_key)
            .send()
            .await
            .map_err(|e| BackendError::transport(&e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::transport(&e))?;

        if !(200..300).contains(&status) {
            return Err(parse_error(status, &text));
        }
        Ok(text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthUser, BackendError> {
        tracing::debug!("refreshing expired access token");
        let request = self
            .http
            .post(self.endpoint("token?grant_type=refresh_token"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let body = match self.send(request).await {
            Ok(body) => body,
            Err(e) if e.status.is_some_and(|status| (400..500).contains(&status)) => {
                tracing::debug!(error = %e, "refresh token rejected; session is gone");
                self.end_session();
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let (user, tokens) = parse_session_response(&body)?;
        self.store_tokens(tokens);
        self.notify(AuthChange::TokenRefreshed(user.clone()));
        Ok(user)
    }

    /// Access token to use for the next call, refreshing it first if expired.
    async fn live_access_token(&self) -> Result<Option<String>, BackendError> {
        let (access, refresh) = {
            let guard = self.lock_session();
            let Some(session) = guard.as_ref() else {
                return Ok(None);
            };
            let refresh = session
                .is_expired(Instant::now())
                .then(|| session.refresh_token.clone())
                .flatten();
            (session.access_token.clone(), refresh)
        };

        if let Some(refresh_token) = refresh {
            self.refresh(&refresh_token).await?;
            return Ok(self.lock_session().as_ref().map(|s| s.access_token.clone()));
        }
        Ok(Some(access))
    }
}

#[async_trait::async_trait]
impl AuthBackend for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        tracing::debug!(%email, "gotrue password sign-in");
        let request = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .json(&serde_json::json!({ "email": email, "password": password }));
        let body = self.send(request).await?;
        let (user, tokens) = parse_session_response(&body)?;
        self.store_tokens(tokens);
        self.notify(AuthChange::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError> {
        tracing::debug!(%email, "gotrue sign-up");
        let request = self
            .http
            .post(self.endpoint("signup"))
            .json(&serde_json::json!({ "email": email, "password": password, "data": metadata }));
        let body = self.send(request).await?;
        let (user, tokens) = parse_signup_response(&body)?;
        // With email confirmation enabled the backend returns the user without a session.
        if let Some(tokens) = tokens {
            self.store_tokens(tokens);
            self.notify(AuthChange::SignedIn(user.clone()));
        }
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = match self.live_access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(()),
            // A rejected refresh already ended the session locally.
            Err(_) if !self.has_session() => return Ok(()),
            Err(e) => return Err(e),
        };

        let request = self
            .http
            .post(self.endpoint("logout"))
            .bearer_auth(token);
        match self.send(request).await {
            Ok(_) => {}
            Err(e) if matches!(e.status, Some(401 | 403 | 404)) => {
                tracing::debug!(error = %e, "logout token no longer valid; ending local session");
            }
            Err(e) => return Err(e),
        }
        self.end_session();
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let Some(token) = self.live_access_token().await? else {
            return Ok(None);
        };

        let request = self
            .http
            .get(self.endpoint("user"))
            .bearer_auth(token);
        match self.send(request).await {
            Ok(body) => parse_user_response(&body).map(Some),
            Err(e) if e.status == Some(401) => {
                tracing::debug!("access token rejected; treating session as gone");
                self.end_session();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct SessionResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: AuthUser,
}

impl SessionResponse {
    fn split(self) -> (AuthUser, TokenGrant) {
        let tokens = TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
        };
        (self.user, tokens)
    }
}

/// Error envelope. GoTrue has shipped several shapes over time:
/// `{"code":400,"error_code":"...","msg":"..."}` and the OAuth-style
/// `{"error":"invalid_grant","error_description":"..."}`.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_session_response(body: &str) -> Result<(AuthUser, TokenGrant), BackendError> {
    serde_json::from_str::<SessionResponse>(body)
        .map(SessionResponse::split)
        .map_err(|e| BackendError::new(format!("unexpected session response: {e}")))
}

fn parse_signup_response(body: &str) -> Result<(AuthUser, Option<TokenGrant>), BackendError> {
    if let Ok(session) = serde_json::from_str::<SessionResponse>(body) {
        let (user, tokens) = session.split();
        return Ok((user, Some(tokens)));
    }
    parse_user_response(body).map(|user| (user, None))
}

fn parse_user_response(body: &str) -> Result<AuthUser, BackendError> {
    serde_json::from_str::<AuthUser>(body).map_err(|e| BackendError::new(format!("unexpected user response: {e}")))
}

fn parse_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let error_str = parsed
        .error
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);
    let code_str = parsed
        .code
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    let message = parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.message)
        .or_else(|| error_str.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("auth backend returned status {status}")
            } else {
                format!("auth backend returned status {status}: {trimmed}")
            }
        });

    let mut err = BackendError::new(message).with_status(status);
    err.code = parsed.error_code.or(code_str).or(error_str);
    err
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
