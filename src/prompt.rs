//! Name prompt: suspends the sign-up fallback until the operator answers.
//!
//! DESIGN
//! ======
//! The flow side awaits a `oneshot` answer; the UI side holds a
//! [`PromptDialog`] that observes a `watch` "open" flag and resolves the
//! pending answer through `confirm`/`cancel`. The responder is taken on first
//! resolution, so a prompt resolves at most once.
//!
//! TRADE-OFFS
//! ==========
//! There is no timeout: a prompt may stay open indefinitely, holding the
//! session in its loading state. Closing the dialog (unmount) drops the
//! responder, which the waiting flow reads as cancellation.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};

/// What the dialog shows while a prompt is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub email: String,
    pub message: String,
}

impl PromptRequest {
    #[must_use]
    pub fn for_email(email: &str) -> Self {
        Self {
            email: email.to_owned(),
            message: format!("No account found for {email}. Please enter your name to create one."),
        }
    }
}

/// Source of a display name for a first-time sign-up.
#[async_trait::async_trait]
pub trait NamePrompt: Send + Sync {
    /// Ask for a display name. `None` means the operator cancelled.
    async fn prompt_for_name(&self, request: &PromptRequest) -> Option<String>;
}

// =============================================================================
// CLOSURE ADAPTER
// =============================================================================

/// [`NamePrompt`] backed by an async closure.
pub struct PromptFn<F>(F);

/// Wrap an async closure as a [`NamePrompt`].
pub fn prompt_fn<F, Fut>(f: F) -> PromptFn<F>
where
    F: Fn(PromptRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Option<String>> + Send,
{
    PromptFn(f)
}

#[async_trait::async_trait]
impl<F, Fut> NamePrompt for PromptFn<F>
where
    F: Fn(PromptRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Option<String>> + Send,
{
    async fn prompt_for_name(&self, request: &PromptRequest) -> Option<String> {
        (self.0)(request.clone()).await
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("no name prompt is open")]
    NotOpen,
    #[error("name must not be empty")]
    EmptyName,
    #[error("sign-up flow is no longer waiting for a name")]
    Abandoned,
}

type Responder = oneshot::Sender<Option<String>>;

struct Shared {
    open: watch::Sender<Option<PromptRequest>>,
    responder: Mutex<Option<Responder>>,
}

impl Shared {
    fn responder(&self) -> MutexGuard<'_, Option<Responder>> {
        self.responder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flow-side end of the prompt channel. Pass it to the store as the [`NamePrompt`].
#[derive(Clone)]
pub struct NamePromptChannel {
    shared: Arc<Shared>,
}

impl Default for NamePromptChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl NamePromptChannel {
    #[must_use]
    pub fn new() -> Self {
        let (open, _) = watch::channel(None);
        Self { shared: Arc::new(Shared { open, responder: Mutex::new(None) }) }
    }

    /// UI-side handle for rendering and resolving prompts.
    #[must_use]
    pub fn dialog(&self) -> PromptDialog {
        PromptDialog { shared: Arc::clone(&self.shared) }
    }
}

#[async_trait::async_trait]
impl NamePrompt for NamePromptChannel {
    async fn prompt_for_name(&self, request: &PromptRequest) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        let stale = self.shared.responder().replace(tx);
        if let Some(stale) = stale {
            tracing::debug!("replacing unanswered name prompt");
            let _ = stale.send(None);
        }
        self.shared.open.send_replace(Some(request.clone()));

        // A dropped responder (dialog closed) reads as cancellation.
        let answer = rx.await.unwrap_or(None)?;
        let answer = answer.trim();
        (!answer.is_empty()).then(|| answer.to_owned())
    }
}

/// UI-side end of the prompt channel: open flag plus confirm/cancel handlers.
#[derive(Clone)]
pub struct PromptDialog {
    shared: Arc<Shared>,
}

impl PromptDialog {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.open.borrow().is_some()
    }

    /// The open prompt, if any.
    #[must_use]
    pub fn request(&self) -> Option<PromptRequest> {
        self.shared.open.borrow().clone()
    }

    /// Receiver for re-rendering whenever the prompt opens or closes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<PromptRequest>> {
        self.shared.open.subscribe()
    }

    /// Wait until a prompt is open and return it.
    pub async fn wait_for_request(&self) -> Option<PromptRequest> {
        let mut rx = self.shared.open.subscribe();
        rx.wait_for(Option::is_some).await.ok().and_then(|open| open.clone())
    }

    /// Submit a name. Blank input is rejected and the prompt stays open.
    ///
    /// # Errors
    ///
    /// [`DialogError::NotOpen`] if nothing is pending, [`DialogError::EmptyName`]
    /// for blank input, [`DialogError::Abandoned`] if the flow went away.
    pub fn confirm(&self, name: &str) -> Result<(), DialogError> {
        if !self.is_open() {
            return Err(DialogError::NotOpen);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DialogError::EmptyName);
        }
        self.resolve(Some(name.to_owned()))
    }

    /// Decline the prompt.
    ///
    /// # Errors
    ///
    /// [`DialogError::NotOpen`] if nothing is pending, [`DialogError::Abandoned`]
    /// if the flow went away.
    pub fn cancel(&self) -> Result<(), DialogError> {
        self.resolve(None)
    }

    /// Backdrop click or escape key. Treated as cancellation.
    ///
    /// # Errors
    ///
    /// Same as [`PromptDialog::cancel`].
    pub fn dismiss(&self) -> Result<(), DialogError> {
        self.cancel()
    }

    /// Tear down the dialog. A pending flow observes cancellation.
    pub fn close(&self) {
        let responder = self.shared.responder().take();
        self.shared.open.send_replace(None);
        drop(responder);
    }

    fn resolve(&self, answer: Option<String>) -> Result<(), DialogError> {
        let responder = self.shared.responder().take().ok_or(DialogError::NotOpen)?;
        self.shared.open.send_replace(None);
        responder.send(answer).map_err(|_| DialogError::Abandoned)
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
