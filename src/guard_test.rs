use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::backend::AuthUser;
use crate::backend::memory::MemoryBackend;
use crate::prompt::prompt_fn;
use crate::session::SessionStore;

fn signed_in() -> Session {
    Session {
        is_authenticated: true,
        user: Some(AuthUser::new(uuid::Uuid::new_v4(), "jane@clinic.test")),
        ..Session::default()
    }
}

#[test]
fn loading_is_pending() {
    let session = Session { is_loading: true, ..Session::default() };
    assert_eq!(evaluate(&session), GuardDecision::Pending);
    assert!(!should_redirect_unauth(&session));
}

#[test]
fn anonymous_redirects_to_auth() {
    let session = Session::default();
    assert_eq!(evaluate(&session), GuardDecision::Redirect("/auth"));
    assert!(should_redirect_unauth(&session));
}

#[test]
fn authenticated_is_allowed() {
    assert_eq!(evaluate(&signed_in()), GuardDecision::Allow);
    assert!(!should_redirect_unauth(&signed_in()));
}

#[test]
fn loading_wins_over_authenticated() {
    let session = Session { is_loading: true, ..signed_in() };
    assert_eq!(evaluate(&session), GuardDecision::Pending);
}

#[tokio::test]
async fn resolve_returns_immediately_when_settled() {
    let (_tx, mut rx) = watch::channel(signed_in());
    assert_eq!(resolve(&mut rx).await, GuardDecision::Allow);
}

#[tokio::test]
async fn resolve_waits_for_loading_to_finish() {
    let (tx, mut rx) = watch::channel(Session { is_loading: true, ..Session::default() });
    let waiter = tokio::spawn(async move { resolve(&mut rx).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    tx.send_replace(signed_in());

    assert_eq!(waiter.await.unwrap(), GuardDecision::Allow);
}

#[tokio::test]
async fn resolve_uses_last_snapshot_when_store_gone() {
    let (tx, mut rx) = watch::channel(Session { is_loading: true, ..Session::default() });
    drop(tx);
    assert_eq!(resolve(&mut rx).await, GuardDecision::Pending);
}

#[tokio::test]
async fn guard_follows_store() {
    let backend = Arc::new(MemoryBackend::new().with_account("jane@clinic.test", "secret1", "Jane Doe"));
    let store = SessionStore::new(backend);
    let mut rx = store.subscribe();
    assert_eq!(resolve(&mut rx).await, GuardDecision::Redirect(UNAUTHENTICATED_ROUTE));

    let prompt = prompt_fn(|_| async { None });
    store.sign_in_or_sign_up("jane@clinic.test", "secret1", &prompt).await.unwrap();
    assert_eq!(resolve(&mut rx).await, GuardDecision::Allow);

    store.sign_out().await.unwrap();
    assert_eq!(resolve(&mut rx).await, GuardDecision::Redirect(UNAUTHENTICATED_ROUTE));
}
