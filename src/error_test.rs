use super::*;

#[test]
fn cancelled_message_matches_contract() {
    assert_eq!(SessionError::Cancelled.to_string(), "Sign up cancelled by user");
    assert!(SessionError::Cancelled.is_cancelled());
}

#[test]
fn validation_message() {
    let err = SessionError::missing_credentials();
    assert_eq!(err.to_string(), VALIDATION_MESSAGE);
    assert!(!err.is_cancelled());
}

#[test]
fn backend_error_is_transparent() {
    let err: SessionError = BackendError::new("Invalid password").into();
    assert_eq!(err.to_string(), "Invalid password");
    assert!(!err.is_cancelled());
}

#[test]
fn busy_names_in_flight_action() {
    let err = StoreError::Busy { in_flight: Some(LastAction::SignUp) };
    let msg = err.to_string();
    assert!(msg.contains("busy"));
    assert!(msg.contains("SignUp"));
}
