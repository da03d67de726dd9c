use super::*;

// =============================================================================
// BackendError::is_no_account
// =============================================================================

#[test]
fn no_account_detected_by_code() {
    let err = BackendError::new("something reworded").with_code(NO_ACCOUNT_CODE);
    assert!(err.is_no_account());
}

#[test]
fn no_account_detected_by_message_substring() {
    let err = BackendError::new("AuthApiError: Invalid login credentials");
    assert!(err.is_no_account());
}

#[test]
fn other_code_is_not_no_account() {
    let err = BackendError::new("Invalid password").with_code("bad_password");
    assert!(!err.is_no_account());
}

#[test]
fn other_message_is_not_no_account() {
    assert!(!BackendError::new("Invalid password").is_no_account());
    assert!(!BackendError::new("network unreachable").is_no_account());
}

#[test]
fn no_account_constructor_matches_contract() {
    let err = BackendError::no_account();
    assert!(err.is_no_account());
    assert_eq!(err.to_string(), NO_ACCOUNT_MESSAGE);
    assert_eq!(err.status, Some(400));
}

#[test]
fn backend_error_displays_message_verbatim() {
    let err = BackendError::new("User already registered").with_status(422);
    assert_eq!(err.to_string(), "User already registered");
}

// =============================================================================
// AuthUser
// =============================================================================

#[test]
fn auth_user_deserialize_gotrue_shape() {
    let json = r#"{
        "id": "6f1c1f4e-9a7b-4b7e-8a53-1d2f3c4b5a69",
        "aud": "authenticated",
        "email": "jane@clinic.test",
        "user_metadata": {"name": "Jane Doe"}
    }"#;
    let user: AuthUser = serde_json::from_str(json).unwrap();
    assert_eq!(user.email.as_deref(), Some("jane@clinic.test"));
    assert_eq!(user.display_name(), Some("Jane Doe"));
}

#[test]
fn auth_user_deserialize_without_metadata() {
    let json = r#"{"id": "6f1c1f4e-9a7b-4b7e-8a53-1d2f3c4b5a69"}"#;
    let user: AuthUser = serde_json::from_str(json).unwrap();
    assert!(user.email.is_none());
    assert!(user.user_metadata.is_object());
    assert!(user.display_name().is_none());
}

#[test]
fn display_name_falls_back_to_full_name() {
    let mut user = AuthUser::new(Uuid::new_v4(), "a@b.test");
    user.user_metadata = serde_json::json!({ "full_name": "Dr. Who" });
    assert_eq!(user.display_name(), Some("Dr. Who"));
}

#[test]
fn display_name_ignores_blank() {
    let user = AuthUser::new(Uuid::new_v4(), "a@b.test").with_name("   ");
    assert!(user.display_name().is_none());
}

#[test]
fn with_name_replaces_non_object_metadata() {
    let mut user = AuthUser::new(Uuid::new_v4(), "a@b.test");
    user.user_metadata = serde_json::Value::Null;
    let user = user.with_name("Jane Doe");
    assert_eq!(user.display_name(), Some("Jane Doe"));
}

// =============================================================================
// AuthChange
// =============================================================================

#[test]
fn auth_change_user_accessor() {
    let user = AuthUser::new(Uuid::new_v4(), "a@b.test");
    assert_eq!(AuthChange::SignedIn(user.clone()).user(), Some(&user));
    assert_eq!(AuthChange::TokenRefreshed(user.clone()).user(), Some(&user));
    assert!(AuthChange::SignedOut.user().is_none());
}
