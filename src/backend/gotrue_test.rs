use super::*;

const USER_JSON: &str = r#"{
    "id": "0b6f5f0e-2a7c-4d0c-9a57-4f5e2d1c3b4a",
    "aud": "authenticated",
    "role": "authenticated",
    "email": "jane@clinic.test",
    "user_metadata": {"name": "Jane Doe"}
}"#;

fn session_json() -> String {
    format!(
        r#"{{"access_token":"at-1","token_type":"bearer","expires_in":3600,"refresh_token":"rt-1","user":{USER_JSON}}}"#
    )
}

// =============================================================================
// parse_error
// =============================================================================

#[test]
fn parse_error_current_envelope() {
    let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
    let err = parse_error(400, body);
    assert_eq!(err.message, "Invalid login credentials");
    assert_eq!(err.code.as_deref(), Some("invalid_credentials"));
    assert_eq!(err.status, Some(400));
    assert!(err.is_no_account());
}

#[test]
fn parse_error_oauth_envelope() {
    let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
    let err = parse_error(400, body);
    assert_eq!(err.message, "Invalid login credentials");
    assert_eq!(err.code.as_deref(), Some("invalid_grant"));
    assert!(err.is_no_account());
}

#[test]
fn parse_error_duplicate_signup() {
    let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
    let err = parse_error(422, body);
    assert_eq!(err.to_string(), "User already registered");
    assert!(!err.is_no_account());
}

#[test]
fn parse_error_message_field() {
    let err = parse_error(429, r#"{"message":"Rate limit exceeded"}"#);
    assert_eq!(err.message, "Rate limit exceeded");
    assert!(err.code.is_none());
}

#[test]
fn parse_error_string_code_used_when_no_error_code() {
    let err = parse_error(400, r#"{"code":"weak_password","message":"Password is too weak"}"#);
    assert_eq!(err.code.as_deref(), Some("weak_password"));
}

#[test]
fn parse_error_non_json_body() {
    let err = parse_error(502, "Bad Gateway");
    assert_eq!(err.message, "auth backend returned status 502: Bad Gateway");
    assert_eq!(err.status, Some(502));
}

#[test]
fn parse_error_empty_body() {
    let err = parse_error(500, "");
    assert_eq!(err.message, "auth backend returned status 500");
}

// =============================================================================
// parse_session_response / parse_signup_response / parse_user_response
// =============================================================================

#[test]
fn parse_session_response_extracts_tokens_and_user() {
    let (user, tokens) = parse_session_response(&session_json()).unwrap();
    assert_eq!(user.email.as_deref(), Some("jane@clinic.test"));
    assert_eq!(tokens.access_token, "at-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(tokens.expires_in, Some(3600));
}

#[test]
fn parse_session_response_rejects_garbage() {
    let Err(err) = parse_session_response("{}") else {
        panic!("expected parse failure");
    };
    assert!(err.message.contains("unexpected session response"));
}

#[test]
fn parse_signup_response_with_session() {
    let (user, tokens) = parse_signup_response(&session_json()).unwrap();
    assert_eq!(user.display_name(), Some("Jane Doe"));
    assert!(tokens.is_some());
}

#[test]
fn parse_signup_response_confirmation_required() {
    let (user, tokens) = parse_signup_response(USER_JSON).unwrap();
    assert_eq!(user.email.as_deref(), Some("jane@clinic.test"));
    assert!(tokens.is_none());
}

#[test]
fn parse_user_response_rejects_missing_id() {
    assert!(parse_user_response(r#"{"email":"x@y.test"}"#).is_err());
}

// =============================================================================
// StoredSession expiry
// =============================================================================

#[test]
fn stored_session_without_expiry_never_expires() {
    let session = StoredSession { access_token: "a".into(), refresh_token: None, expires_at: None };
    assert!(!session.is_expired(Instant::now()));
}

#[test]
fn stored_session_expires_within_margin() {
    let now = Instant::now();
    let session = StoredSession {
        access_token: "a".into(),
        refresh_token: Some("r".into()),
        expires_at: Some(now + Duration::from_secs(5)),
    };
    assert!(session.is_expired(now));
}

#[test]
fn stored_session_fresh_token_not_expired() {
    let now = Instant::now();
    let session = StoredSession {
        access_token: "a".into(),
        refresh_token: Some("r".into()),
        expires_at: Some(now + Duration::from_secs(3600)),
    };
    assert!(!session.is_expired(now));
}

// =============================================================================
// GoTrueClient
// =============================================================================

#[test]
fn endpoint_joins_base_url() {
    let client = GoTrueClient::new(AuthConfig::new("http://localhost:54321/", "anon")).unwrap();
    assert_eq!(client.endpoint("signup"), "http://localhost:54321/auth/v1/signup");
    assert!(!client.has_session());
}

#[test]
fn store_tokens_with_unrepresentable_expiry_never_expires() {
    let body = format!(
        r#"{{"access_token":"at-1","refresh_token":"rt-1","expires_in":{},"user":{USER_JSON}}}"#,
        u64::MAX
    );
    let (_user, tokens) = parse_session_response(&body).unwrap();
    let client = GoTrueClient::new(AuthConfig::new("http://127.0.0.1:9", "anon")).unwrap();

    client.store_tokens(tokens);

    let session = client.lock_session();
    let stored = session.as_ref().unwrap();
    assert_eq!(stored.access_token, "at-1");
    assert!(stored.expires_at.is_none());
    assert!(!stored.is_expired(Instant::now()));
}

#[tokio::test]
async fn sign_out_without_session_is_local_noop() {
    let client = GoTrueClient::new(AuthConfig::new("http://127.0.0.1:9", "anon")).unwrap();
    assert!(client.sign_out().await.is_ok());
}

#[tokio::test]
async fn current_user_without_session_is_none() {
    let client = GoTrueClient::new(AuthConfig::new("http://127.0.0.1:9", "anon")).unwrap();
    assert_eq!(client.current_user().await.unwrap(), None);
}
