// Tests for the login and register forms

use serde_json::json;
use std::sync::Arc;
use upwatch_client::{ApiClient, ApiConfig};
use upwatch_core::navigation::NavEvent;
use upwatch_core::{AuthAction, AuthForm, AuthOutcome, RecordingNavigator, Route};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

async fn form(action: AuthAction) -> (MockServer, Arc<RecordingNavigator>, AuthForm) {
    let server = MockServer::start().await;
    let client = Arc::new(ApiClient::new(ApiConfig::new(&server.uri()).unwrap()).unwrap());
    let nav = Arc::new(RecordingNavigator::new());
    let mut form = AuthForm::new(action, client, nav.clone());
    form.email = "ops@example.com".to_string();
    form.password = "correct horse".to_string();
    (server, nav, form)
}

#[tokio::test]
async fn test_login_success_goes_to_dashboard() {
    let (server, nav, mut form) = form(AuthAction::Login).await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ops@example.com", "password": "correct horse"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "email": "ops@example.com"})))
        .expect(1)
        .mount(&server)
        .await;

    match form.submit().await {
        AuthOutcome::SignedIn(Some(user)) => assert_eq!(user.id, 3),
        other => panic!("expected sign-in, got {:?}", other),
    }
    assert_eq!(
        nav.events(),
        vec![NavEvent::Push(Route::Dashboard), NavEvent::Refresh]
    );
    assert_eq!(form.error, None);
    assert!(!form.loading);
}

#[tokio::test]
async fn test_login_success_with_unexpected_body_still_signs_in() {
    let (server, nav, mut form) = form(AuthAction::Login).await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(form.submit().await, AuthOutcome::SignedIn(None));
    assert_eq!(
        nav.events(),
        vec![NavEvent::Push(Route::Dashboard), NavEvent::Refresh]
    );
    assert_eq!(form.error, None);
}

#[tokio::test]
async fn test_register_empty_success_body_still_signs_in() {
    let (server, nav, mut form) = form(AuthAction::Register).await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    assert_eq!(form.submit().await, AuthOutcome::SignedIn(None));
    assert_eq!(nav.current(), Some(Route::Dashboard));
}

#[tokio::test]
async fn test_login_wrong_credentials_shows_inline_error() {
    let (server, nav, mut form) = form(AuthAction::Login).await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})))
        .mount(&server)
        .await;

    let outcome = form.submit().await;
    assert_eq!(outcome, AuthOutcome::Failed("Invalid credentials".to_string()));
    assert_eq!(form.error.as_deref(), Some("Invalid credentials"));
    assert!(!form.loading);
    assert!(nav.events().is_empty());
}

#[tokio::test]
async fn test_resubmit_clears_previous_error() {
    let (server, _nav, mut form) = form(AuthAction::Login).await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "email": "ops@example.com"})))
        .mount(&server)
        .await;

    form.submit().await;
    assert!(form.error.is_some());
    form.submit().await;
    assert_eq!(form.error, None);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (server, nav, mut form) = form(AuthAction::Register).await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = form.submit().await;
    assert_eq!(outcome, AuthOutcome::Failed("Email already registered".to_string()));
    assert!(nav.events().is_empty());
}

#[tokio::test]
async fn test_register_empty_message_uses_fallback() {
    let (server, _nav, mut form) = form(AuthAction::Register).await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": ""})))
        .mount(&server)
        .await;

    let outcome = form.submit().await;
    assert_eq!(outcome, AuthOutcome::Failed("Registration failed".to_string()));
}

#[tokio::test]
async fn test_register_success_goes_to_dashboard() {
    let (server, nav, mut form) = form(AuthAction::Register).await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11, "email": "ops@example.com"})))
        .mount(&server)
        .await;

    assert!(matches!(form.submit().await, AuthOutcome::SignedIn(_)));
    assert_eq!(nav.current(), Some(Route::Dashboard));
}

#[test]
fn test_action_labels() {
    assert_eq!(AuthAction::Login.fallback_error(), "Login failed");
    assert_eq!(AuthAction::Register.busy_label(), "Registering…");
    assert_eq!(AuthAction::Login.other(), AuthAction::Register);
    assert_eq!(AuthAction::Register.route(), Route::Register);
}
