/// Integration tests for the TaskHive API
///
/// These tests drive the router end to end over the in-memory credential
/// store: account sign-up through activation, sign-in, token refresh,
/// password reset, and the authentication gate in front of the task routes.
mod common;

use axum::http::StatusCode;
use common::{active_account_token, send_json, sign_up, token_from_link, TestContext};
use serde_json::json;

const STRONG_PASSWORD: &str = "Xk9!mQ2p$vL7";

#[tokio::test]
async fn test_sign_up_returns_pending_account() {
    let ctx = TestContext::new();

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_up",
        Some(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": STRONG_PASSWORD,
        })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["is_active"], false);

    // The password hash never leaves the server
    assert!(body.get("password_hash").is_none());

    // The activation link was emailed, not returned
    let link = ctx.last_activation_link();
    assert!(link.starts_with("http://localhost:8080/v1/auth/activate?token="));
}

#[tokio::test]
async fn test_sign_up_weak_password_reports_every_rule() {
    let ctx = TestContext::new();

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_up",
        Some(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "password",
        })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let details = body["details"].as_array().expect("details should be a list");
    assert!(!details.is_empty());
    assert!(details
        .iter()
        .any(|d| d["message"].as_str().unwrap_or("").contains("too common")));
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let ctx = TestContext::new();
    sign_up(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_up",
        Some(json!({
            "username": "alice",
            "email": "elsewhere@example.com",
            "password": STRONG_PASSWORD,
        })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_sign_in_is_gated_until_activation() {
    let ctx = TestContext::new();
    let activation = sign_up(&ctx, "carol", "carol@example.com", STRONG_PASSWORD).await;

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "carol", "password": STRONG_PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is not active");

    let (status, body) = send_json(
        &ctx,
        "GET",
        &format!("/v1/auth/activate?token={}", activation),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], true);

    // Activation triggers the welcome email
    let welcomed = ctx.mailer.welcomed.lock().expect("mailer lock").clone();
    assert_eq!(welcomed, vec!["carol@example.com".to_string()]);

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "carol", "password": STRONG_PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_activation_is_single_shot() {
    let ctx = TestContext::new();
    let activation = sign_up(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;

    let uri = format!("/v1/auth/activate?token={}", activation);
    let (status, _) = send_json(&ctx, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&ctx, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Account is already active");
}

#[tokio::test]
async fn test_activate_with_garbage_token() {
    let ctx = TestContext::new();

    let (status, _) = send_json(
        &ctx,
        "GET",
        "/v1/auth/activate?token=not-a-token",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_read_the_same() {
    let ctx = TestContext::new();
    active_account_token(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;

    let (unknown_status, unknown_body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "mallory", "password": STRONG_PASSWORD })),
        None,
    )
    .await;
    let (wrong_status, wrong_body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "alice", "password": "Wrong!Pass9zQ" })),
        None,
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body["message"], wrong_body["message"]);
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let ctx = TestContext::new();
    let activation = sign_up(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;
    send_json(
        &ctx,
        "GET",
        &format!("/v1/auth/activate?token={}", activation),
        None,
        None,
    )
    .await;

    let (_, tokens) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "alice", "password": STRONG_PASSWORD })),
        None,
    )
    .await;

    let refresh_token = tokens["refresh_token"].as_str().expect("refresh token");
    let access_token = tokens["access_token"].as_str().expect("access token");

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": refresh_token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    // An access token is not accepted in place of a refresh token
    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/refresh",
        Some(json!({ "refresh_token": access_token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let ctx = TestContext::new();
    active_account_token(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;

    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/request_password_reset",
        Some(json!({ "email": "alice@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let reset_token = token_from_link(&ctx.last_reset_link());
    let new_password = "Nw4$hT8u&bQ1";

    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/password_reset",
        Some(json!({
            "token": reset_token,
            "new_password": new_password,
            "confirm_password": new_password,
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password is dead, new one signs in
    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "alice", "password": STRONG_PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "alice", "password": new_password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_request_for_unknown_email() {
    let ctx = TestContext::new();

    let (status, _) = send_json(
        &ctx,
        "POST",
        "/v1/auth/request_password_reset",
        Some(json!({ "email": "nobody@example.com" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_reset_mismatched_confirmation() {
    let ctx = TestContext::new();
    let activation = sign_up(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;

    let (status, body) = send_json(
        &ctx,
        "POST",
        "/v1/auth/password_reset",
        Some(json!({
            "token": activation,
            "new_password": "Nw4$hT8u&bQ1",
            "confirm_password": "different",
        })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_array().expect("details should be a list");
    assert!(details
        .iter()
        .any(|d| d["message"].as_str().unwrap_or("").contains("do not match")));
}

#[tokio::test]
async fn test_tasks_require_authentication() {
    let ctx = TestContext::new();

    let (status, _) = send_json(&ctx, "GET", "/v1/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tasks_reject_non_access_tokens() {
    let ctx = TestContext::new();
    let activation = sign_up(&ctx, "alice", "alice@example.com", STRONG_PASSWORD).await;
    send_json(
        &ctx,
        "GET",
        &format!("/v1/auth/activate?token={}", activation),
        None,
        None,
    )
    .await;

    let (_, tokens) = send_json(
        &ctx,
        "POST",
        "/v1/auth/sign_in",
        Some(json!({ "username": "alice", "password": STRONG_PASSWORD })),
        None,
    )
    .await;
    let refresh_token = tokens["refresh_token"].as_str().expect("refresh token");

    let (status, _) = send_json(&ctx, "GET", "/v1/tasks", None, Some(refresh_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let (status, body) = send_json(&ctx, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"].is_string());
    assert!(body["version"].is_string());
}
