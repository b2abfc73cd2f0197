//! End-to-end account lifecycle tests against the full router.

mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn full_account_lifecycle() {
    let app = TestApp::spawn().await;

    // Register and capture the emailed code.
    let (user_id, code) = app
        .register_and_fetch_code("alice@example.com", "password123")
        .await;

    // Login before verification is rejected.
    let (status, _) = app
        .post_json(
            "/auth/login",
            serde_json::json!({ "email": "alice@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The emailed link activates the account.
    let (status, body) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, code),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {}", body);

    // Replaying the same link reports the code as used.
    let (status, _) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, code),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Login now issues a token pair.
    let (status, body) = app
        .post_json(
            "/auth/login",
            serde_json::json!({ "email": "alice@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access_token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["refresh_token"].as_str().is_some());

    // The access token authenticates protected calls.
    let (status, body) = app.get("/users/me", Some(&access_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["verified"], true);

    // Logout revokes the access token immediately.
    let (status, _) = app
        .post_json_auth("/auth/logout", serde_json::json!({}), &access_token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/users/me", Some(&access_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let app = TestApp::spawn().await;

    let (user_id, code) = app
        .register_and_fetch_code("bob@example.com", "password123")
        .await;
    let (status, _) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, code),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (wrong_pw_status, wrong_pw_body) = app
        .post_json(
            "/auth/login",
            serde_json::json!({ "email": "bob@example.com", "password": "not-the-password" }),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .post_json(
            "/auth/login",
            serde_json::json!({ "email": "nobody@example.com", "password": "password123" }),
        )
        .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post_json(
            "/auth/register",
            serde_json::json!({ "email": "carol@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post_json(
            "/auth/register",
            serde_json::json!({ "email": "carol@example.com", "password": "password456" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_code_is_rejected_without_consuming_the_real_one() {
    let app = TestApp::spawn().await;

    let (user_id, code) = app
        .register_and_fetch_code("dave@example.com", "password123")
        .await;

    let wrong = if code == "000000" { "000001" } else { "000000" };
    let (status, _) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, wrong),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, code),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_supersedes_the_previous_code() {
    let app = TestApp::spawn().await;

    let (user_id, first_code) = app
        .register_and_fetch_code("erin@example.com", "password123")
        .await;

    let (status, _) = app
        .post_json(
            "/auth/verify/resend",
            serde_json::json!({ "email": "erin@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let sent = app.wait_for_emails(2).await;
    let second_code = sent.last().unwrap().code.clone();

    // The superseded code no longer validates (unless the RNG repeated it).
    if first_code != second_code {
        let (status, _) = app
            .get(
                &format!("/auth/verify?user={}&code={}", user_id, first_code),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = app
        .get(
            &format!("/auth/verify?user={}&code={}", user_id, second_code),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_reveals_nothing_about_unknown_addresses() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post_json(
            "/auth/verify/resend",
            serde_json::json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/users/me", Some("garbage-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
