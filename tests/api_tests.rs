mod common;

use reqwest::StatusCode;
use serde_json::json;

use common::PASSWORD;

const NEW_PASSWORD: &str = "Quiet-Harbor-9081";

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

#[tokio::test]
async fn cors_preflight_allows_frontend_origin() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/auth/login"))
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(resp.headers()["access-control-allow-credentials"], "true");

    common::cleanup(app).await;
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body(vec![b' '; 1_048_576 + 1])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    common::cleanup(app).await;
}

// ── Request bodies ──────────────────────────────────────────────

#[tokio::test]
async fn malformed_json_returns_error_body() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .header("content-type", "application/json")
        .body(r#"{"email": "alice@example.com""#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn wrongly_typed_field_returns_error_body() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .post("/api/auth/login", &json!({ "email": 5, "password": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .body("username=alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_with_malformed_body_returns_error_body() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/api/auth/token/refresh"))
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    common::cleanup(app).await;
}

// ── Registration ────────────────────────────────────────────────

#[tokio::test]
async fn register_creates_unverified_user_with_token() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("alice", "Alice@Example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["email_verified"], false);
    assert_eq!(body["email_sent"], false);
    assert!(body.get("access").is_none());

    let token = app.verification_token("alice@example.com").await;
    assert_eq!(token.map(|t| t.len()), Some(64));

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = common::spawn_app().await;
    app.register("alice", "alice@example.com", PASSWORD).await;

    let (body, status) = app.register("alice2", "ALICE@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_weak_password() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("alice", "alice@example.com", "12345678").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let problems = body["fields"]["password"].as_array().unwrap();
    assert!(problems.iter().any(|p| p.as_str().unwrap().contains("numeric")));

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_reports_missing_fields() {
    let app = common::spawn_app().await;

    let (body, status) = app.post("/api/auth/register", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["password"].is_array());

    common::cleanup(app).await;
}

// ── Email verification ──────────────────────────────────────────

#[tokio::test]
async fn login_blocked_until_verified() {
    let app = common::spawn_app().await;
    app.register("alice", "alice@example.com", PASSWORD).await;

    let (body, status) = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["email_verified"], false);
    assert!(body["error"].as_str().unwrap().contains("verify your email"));

    let (_, status) = app.verify("alice@example.com").await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());
    assert_eq!(body["user"]["email_verified"], true);

    common::cleanup(app).await;
}

#[tokio::test]
async fn verify_clears_token_and_repeat_is_already_verified() {
    let app = common::spawn_app().await;
    app.register("alice", "alice@example.com", PASSWORD).await;
    let token = app.verification_token("alice@example.com").await.unwrap();
    let path = format!("/api/auth/verify-email?token={token}&email=alice@example.com");

    let (body, status) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("verified successfully"));
    assert_eq!(app.verification_token("alice@example.com").await, None);

    let (body, status) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("already verified"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn verify_with_wrong_token_or_email_fails_the_same_way() {
    let app = common::spawn_app().await;
    app.register("alice", "alice@example.com", PASSWORD).await;
    let token = app.verification_token("alice@example.com").await.unwrap();

    let (wrong_token, status) = app
        .get("/api/auth/verify-email?token=deadbeef&email=alice@example.com")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (wrong_email, status) = app
        .get(&format!("/api/auth/verify-email?token={token}&email=nobody@example.com"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_token, wrong_email);

    let (_, status) = app.get("/api/auth/verify-email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

// ── Login ───────────────────────────────────────────────────────

#[tokio::test]
async fn login_requires_both_fields() {
    let app = common::spawn_app().await;

    let (_, status) = app.post("/api/auth/login", &json!({ "email": "a@b.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_invalid_credentials() {
    let app = common::spawn_app().await;
    app.signup("alice").await;

    let (body, status) = app.login("alice@example.com", "Wrong-Password-1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (_, status) = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_rate_limited_after_repeated_failures() {
    let app = common::spawn_app().await;
    app.signup("alice").await;

    for _ in 0..5 {
        let (_, status) = app.login("alice@example.com", "Wrong-Password-1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (_, status) = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}

// ── Sessions ────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_require_token() {
    let app = common::spawn_app().await;

    let (_, status) = app.get("/api/auth/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.get_auth("/api/tasks", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    let (body, _) = app.login("alice@example.com", PASSWORD).await;
    let first = body["refresh"].as_str().unwrap().to_string();

    let (body, status) = app
        .post("/api/auth/token/refresh", &json!({ "refresh": first }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["refresh"].as_str().unwrap().to_string();
    assert!(body["access"].is_string());
    assert_ne!(first, second);

    let (_, status) = app
        .post("/api/auth/token/refresh", &json!({ "refresh": first }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reuse revoked every session, including the rotated one.
    let (_, status) = app
        .post("/api/auth/token/refresh", &json!({ "refresh": second }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn logout_invalidates_refresh_token() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    let (body, _) = app.login("alice@example.com", PASSWORD).await;
    let refresh = body["refresh"].as_str().unwrap().to_string();

    let (_, status) = app
        .post("/api/auth/logout", &json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app
        .post("/api/auth/token/refresh", &json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Password reset ──────────────────────────────────────────────

async fn reset_state(app: &common::TestApp, email: &str) -> (Option<String>, bool) {
    sqlx::query_as::<_, (Option<String>, bool)>(
        "SELECT password_reset_token, password_reset_token_expires IS NOT NULL
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_one(&app.pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn forgot_password_never_reveals_accounts() {
    let app = common::spawn_app().await;
    app.signup("alice").await;

    let (known, status) = app
        .post("/api/auth/forgot-password", &json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (unknown, status) = app
        .post("/api/auth/forgot-password", &json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(known, unknown);

    let (token, has_expiry) = reset_state(&app, "alice@example.com").await;
    assert!(token.is_some());
    assert!(has_expiry);

    let (_, status) = app.post("/api/auth/forgot-password", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

fn reset_body(token: &str, email: &str, password: &str) -> serde_json::Value {
    json!({
        "token": token,
        "email": email,
        "new_password": password,
        "confirm_password": password,
    })
}

#[tokio::test]
async fn reset_password_happy_path_is_single_use() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    app.post("/api/auth/forgot-password", &json!({ "email": "alice@example.com" }))
        .await;
    let (token, _) = reset_state(&app, "alice@example.com").await;
    let token = token.unwrap();

    let (body, status) = app
        .post("/api/auth/reset-password", &reset_body(&token, "alice@example.com", NEW_PASSWORD))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(reset_state(&app, "alice@example.com").await, (None, false));

    let (_, status) = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.login("alice@example.com", NEW_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post("/api/auth/reset-password", &reset_body(&token, "alice@example.com", "Another-Gate-555"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired password reset link");

    common::cleanup(app).await;
}

#[tokio::test]
async fn reset_password_unknown_email_and_wrong_token_look_identical() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    app.post("/api/auth/forgot-password", &json!({ "email": "alice@example.com" }))
        .await;
    let (token, _) = reset_state(&app, "alice@example.com").await;

    let (wrong_token, status) = app
        .post("/api/auth/reset-password", &reset_body("0000", "alice@example.com", NEW_PASSWORD))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (unknown_email, status) = app
        .post(
            "/api/auth/reset-password",
            &reset_body(&token.unwrap(), "nobody@example.com", NEW_PASSWORD),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_token, unknown_email);

    common::cleanup(app).await;
}

#[tokio::test]
async fn reset_password_reports_expired_token() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    app.post("/api/auth/forgot-password", &json!({ "email": "alice@example.com" }))
        .await;
    let (token, _) = reset_state(&app, "alice@example.com").await;

    sqlx::query(
        "UPDATE users SET password_reset_token_expires = now() - interval '1 minute'
         WHERE email = $1",
    )
    .bind("alice@example.com")
    .execute(&app.pool)
    .await
    .unwrap();

    let (body, status) = app
        .post(
            "/api/auth/reset-password",
            &reset_body(&token.unwrap(), "alice@example.com", NEW_PASSWORD),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Password reset link has expired. Please request a new one."
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn reset_password_validates_input() {
    let app = common::spawn_app().await;
    app.signup("alice").await;
    app.post("/api/auth/forgot-password", &json!({ "email": "alice@example.com" }))
        .await;
    let token = reset_state(&app, "alice@example.com").await.0.unwrap();

    let mut mismatch = reset_body(&token, "alice@example.com", NEW_PASSWORD);
    mismatch["confirm_password"] = json!("Something-Else-1");
    let (body, status) = app.post("/api/auth/reset-password", &mismatch).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords do not match");

    let (body, status) = app
        .post("/api/auth/reset-password", &reset_body(&token, "alice@example.com", PASSWORD))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("different"));

    let (_, status) = app
        .post("/api/auth/reset-password", &json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // None of the failures consumed the token.
    assert!(reset_state(&app, "alice@example.com").await.0.is_some());

    common::cleanup(app).await;
}

// ── Change password ─────────────────────────────────────────────

#[tokio::test]
async fn change_password_rules_and_session_reissue() {
    let app = common::spawn_app().await;
    let token = app.signup("alice").await;

    let (_, status) = app
        .post_auth(
            "/api/auth/change-password",
            &token,
            &json!({ "current_password": "Wrong-Password-1", "new_password": NEW_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post_auth(
            "/api/auth/change-password",
            &token,
            &json!({ "current_password": PASSWORD, "new_password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .post_auth(
            "/api/auth/change-password",
            &token,
            &json!({ "current_password": PASSWORD, "new_password": NEW_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());

    let (_, status) = app.login("alice@example.com", NEW_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

// ── Profile ─────────────────────────────────────────────────────

#[tokio::test]
async fn profile_get_and_update() {
    let app = common::spawn_app().await;
    let token = app.signup("alice").await;
    app.signup("bobby").await;

    let (body, status) = app.get_auth("/api/auth/profile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["theme_preference"], "light");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("email_verification_token").is_none());

    let (body, status) = app
        .put_auth(
            "/api/auth/profile",
            &token,
            &json!({ "theme_preference": "dark", "notification_enabled": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme_preference"], "dark");
    assert_eq!(body["notification_enabled"], false);
    assert_eq!(body["username"], "alice");

    let (body, status) = app
        .put_auth("/api/auth/profile", &token, &json!({ "theme_preference": "neon" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["theme_preference"].is_array());

    let (body, status) = app
        .put_auth("/api/auth/profile", &token, &json!({ "username": "bobby" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());

    common::cleanup(app).await;
}
