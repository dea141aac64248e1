#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use deskbuddy::config::{Config, GeminiConfig};

pub const PASSWORD: &str = "Tr1cky-Lantern-42";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> (Value, StatusCode) {
        self.post("/api/auth/register", &json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post("/api/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Unauthenticated POST with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Reads the pending verification token straight from the database.
    pub async fn verification_token(&self, email: &str) -> Option<String> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT email_verification_token FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .expect("user lookup failed")
    }

    pub async fn verify(&self, email: &str) -> (Value, StatusCode) {
        let token = self
            .verification_token(email)
            .await
            .expect("no verification token");
        self.get(&format!("/api/auth/verify-email?token={token}&email={email}"))
            .await
    }

    /// Register, verify and log in a user. Returns the access token.
    pub async fn signup(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let (body, status) = self.register(username, &email, PASSWORD).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        let (body, status) = self.verify(&email).await;
        assert_eq!(status, StatusCode::OK, "verify failed: {body}");

        let (body, status) = self.login(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access"].as_str().unwrap().to_string()
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PATCH request with JSON body.
    pub async fn patch_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("patch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn database_urls(base_url: &str, db_name: &str) -> (String, String) {
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string());
    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.to_string());
    (admin_url, test_url)
}

/// Spawn a test app with a fresh temporary database and no completion model.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_gemini(None).await
}

/// Spawn a test app whose chat relay talks to the Gemini API at `gemini_url`.
pub async fn spawn_app_with_gemini(gemini_url: Option<String>) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("deskbuddy_test_{}", Uuid::now_v7().to_string().replace('-', ""));
    let (admin_url, test_url) = database_urls(&base_url, &db_name);

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        frontend_url: "http://localhost:3000".to_string(),
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        smtp: None,
        gemini: gemini_url.map(|base_url| GeminiConfig {
            api_key: STUB_API_KEY.to_string(),
            model: "stub-model".to_string(),
            base_url,
        }),
    };

    let app = deskbuddy::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

pub const STUB_API_KEY: &str = "stub-key";

/// Fake `generateContent` endpoint. Records every request body it sees.
pub struct StubGemini {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct StubState {
    requests: Arc<Mutex<Vec<Value>>>,
    reply: Option<String>,
}

async fn stub_generate(
    State(stub): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(STUB_API_KEY) {
        return (axum::http::StatusCode::FORBIDDEN, "bad key").into_response();
    }
    stub.requests.lock().unwrap().push(body);

    match &stub.reply {
        Some(text) => Json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
        .into_response(),
        None => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response(),
    }
}

/// Start a stub that answers every request with `reply`, or with a 500 when
/// `reply` is `None`.
pub async fn spawn_stub_gemini(reply: Option<&str>) -> StubGemini {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/models/{*rest}", post(stub_generate))
        .with_state(StubState {
            requests: requests.clone(),
            reply: reply.map(str::to_string),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Stub failed");
    });

    StubGemini {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Drop stale test databases (useful after test crashes).
pub async fn cleanup_stale_test_dbs() {
    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let (admin_url, _) = database_urls(&base_url, "");

    if let Ok(admin_pool) = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
    {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datname LIKE 'deskbuddy_test_%'",
        )
        .fetch_all(&admin_pool)
        .await
        .unwrap_or_default();

        for db_name in rows {
            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
                .execute(&admin_pool)
                .await;
        }
        admin_pool.close().await;
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");
    let (admin_url, _) = database_urls(&base_url, &db_name);

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
