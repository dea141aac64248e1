pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod timestamp;
pub mod tokens;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::chat::CompletionModel;
use crate::chat::gemini::GeminiModel;
use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let completion: Option<Arc<dyn CompletionModel>> =
        config.gemini.as_ref().and_then(|gemini| match GeminiModel::new(gemini) {
            Ok(model) => {
                tracing::info!("Gemini completion model configured: {}", gemini.model);
                Some(Arc::new(model) as Arc<dyn CompletionModel>)
            }
            Err(e) => {
                tracing::warn!("Gemini not available: {e}");
                None
            }
        });

    build_app_with(pool, config, completion)
}

/// Same as [`build_app`] with an explicit completion model.
pub fn build_app_with(
    pool: PgPool,
    config: Config,
    completion: Option<Arc<dyn CompletionModel>>,
) -> Router {
    let mailer = match Mailer::new(config.smtp.as_ref(), &config.frontend_url) {
        Ok(mailer) => {
            if mailer.is_configured() {
                tracing::info!("SMTP configured");
            }
            mailer
        }
        Err(e) => {
            tracing::warn!("SMTP not available: {e}");
            Mailer::disabled(&config.frontend_url)
        }
    };

    let cors = cors_layer(&config.frontend_url);
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        mailer,
        completion,
        login_limiter: LoginRateLimiter::new(),
    });

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .layer(cors),
        )
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            tracing::warn!("Frontend URL {frontend_url:?} is not a valid origin; CORS disabled");
            base
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
