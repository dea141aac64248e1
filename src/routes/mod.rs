pub mod auth;
pub mod chat;
pub mod goals;
pub mod mindfulness;
pub mod mood;
pub mod profile;
pub mod tasks;

use axum::Router;
use axum::routing::{get, post, put};
use serde::{Deserialize, Deserializer};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify-email", get(auth::verify_email))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/change-password", post(auth::change_password))
        .route(
            "/api/auth/profile",
            get(profile::get).put(profile::update),
        )
        // Mood log
        .route(
            "/api/mood-log",
            get(mood::list).post(mood::create).delete(mood::clear),
        )
        .route("/api/mood-log/stats", get(mood::stats))
        .route(
            "/api/mood-log/{id}",
            get(mood::get)
                .patch(mood::update)
                .put(mood::update)
                .delete(mood::delete),
        )
        // Tasks
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route(
            "/api/tasks/{id}",
            get(tasks::get).patch(tasks::update).delete(tasks::delete),
        )
        .route("/api/tasks/complete/{id}", put(tasks::complete))
        // Goals
        .route("/api/goals", get(goals::list).post(goals::create))
        .route(
            "/api/goals/{id}",
            get(goals::get).patch(goals::update).delete(goals::delete),
        )
        // Mindfulness
        .route(
            "/api/mindfulness/sessions",
            get(mindfulness::list)
                .post(mindfulness::create)
                .delete(mindfulness::clear),
        )
        // Chat
        .route("/api/chat", post(chat::send))
        .route(
            "/api/chat/messages",
            get(chat::list).delete(chat::clear),
        )
        .route(
            "/api/chat/messages/{id}",
            get(chat::get).delete(chat::delete),
        )
}

/// Lets a PATCH body tell "absent" apart from an explicit `null`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
