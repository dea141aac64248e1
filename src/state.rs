use std::sync::Arc;

use sqlx::PgPool;

use crate::chat::CompletionModel;
use crate::config::Config;
use crate::email::Mailer;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Mailer,
    pub completion: Option<Arc<dyn CompletionModel>>,
    pub login_limiter: LoginRateLimiter,
}
