use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    /// Origin of the web frontend. Used for email links and CORS.
    pub frontend_url: String,
    pub max_body_size: usize,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
    pub gemini: Option<GeminiConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("DESKBUDDY_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid DESKBUDDY_HOST: {e}"))?;

        let port: u16 = env_or("DESKBUDDY_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid DESKBUDDY_PORT: {e}"))?;

        let frontend_url = env_or("DESKBUDDY_FRONTEND_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let max_body_size: usize = env_or("DESKBUDDY_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid DESKBUDDY_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("DESKBUDDY_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("DESKBUDDY_SMTP_HOST").ok(),
            std::env::var("DESKBUDDY_SMTP_PORT").ok(),
            std::env::var("DESKBUDDY_SMTP_USER").ok(),
            std::env::var("DESKBUDDY_SMTP_PASS").ok(),
            std::env::var("DESKBUDDY_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid DESKBUDDY_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let gemini = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| GeminiConfig {
                api_key,
                model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
            });

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            frontend_url,
            max_body_size,
            log_level,
            smtp,
            gemini,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
