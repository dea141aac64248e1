//! Chat relay: persists the conversation and forwards recent turns to a
//! completion model.

pub mod gemini;
pub mod preamble;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db;
use crate::models::{ChatMessage, ChatRole};
use crate::state::AppState;

/// Messages kept per user after each exchange.
pub const HISTORY_LIMIT: i64 = 50;
/// Newest messages loaded as context, including the one just saved.
pub const CONTEXT_WINDOW: i64 = 10;

pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct CompletionError {
    pub message: String,
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for CompletionError {
    fn from(s: String) -> Self {
        CompletionError { message: s }
    }
}

impl From<&str> for CompletionError {
    fn from(s: &str) -> Self {
        CompletionError {
            message: s.to_string(),
        }
    }
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn name(&self) -> &str;
    /// `contents` alternates user/assistant and always ends with a user turn.
    async fn complete(&self, contents: &[Turn]) -> Result<String, CompletionError>;
}

/// Builds the request contents from prior history (newest first, current
/// message excluded) and the current message.
pub fn build_context(prior_newest_first: &[ChatMessage], current: &str, preamble: &str) -> Vec<Turn> {
    let mut turns: Vec<Turn> = prior_newest_first
        .iter()
        .rev()
        .filter_map(|msg| {
            ChatRole::parse(&msg.role).map(|role| Turn {
                role,
                text: msg.content.clone(),
            })
        })
        .skip_while(|turn| turn.role != ChatRole::User)
        .collect();

    match turns.first_mut() {
        None => vec![Turn::user(format!(
            "{preamble}\n\nUser: {current}\nAssistant:"
        ))],
        Some(first) => {
            first.text = format!("{preamble}\n\n{}", first.text);
            turns.push(Turn::user(current));
            turns
        }
    }
}

/// Runs one exchange. The user message and exactly one assistant message are
/// always persisted; upstream failures yield the fallback reply.
pub async fn respond(state: &AppState, user_id: Uuid, message: &str) -> Result<String, sqlx::Error> {
    let saved = db::chat_messages::create(&state.pool, user_id, ChatRole::User.as_str(), message)
        .await?;

    let recent = db::chat_messages::list_recent(&state.pool, user_id, CONTEXT_WINDOW).await?;
    let prior: Vec<ChatMessage> = recent.into_iter().filter(|m| m.id != saved.id).collect();
    let contents = build_context(&prior, message, preamble::SYSTEM_PREAMBLE);

    let reply = match &state.completion {
        Some(model) => match model.complete(&contents).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("{} returned an empty completion", model.name());
                FALLBACK_MESSAGE.to_string()
            }
            Err(e) => {
                tracing::error!("{} completion failed: {e}", model.name());
                FALLBACK_MESSAGE.to_string()
            }
        },
        None => {
            tracing::warn!("No completion model configured; replying with fallback");
            FALLBACK_MESSAGE.to_string()
        }
    };

    db::chat_messages::create(&state.pool, user_id, ChatRole::Assistant.as_str(), &reply).await?;

    let pruned = db::chat_messages::prune(&state.pool, user_id, HISTORY_LIMIT).await?;
    if pruned > 0 {
        tracing::debug!(%user_id, pruned, "Pruned chat history");
    }

    Ok(reply)
}
