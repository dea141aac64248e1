pub mod chat_messages;
pub mod goals;
pub mod mindfulness_sessions;
pub mod mood_entries;
pub mod refresh_tokens;
pub mod tasks;
pub mod users;
