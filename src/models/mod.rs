pub mod chat_message;
pub mod goal;
pub mod mindfulness_session;
pub mod mood_entry;
pub mod refresh_token;
pub mod task;
pub mod user;

pub use chat_message::{ChatMessage, ChatRole};
pub use goal::{Goal, GoalStatus};
pub use mindfulness_session::{MindfulnessSession, SessionType};
pub use mood_entry::{Mood, MoodEntry};
pub use refresh_token::RefreshToken;
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::{PublicUser, User};
