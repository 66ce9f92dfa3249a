//! Persistence interface (spec §6.4): consumed by the core, not implemented here — the
//! durable store (journals, gratitude items, conversations, quotes, user preferences,
//! emotion logs) lives outside this crate's scope (spec §1).

mod fake;

pub use fake::InMemoryPersistence;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// A user's locale and faith-tradition preferences, used to resolve language bundles
/// and pick an appropriate quote source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContextBundle {
    pub persona_summary: Option<String>,
    pub facts: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub id: String,
    pub text: String,
}

/// Everything the Activity Runtime needs from durable storage (spec §6.4).
#[allow(async_fn_in_trait)]
pub trait Persistence: Send + Sync {
    async fn start_conversation(&self, title: &str) -> Result<String, PersistenceError>;
    async fn add_message(&self, conversation_id: &str, role: &str, text: &str) -> Result<(), PersistenceError>;
    async fn end_conversation(&self, conversation_id: &str) -> Result<(), PersistenceError>;

    #[allow(clippy::too_many_arguments)]
    async fn upsert_journal(&self, user: &str, title: &str, body: &str, mood: &str, topics: &[String], is_draft: bool) -> Result<String, PersistenceError>;

    async fn save_gratitude_item(&self, user: &str, text: &str) -> Result<String, PersistenceError>;

    async fn fetch_next_quote(&self, user: &str, religion: &str, language: &str) -> Result<Option<Quote>, PersistenceError>;
    async fn mark_quote_seen(&self, user: &str, quote_id: &str) -> Result<(), PersistenceError>;

    async fn get_user_language(&self, user: &str) -> Result<String, PersistenceError>;
    async fn get_user_religion(&self, user: &str) -> Result<String, PersistenceError>;
    async fn get_user_context_bundle(&self, user: &str) -> Result<UserContextBundle, PersistenceError>;

    async fn log_activity_start(&self, user: &str, activity_type: &str, trigger_type: &str, time_of_day: &str) -> Result<String, PersistenceError>;
    async fn log_activity_completion(&self, activity_log_id: &str, completed: bool) -> Result<(), PersistenceError>;
}
