//! In-memory stand-in for the durable store the persistence interface describes.
//! The real store is explicitly out of scope (spec §1); this exists so the orchestrator
//! has something to construct and so tests can exercise activities end-to-end.

use std::collections::HashMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Persistence, Quote, UserContextBundle};
use crate::error::PersistenceError;

#[derive(Default)]
struct State {
    conversations: HashMap<String, Vec<(String, String)>>,
    journals: HashMap<String, (String, String, String, Vec<String>, bool)>,
    gratitude: Vec<(String, String)>,
    quotes: Vec<Quote>,
    seen_quotes: HashMap<String, Vec<String>>,
    activity_logs: HashMap<String, bool>,
}

pub struct InMemoryPersistence {
    state: Mutex<State>,
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }
}

impl Persistence for InMemoryPersistence {
    async fn start_conversation(&self, title: &str) -> Result<String, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        self.state.lock().await.conversations.insert(id.clone(), vec![("system".into(), title.into())]);
        Ok(id)
    }

    async fn add_message(&self, conversation_id: &str, role: &str, text: &str) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().await;
        let entry = state.conversations.get_mut(conversation_id).ok_or(PersistenceError::NotFound)?;
        entry.push((role.to_string(), text.to_string()));
        Ok(())
    }

    async fn end_conversation(&self, conversation_id: &str) -> Result<(), PersistenceError> {
        if self.state.lock().await.conversations.contains_key(conversation_id) { Ok(()) } else { Err(PersistenceError::NotFound) }
    }

    async fn upsert_journal(&self, user: &str, title: &str, body: &str, mood: &str, topics: &[String], is_draft: bool) -> Result<String, PersistenceError> {
        let id = format!("{user}:{title}");
        self.state.lock().await.journals.insert(id.clone(), (title.to_string(), body.to_string(), mood.to_string(), topics.to_vec(), is_draft));
        Ok(id)
    }

    async fn save_gratitude_item(&self, user: &str, text: &str) -> Result<String, PersistenceError> {
        let mut state = self.state.lock().await;
        state.gratitude.push((user.to_string(), text.to_string()));
        Ok(Uuid::new_v4().to_string())
    }

    async fn fetch_next_quote(&self, user: &str, _religion: &str, _language: &str) -> Result<Option<Quote>, PersistenceError> {
        let state = self.state.lock().await;
        let seen = state.seen_quotes.get(user).cloned().unwrap_or_default();
        Ok(state.quotes.iter().find(|q| !seen.contains(&q.id)).cloned())
    }

    async fn mark_quote_seen(&self, user: &str, quote_id: &str) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().await;
        state.seen_quotes.entry(user.to_string()).or_default().push(quote_id.to_string());
        Ok(())
    }

    async fn get_user_language(&self, _user: &str) -> Result<String, PersistenceError> {
        Ok("en".to_string())
    }

    async fn get_user_religion(&self, _user: &str) -> Result<String, PersistenceError> {
        Ok("none".to_string())
    }

    async fn get_user_context_bundle(&self, _user: &str) -> Result<UserContextBundle, PersistenceError> {
        Ok(UserContextBundle::default())
    }

    async fn log_activity_start(&self, _user: &str, _activity_type: &str, _trigger_type: &str, _time_of_day: &str) -> Result<String, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        self.state.lock().await.activity_logs.insert(id.clone(), false);
        Ok(id)
    }

    async fn log_activity_completion(&self, activity_log_id: &str, completed: bool) -> Result<(), PersistenceError> {
        let mut state = self.state.lock().await;
        *state.activity_logs.get_mut(activity_log_id).ok_or(PersistenceError::NotFound)? = completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conversation_round_trip() {
        let store = InMemoryPersistence::new();
        let id = store.start_conversation("morning check-in").await.unwrap();
        store.add_message(&id, "user", "hello").await.unwrap();
        store.end_conversation(&id).await.unwrap();
    }

    #[tokio::test]
    async fn activity_log_completion_updates_state() {
        let store = InMemoryPersistence::new();
        let id = store.log_activity_start("user-1", "journal", "manual", "morning").await.unwrap();
        store.log_activity_completion(&id, true).await.unwrap();
        assert_eq!(*store.state.lock().await.activity_logs.get(&id).unwrap(), true);
    }
}
