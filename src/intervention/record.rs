//! Persisted intervention record and persona fallback file (spec §6.7).
//!
//! `original_source/utils/intervention_record.py` writes these with a plain `json.dump`,
//! which can leave a half-written file if the process dies mid-write. Spec §5 requires
//! the stronger guarantee, so both stores here write to a temp file and rename into
//! place — a deliberate strengthening over the source behavior (see DESIGN.md).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{InterventionDecision, InterventionSuggestion};
use crate::error::PersistenceError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub latest_decision: Option<InterventionDecision>,
    pub latest_suggestion: Option<InterventionSuggestion>,
    pub last_request_time: Option<DateTime<Utc>>,
    pub last_response_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaFallback {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<Vec<String>>,
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Atomic-write JSON store for the intervention record (spec §3's Intervention Record
/// entity, §6.7 shape). The in-process cache is mutex-guarded (spec §5's shared-resource
/// policy); only the poller and the record's own readers touch the file.
pub struct InterventionRecordStore {
    path: PathBuf,
    cache: Mutex<InterventionRecord>,
}

impl InterventionRecordStore {
    pub fn load(path: PathBuf) -> Self {
        let cache = std::fs::read_to_string(&path).ok().and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default();
        Self { path, cache: Mutex::new(cache) }
    }

    pub fn snapshot(&self) -> InterventionRecord {
        self.cache.lock().clone()
    }

    pub fn record_request(&self, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let mut record = self.cache.lock();
        record.last_request_time = Some(at);
        self.persist(&record)
    }

    pub fn record_response(&self, decision: InterventionDecision, suggestion: InterventionSuggestion, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        let mut record = self.cache.lock();
        record.latest_decision = Some(decision);
        record.latest_suggestion = Some(suggestion);
        record.last_response_time = Some(at);
        self.persist(&record)
    }

    fn persist(&self, record: &InterventionRecord) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path, &json)
    }
}

pub struct PersonaFallbackStore {
    path: PathBuf,
}

impl PersonaFallbackStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, persona: &PersonaFallback) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(persona)?;
        write_atomic(&self.path, &json)
    }

    pub fn load(&self) -> Option<PersonaFallback> {
        std::fs::read_to_string(&self.path).ok().and_then(|s| serde_json::from_str(&s).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_atomic_write() {
        let dir = std::env::temp_dir().join(format!("voice-orchestrator-test-{}", std::process::id()));
        let path = dir.join("intervention.json");
        let store = InterventionRecordStore::load(path.clone());

        let decision = InterventionDecision { trigger_intervention: true, confidence_score: 0.9, reasoning: None };
        let suggestion = InterventionSuggestion { ranked_activities: vec![], reasoning: None };
        store.record_response(decision, suggestion, Utc::now()).unwrap();

        let reloaded = InterventionRecordStore::load(path);
        assert!(reloaded.snapshot().latest_decision.unwrap().trigger_intervention);

        let _ = std::fs::remove_dir_all(dir);
    }
}
