//! The Activity Session entity (spec §3).

use chrono::{DateTime, Utc};

use super::{ActivityKind, ActivityState};

#[derive(Debug, Clone)]
pub struct ActivitySession {
    pub kind: ActivityKind,
    pub conversation_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub turn_count: usize,
    pub state: ActivityState,
}

impl ActivitySession {
    pub fn new(kind: ActivityKind) -> Self {
        Self { kind, conversation_id: None, start_time: Utc::now(), turn_count: 0, state: ActivityState::Prompting }
    }
}
