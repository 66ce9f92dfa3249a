//! Intervention suggestion service (spec §6.5) and its persisted record (spec §6.7).

mod client;
mod poller;
mod record;

pub use client::{InterventionClient, InterventionDecision, InterventionResponse, InterventionSuggestion, RankedActivity};
pub use poller::InterventionPoller;
pub use record::{InterventionRecord, InterventionRecordStore, PersonaFallback, PersonaFallbackStore};
