//! Explicit shared context (spec §9): replaces the source system's global mutable
//! state with a plain struct threaded into every activity's `initialize`/`run`/`cleanup`.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::audio::AudioFabric;
use crate::config::{AppConfig, LanguageConfig};
use crate::intervention::InterventionRecordStore;
use crate::persistence::Persistence;
use crate::vendor::{AudioIntentRecognizer, LlmChatClient, SttStreamer, TtsStreamer, WakeWordDetector};

/// A seeded opener left for SmallTalk by the activity that routed into it (Gratitude,
/// Quote), carrying the note or quote text into the LLM system context (spec §4.6.d/e).
#[derive(Debug, Clone)]
pub struct PendingSeed {
    pub system_prompt_addendum: String,
    pub opener: String,
}

/// Constructs a fresh vendor instance; activities own what they build instead of
/// sharing one mutable vendor handle across activity boundaries (spec §5: message
/// history and per-activity vendor state are not shared across activities).
pub type WakeWordFactory = dyn Fn() -> Box<dyn WakeWordDetector> + Send + Sync;
pub type AudioIntentFactory = dyn Fn() -> Box<dyn AudioIntentRecognizer> + Send + Sync;
pub type LlmFactory = dyn Fn() -> Box<dyn LlmChatClient> + Send + Sync;

pub struct ActivityContext {
    pub audio: Arc<AudioFabric>,
    pub config: Arc<AppConfig>,
    pub language: Arc<LanguageConfig>,
    pub stt: Arc<dyn SttStreamer>,
    pub tts: Arc<dyn TtsStreamer>,
    pub persistence: Arc<dyn Persistence>,
    pub intervention: Arc<InterventionRecordStore>,
    pub wake_word_factory: Arc<WakeWordFactory>,
    pub audio_intent_factory: Arc<AudioIntentFactory>,
    pub llm_factory: Arc<LlmFactory>,
    pub user_id: String,
    /// Set by the Orchestrator's shutdown sequence; activities poll it between turns
    /// so a long-running listen loop can unwind cooperatively (spec §9).
    pub shutdown: Arc<AtomicBool>,
    /// One-shot handoff slot: an activity routing into SmallTalk writes here before
    /// returning `NextAction::Route(ActivityKind::SmallTalk)`; SmallTalk takes it in
    /// `initialize` and clears it.
    pub pending_seed: Mutex<Option<PendingSeed>>,
}
