//! Configuration surface for the voice orchestrator (spec §6.6).
//!
//! [`AppConfig`] is the process-wide CLI/env surface (clap); [`LanguageConfig`] and
//! friends are the per-language, per-activity data tables (phrases, prompts, intent
//! keywords) loaded from JSON, mirroring how the source system layers a global numeric
//! config over a per-language resource bundle. Both are resolved once at startup into
//! an explicit [`ActivityContext`](crate::activity::ActivityContext) rather than
//! re-resolved per call from an ambient cache.

mod app_config;
mod language;
mod voices;

pub use app_config::{AppConfig, InterruptMode, Provider};
pub use language::{ActivityPrompts, GlobalConfig, LanguageConfig, load_language_config};
pub use voices::{get_voice, print_voice_info, print_voices};
