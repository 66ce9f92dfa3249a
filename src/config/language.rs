//! Per-language, per-activity resource bundles (spec §9 config redesign).
//!
//! The source system resolves a user's language from the database on every call and
//! re-reads a JSON bundle through an ambient cache. Here the bundle for the configured
//! language is loaded once at startup into [`LanguageConfig`] and carried in the
//! `ActivityContext` for the life of the process — no re-resolution, no cache.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prompts and keyword lists a single activity needs in one language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPrompts {
    #[serde(default)]
    pub prompts: HashMap<String, String>,
    #[serde(default)]
    pub intent_keywords: Vec<String>,
    #[serde(default)]
    pub termination_phrases: Vec<String>,
}

/// Phrases shared across every activity (greetings, nudges, unknown-intent fallback).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub phrases: HashMap<String, String>,
    #[serde(default)]
    pub wake_word_aliases: Vec<String>,
}

/// The full per-language resource bundle: one [`GlobalConfig`] plus one
/// [`ActivityPrompts`] per activity name (`"idle"`, `"smalltalk"`, `"journal"`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub language: String,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub activities: HashMap<String, ActivityPrompts>,
}

impl LanguageConfig {
    pub fn activity(&self, name: &str) -> ActivityPrompts {
        self.activities.get(name).cloned().unwrap_or_default()
    }

    pub fn phrase(&self, key: &str) -> Option<&str> {
        self.global.phrases.get(key).map(String::as_str)
    }
}

/// Load `{dir}/{language}.json`, falling back to `{dir}/en.json` if the requested
/// language bundle is missing, per the source system's default-language fallback.
pub fn load_language_config(dir: &Path, language: &str) -> Result<LanguageConfig, ConfigError> {
    let primary = dir.join(format!("{language}.json"));
    let path = if primary.exists() { primary } else { dir.join("en.json") };

    if !path.exists() {
        return Err(ConfigError::MissingFile(path));
    }

    let raw = fs::read_to_string(&path).map_err(|_| ConfigError::MissingFile(path.clone()))?;
    let mut config: LanguageConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
    config.language = language.to_string();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_lookup_defaults_when_missing() {
        let config = LanguageConfig { language: "en".into(), ..Default::default() };
        assert!(config.activity("journal").prompts.is_empty());
    }
}
