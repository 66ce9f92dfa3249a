//! Process-wide configuration surface (spec §6.6).
//!
//! Generalizes the source system's scattered numeric constants and environment lookups
//! into a single `clap`-derived struct resolved once at startup.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Inference backend for the on-device STT/TTS models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Cpu,
    Cuda,
    CoreMl,
}

impl Provider {
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

/// Whether TTS playback may be interrupted by the user talking over it, or must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptMode {
    Always,
    Wait,
}

/// Full process configuration: vendor/model paths, timing contracts, and activity policy.
#[derive(Parser, Debug, Clone)]
#[command(name = "voice-orchestrator", about = "Real-time voice activity orchestrator")]
pub struct AppConfig {
    /// Print the available TTS voices and exit.
    #[arg(long)]
    pub list_voices: bool,

    /// Print details for a single voice and exit.
    #[arg(long)]
    pub voice_info: Option<String>,

    /// Directory containing VAD/Whisper/Kokoro model files.
    #[arg(long, env = "VOICE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Capture/playback sample rate in Hz.
    #[arg(long, env = "VOICE_SAMPLE_RATE", default_value_t = 16000)]
    pub sample_rate: u32,

    /// Silero VAD speech-probability threshold.
    #[arg(long, env = "VOICE_VAD_THRESHOLD", default_value_t = 0.5)]
    pub vad_threshold: f32,

    /// Silence duration (seconds) the VAD requires to end an utterance.
    #[arg(long, env = "VOICE_VAD_SILENCE_DURATION", default_value_t = 0.5)]
    pub vad_silence_duration: f32,

    /// Ollama base URL.
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Ollama model name.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    pub ollama_model: String,

    /// System prompt injected as the dialog session preamble (spec §4.5).
    #[arg(long, env = "VOICE_SYSTEM_PROMPT", default_value = "You are a helpful voice assistant.")]
    pub system_prompt: String,

    /// LLM sampling temperature, 0.0-2.0.
    #[arg(long, env = "VOICE_TEMPERATURE", default_value_t = 0.7, value_parser = parse_temperature)]
    pub temperature: f32,

    /// Maximum number of user/assistant turns retained in dialog history.
    #[arg(long, env = "VOICE_MAX_HISTORY", default_value_t = 10)]
    pub max_history: usize,

    /// TTS speech-rate multiplier.
    #[arg(long, env = "VOICE_TTS_SPEED", default_value_t = 1.0)]
    pub tts_speed: f32,

    /// TTS voice name (see `--list-voices`).
    #[arg(long, env = "VOICE_TTS_VOICE", default_value = "af_heart")]
    pub tts_voice: String,

    /// TTS speaker id, overrides the voice's default when set.
    #[arg(long, env = "VOICE_TTS_SPEAKER_ID", default_value_t = 0)]
    pub tts_speaker_id: i32,

    /// STT language hint, BCP-47 code.
    #[arg(long, env = "VOICE_STT_LANGUAGE", default_value = "en")]
    pub stt_language: String,

    /// Default inference provider, used unless overridden per-component.
    #[arg(long, env = "VOICE_PROVIDER", value_enum)]
    provider: Option<Provider>,

    /// STT-specific inference provider override.
    #[arg(long, env = "VOICE_STT_PROVIDER", value_enum)]
    stt_provider: Option<Provider>,

    /// TTS-specific inference provider override.
    #[arg(long, env = "VOICE_TTS_PROVIDER", value_enum)]
    tts_provider: Option<Provider>,

    /// Verbose (debug) logging.
    #[arg(long, short)]
    pub verbose: bool,

    /// Wake phrase the Wake-Word Watcher listens for (spec §4.2).
    #[arg(long, env = "VOICE_WAKE_WORD", default_value = "hey assistant")]
    pub wake_word: String,

    /// Interrupt policy for TTS playback while the user is speaking.
    #[arg(long, env = "VOICE_INTERRUPT_MODE", value_enum, default_value_t = InterruptMode::Wait)]
    pub interrupt_mode: InterruptMode,

    /// Delay after TTS playback before the mic is unmuted, milliseconds.
    #[arg(long, env = "VOICE_POST_PLAYBACK_DELAY_MS", default_value_t = 200)]
    pub post_playback_delay_ms: u64,

    /// Seconds of continuous silence before the silence watcher fires its first nudge.
    #[arg(long, env = "VOICE_SILENCE_TIMEOUT_S", default_value_t = 8.0)]
    pub silence_timeout_s: f32,

    /// Seconds after a nudge before the activity times out and returns to idle.
    #[arg(long, env = "VOICE_NUDGE_TIMEOUT_S", default_value_t = 10.0)]
    pub nudge_timeout_s: f32,

    /// Delay before playing a nudge prompt, milliseconds (lets trailing audio settle).
    #[arg(long, env = "VOICE_NUDGE_PRE_DELAY_MS", default_value_t = 300)]
    pub nudge_pre_delay_ms: u64,

    /// Delay after playing a nudge prompt before resuming listening, milliseconds.
    #[arg(long, env = "VOICE_NUDGE_POST_DELAY_MS", default_value_t = 300)]
    pub nudge_post_delay_ms: u64,

    /// Seconds of trailing silence after a final transcript before a paragraph is
    /// considered complete (Journal activity).
    #[arg(long, env = "VOICE_PAUSE_FINALIZATION_S", default_value_t = 2.0)]
    pub pause_finalization_s: f32,

    /// Minimum word (or CJK character) count for a transcript to count as substantive content.
    #[arg(long, env = "VOICE_MIN_WORDS_THRESHOLD", default_value_t = 3)]
    pub min_words_threshold: usize,

    /// Maximum number of activity turns before forced termination.
    #[arg(long, env = "VOICE_MAX_TURNS", default_value_t = 20)]
    pub max_turns: usize,

    /// Default mood/persona used when no persisted user persona is available.
    #[arg(long, env = "VOICE_DEFAULT_MOOD", default_value = "neutral")]
    pub default_mood: String,

    /// Use pre-recorded audio files for fixed prompts instead of synthesizing them.
    #[arg(long, env = "VOICE_USE_AUDIO_FILES")]
    pub use_audio_files: bool,

    /// Directory of pre-recorded prompt audio files, used when `use_audio_files` is set.
    #[arg(long, env = "VOICE_AUDIO_FILES_DIR")]
    audio_files_dir: Option<PathBuf>,

    /// Per-call STT timeout, seconds.
    #[arg(long, env = "VOICE_STT_TIMEOUT_S", default_value_t = 30.0)]
    pub stt_timeout_s: f32,

    /// Delay before the meditation activity starts playing guidance, seconds.
    #[arg(long, env = "VOICE_MEDITATION_START_DELAY_S", default_value_t = 2.0)]
    pub meditation_start_delay_s: f32,

    /// Intervention service base URL (spec §6.5); polling is disabled if unset.
    #[arg(long, env = "VOICE_INTERVENTION_URL")]
    pub intervention_url: Option<String>,

    /// Intervention poll interval, minutes.
    #[arg(long, env = "VOICE_POLL_INTERVAL_MINUTES", default_value_t = 15)]
    pub poll_interval_minutes: u64,

    /// Directory holding per-language JSON resource bundles (spec §9 config redesign).
    #[arg(long, env = "VOICE_LANGUAGE_CONFIG_DIR")]
    language_config_dir: Option<PathBuf>,

    /// Directory holding persisted state (intervention record, persona fallback file).
    #[arg(long, env = "VOICE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// CPU thread count override; 0 lets the process pick a platform-appropriate default.
    #[arg(long, env = "VOICE_NUM_THREADS", default_value_t = 0)]
    pub num_threads: usize,

    #[arg(skip)]
    pub vad_threads: usize,
    #[arg(skip)]
    pub stt_threads: usize,
    #[arg(skip)]
    pub tts_threads: usize,
}

impl AppConfig {
    /// Parse CLI/env arguments, handling early-exit flags and deriving thread counts.
    pub fn from_args() -> Self {
        let mut config = Self::parse();

        if config.list_voices {
            super::print_voices();
            std::process::exit(0);
        }
        if let Some(name) = &config.voice_info {
            super::print_voice_info(name);
            std::process::exit(0);
        }

        config.normalize_thread_counts();
        config
    }

    fn normalize_thread_counts(&mut self) {
        let provider = self.effective_provider();
        let base = if self.num_threads > 0 { self.num_threads } else { num_cpus::get() };

        let (vad, stt, tts) = match provider {
            Provider::Cuda => (1, 1, 1),
            _ => (base.min(4), base.min(4), base.min(2).max(1)),
        };
        self.vad_threads = vad;
        self.stt_threads = stt;
        self.tts_threads = tts;
    }

    fn effective_provider(&self) -> Provider {
        self.provider.unwrap_or_else(detect_provider)
    }

    pub fn effective_stt_provider(&self) -> Provider {
        self.stt_provider.unwrap_or_else(|| self.effective_provider())
    }

    pub fn effective_tts_provider(&self) -> Provider {
        self.tts_provider.unwrap_or_else(|| self.effective_provider())
    }

    pub fn model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(default_model_dir)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| default_model_dir().join("state"))
    }

    pub fn language_config_dir(&self) -> PathBuf {
        self.language_config_dir.clone().unwrap_or_else(|| self.model_dir().join("languages"))
    }

    pub fn audio_files_dir(&self) -> Option<&Path> {
        self.audio_files_dir.as_deref()
    }

    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.model_dir().join("whisper-encoder.onnx")
    }

    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.model_dir().join("whisper-decoder.onnx")
    }

    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.model_dir().join("whisper-tokens.txt")
    }

    pub fn vad_model_path(&self) -> PathBuf {
        self.model_dir().join("silero_vad.onnx")
    }

    pub fn tts_model_path(&self) -> PathBuf {
        self.model_dir().join("kokoro-model.onnx")
    }

    pub fn tts_voices_path(&self) -> PathBuf {
        self.model_dir().join("voices.bin")
    }

    pub fn tts_tokens_path(&self) -> PathBuf {
        self.model_dir().join("tokens.txt")
    }

    pub fn tts_data_dir(&self) -> PathBuf {
        self.model_dir().join("espeak-ng-data")
    }

    pub fn tts_dict_dir(&self) -> PathBuf {
        self.model_dir().join("dict")
    }

    pub fn tts_lexicon(&self) -> String {
        let lexicon = self.model_dir().join("lexicon-us-en.txt");
        if lexicon.exists() { lexicon.to_string_lossy().to_string() } else { String::new() }
    }

    pub fn tts_language(&self) -> String {
        super::get_voice(&self.tts_voice).map(|v| v.language.to_string()).unwrap_or_else(|| "en-us".to_string())
    }

    /// Validate required files and numeric ranges, per spec §7 (ConfigError, fail at startup).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model_dir = self.model_dir();
        if !model_dir.exists() {
            return Err(ConfigError::MissingFile(model_dir));
        }
        for path in [
            self.whisper_encoder_path(),
            self.whisper_decoder_path(),
            self.whisper_tokens_path(),
            self.vad_model_path(),
            self.tts_model_path(),
            self.tts_voices_path(),
            self.tts_tokens_path(),
        ] {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path));
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue { field: "temperature", reason: "must be within 0.0..=2.0".into() });
        }
        if self.max_turns == 0 {
            return Err(ConfigError::InvalidValue { field: "max_turns", reason: "must be at least 1".into() });
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!(model_dir = %self.model_dir().display(), sample_rate = self.sample_rate, ollama_model = %self.ollama_model, "resolved configuration");
    }
}

fn default_model_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".voice-assistant").join("models")
}

#[cfg(target_os = "macos")]
fn detect_provider() -> Provider {
    Provider::CoreMl
}

#[cfg(target_os = "linux")]
fn detect_provider() -> Provider {
    if has_nvidia_gpu() { Provider::Cuda } else { Provider::Cpu }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn detect_provider() -> Provider {
    Provider::Cpu
}

#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    Path::new("/dev/nvidia0").exists() || Path::new("/dev/nvidiactl").exists() || Path::new("/proc/device-tree/compatible").exists() && std::fs::read_to_string("/proc/device-tree/compatible").map(|s| s.contains("tegra")).unwrap_or(false)
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{s}' is not a valid number"))?;
    if !(0.0..=2.0).contains(&value) {
        return Err("temperature must be within 0.0..=2.0".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_temperature_rejects_out_of_range() {
        assert!(parse_temperature("3.5").is_err());
        assert!(parse_temperature("-0.1").is_err());
        assert!(parse_temperature("1.2").is_ok());
    }
}
