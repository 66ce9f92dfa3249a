//! Core error kinds shared across the orchestrator.
//!
//! `Termination` from the source system's exception-driven cancellation is deliberately
//! not a variant here: it is a control-flow signal, not an error, and is modeled instead
//! by [`crate::activity::ActivityControl`].

use std::path::PathBuf;

use thiserror::Error;

/// Error kinds raised by the core (vendor-agnostic, per the component specification).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Microphone or speaker unavailable or already owned by another caller.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A vendor call (STT/TTS/LLM) failed transiently; retried within policy budget.
    #[error("vendor transient error: {0}")]
    VendorTransient(String),

    /// A vendor call failed in a way retries cannot fix (bad credentials, bad model).
    #[error("vendor fatal error: {0}")]
    VendorFatal(String),

    /// Configuration is invalid; discovered at init, the process refuses to start.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A persistence call failed; logged, the user is told verbally when possible.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Microphone / speaker device failures.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("capture device already open")]
    Busy,
    #[error("audio device unavailable: {0}")]
    Unavailable(String),
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
}

/// Configuration validation failures, discovered at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required file not found: {0}")]
    MissingFile(PathBuf),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },
}

/// Failures from the persistence interface (§6.4); the store itself lives outside this crate.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence call failed: {0}")]
    Failed(String),
    #[error("record not found")]
    NotFound,
    #[error("io error writing persisted state: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors an [`Activity`](crate::activity::Activity) may return from `initialize`/`run`.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("activity not initialized")]
    NotInitialized,
}

impl From<DeviceError> for ActivityError {
    fn from(e: DeviceError) -> Self {
        ActivityError::Core(CoreError::Device(e))
    }
}
