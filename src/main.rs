//! Voice Activity Orchestrator — a long-lived, wake-word-triggered voice assistant
//! process. Wires the Audio I/O Fabric, vendor implementations, persistence,
//! intervention client, and the Orchestrator together, then runs until shutdown.

mod activity;
mod audio;
mod config;
mod dialog;
mod error;
mod intervention;
mod orchestrator;
mod persistence;
mod status;
mod vendor;

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use activity::ActivityContext;
use audio::AudioFabric;
use config::AppConfig;
use intervention::{InterventionClient, InterventionRecordStore};
use orchestrator::Orchestrator;
use persistence::InMemoryPersistence;
use status::StatusBus;
use vendor::{KeywordWakeWordDetector, KokoroTtsStreamer, OllamaLlmClient, SherpaSttStreamer, WhisperAudioIntentRecognizer};

async fn wait_for_shutdown() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler").recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_args();

    let filter = EnvFilter::try_from_default_env().or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") }).unwrap();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("voice activity orchestrator v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration error; run your model-download setup script and re-launch");
        std::process::exit(1);
    }
    config.log_config();

    let language = config::load_language_config(&config.language_config_dir(), &config.stt_language)?;

    let stt: Arc<dyn vendor::SttStreamer> = Arc::new(SherpaSttStreamer::new(&config)?);
    let tts: Arc<dyn vendor::TtsStreamer> = Arc::new(KokoroTtsStreamer::new(&config)?);

    let (status_bus, status_rx) = StatusBus::new();
    let status_bus = Arc::new(status_bus);

    let audio = Arc::new(AudioFabric::new(config.sample_rate, tts.sample_rate(), status_bus.clone())?);

    let persistence: Arc<dyn persistence::Persistence> = Arc::new(InMemoryPersistence::new());

    let state_dir = config.state_dir();
    let intervention_record = Arc::new(InterventionRecordStore::load(state_dir.join("intervention_record.json")));

    let config = Arc::new(config);
    let wake_phrase = config.wake_word.clone();

    let stt_for_wake = stt.clone();
    let wake_word_factory = Arc::new(move || -> Box<dyn vendor::WakeWordDetector> { Box::new(KeywordWakeWordDetector::new(stt_for_wake.clone(), wake_phrase.clone())) });

    let audio_intent_config = config.clone();
    let audio_intent_factory =
        Arc::new(move || -> Box<dyn vendor::AudioIntentRecognizer> { Box::new(WhisperAudioIntentRecognizer::new(&audio_intent_config).expect("audio-intent recognizer init failed")) });

    let llm_config = config.clone();
    let llm_factory = Arc::new(move || -> Box<dyn vendor::LlmChatClient> { Box::new(OllamaLlmClient::new(&llm_config).expect("LLM client init failed")) });

    let shutdown = Arc::new(AtomicBool::new(false));

    let ctx = Arc::new(ActivityContext {
        audio,
        config: config.clone(),
        language: Arc::new(language),
        stt,
        tts,
        persistence,
        intervention: intervention_record.clone(),
        wake_word_factory,
        audio_intent_factory,
        llm_factory,
        user_id: "local-user".to_string(),
        shutdown: shutdown.clone(),
        pending_seed: StdMutex::new(None),
    });

    let mut orchestrator = Orchestrator::new(ctx, status_rx);

    let intervention_client = config.intervention_url.clone().map(|url| Arc::new(InterventionClient::new(url)));
    orchestrator.start(intervention_client, intervention_record, Duration::from_secs(config.poll_interval_minutes * 60));

    wait_for_shutdown().await;

    shutdown.store(true, Ordering::SeqCst);
    orchestrator.shutdown(Duration::from_secs(2)).await;

    info!("voice activity orchestrator stopped");
    Ok(())
}
