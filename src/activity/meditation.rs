//! Meditation activity (spec §4.6.f), grounded on
//! `original_source/.../activities/meditation.py`: plays a guided-meditation audio file
//! on its own playback path (exempt from the mute discipline per spec §3.2 invariant 3 —
//! only TTS/nudge/termination/wake-acknowledge audio mute the mic) while a listener task
//! polls an audio-intent recognizer for a "termination" intent. Whichever of
//! `audio_finished`/`termination_detected` fires first decides the handoff seed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{Activity, ActivityContext, ActivityKind, NextAction, PendingSeed};
use crate::audio::{AudioFabric, FrameWait};
use crate::error::ActivityError;
use crate::vendor::AudioIntentRecognizer;

const TERMINATION_POLL_INTERVAL: Duration = Duration::from_millis(200);
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const JOIN_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Meditation;

impl Meditation {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Meditation {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for Meditation {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Meditation
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let prompts = ctx.language.activity("meditation");
        if let Some(start) = prompts.prompts.get("start_prompt") {
            speak(ctx, start);
        }
        let delay = Duration::from_secs_f32(ctx.config.meditation_start_delay_s);
        thread::sleep(delay);
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("meditation");
        let Some(audio_file) = prompts.prompts.get("audio_file").cloned() else {
            warn!("no meditation audio file configured");
            if let Some(msg) = prompts.prompts.get("missing_audio") {
                speak(ctx, msg);
            }
            return Ok(NextAction::ReturnToIdle);
        };
        let path = PathBuf::from(audio_file);

        let audio_finished = Arc::new(AtomicBool::new(false));
        let termination_detected = Arc::new(AtomicBool::new(false));

        let playback = {
            let audio = ctx.audio.clone();
            let audio_finished = audio_finished.clone();
            let path = path.clone();
            thread::spawn(move || {
                match audio.play_file_concurrent(&path) {
                    Ok(completed) => audio_finished.store(completed, Ordering::SeqCst),
                    Err(e) => warn!(error = %e, "meditation audio playback failed"),
                }
            })
        };

        let listener = {
            let audio = ctx.audio.clone();
            let audio_finished = audio_finished.clone();
            let termination_detected = termination_detected.clone();
            let recognizer = (ctx.audio_intent_factory)();
            thread::spawn(move || listen_for_termination(audio, recognizer, audio_finished, termination_detected))
        };

        while !audio_finished.load(Ordering::SeqCst) && !termination_detected.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
        }

        if termination_detected.load(Ordering::SeqCst) {
            ctx.audio.interrupt_playback();
        }

        join_with_timeout(playback, JOIN_TIMEOUT, "meditation playback thread");
        join_with_timeout(listener, JOIN_TIMEOUT, "meditation termination listener");

        let completed = audio_finished.load(Ordering::SeqCst) && !termination_detected.load(Ordering::SeqCst);
        info!(completed, "meditation session ended");

        let (seed_key, opener_key) = if completed {
            ("seed_system_prompt_completed", "opener_completed")
        } else {
            ("seed_system_prompt_stopped", "opener_stopped")
        };
        let seed = prompts.prompts.get(seed_key).cloned().unwrap_or_else(|| {
            "The user just finished a guided meditation session. Transition into a warm, brief small talk.".to_string()
        });
        let opener = prompts.prompts.get(opener_key).cloned().unwrap_or_else(|| "How are you feeling?".to_string());

        *ctx.pending_seed.lock().unwrap() = Some(PendingSeed { system_prompt_addendum: seed, opener });
        Ok(NextAction::Route(ActivityKind::SmallTalk))
    }

    fn cleanup(&mut self, _ctx: &ActivityContext) {}
}

/// Opens its own capture stream and exclusively owns the recognizer handle for its
/// lifetime — `reset` is only ever called from this task, never concurrently with
/// `process_frame` from elsewhere (spec §9 resolved Open Question).
///
/// Polls with a bounded timeout rather than blocking on `next_frame()` so the loop
/// notices `audio_finished` promptly on the natural-completion path, instead of waiting
/// forever on a capture stream nothing will ever signal again.
fn listen_for_termination(
    audio: Arc<AudioFabric>,
    mut recognizer: Box<dyn AudioIntentRecognizer>,
    audio_finished: Arc<AtomicBool>,
    termination_detected: Arc<AtomicBool>,
) {
    let capture = match audio.open_capture() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "meditation termination listener could not open capture");
            recognizer.delete();
            return;
        }
    };
    recognizer.reset();

    while !audio_finished.load(Ordering::SeqCst) && !termination_detected.load(Ordering::SeqCst) {
        let frame = match capture.next_frame_timeout(TERMINATION_POLL_INTERVAL) {
            FrameWait::Frame(frame) => frame,
            FrameWait::Idle => continue,
            FrameWait::Closed => break,
        };
        if !recognizer.process_frame(&frame) {
            continue;
        }
        match recognizer.get_inference() {
            Some((intent, _confidence)) if intent == "termination" => {
                termination_detected.store(true, Ordering::SeqCst);
                break;
            }
            _ => recognizer.reset(),
        }
    }
    recognizer.delete();
}

/// Waits for `handle` to finish, polling rather than blocking indefinitely so a thread
/// that hangs past `timeout` cannot wedge the orchestrator; the thread is left detached
/// if the deadline passes, since std threads cannot be cancelled from outside.
fn join_with_timeout<T>(handle: thread::JoinHandle<T>, timeout: Duration, name: &str) {
    let deadline = std::time::Instant::now() + timeout;
    let mut handle = Some(handle);
    while let Some(h) = &handle {
        if h.is_finished() {
            let _ = handle.take().unwrap().join();
            return;
        }
        if std::time::Instant::now() >= deadline {
            warn!(name, "thread did not finish within timeout, leaving it detached");
            return;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }
}

fn speak(ctx: &ActivityContext, text: &str) {
    let chunks = crate::vendor::split_sentences(text);
    let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
        ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
        super::ActivityControl::Continue
    });
}
