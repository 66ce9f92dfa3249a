//! Gratitude activity (spec §4.6.d), grounded on
//! `original_source/.../activities/gratitude.py`: records one accumulated gratitude
//! note, persists it, and hands off straight into SmallTalk seeded with the note text.

use std::time::Duration;

use super::{Activity, ActivityContext, ActivityKind, NextAction, PendingSeed, SilenceWatcher, TerminationPhraseDetector};
use crate::activity::block_on;
use crate::audio::CaptureHandle;
use crate::error::ActivityError;
use crate::vendor::{IDLE_POLL_INTERVAL, Transcript};

pub struct Gratitude {
    capture: Option<CaptureHandle>,
}

impl Gratitude {
    pub fn new() -> Self {
        Self { capture: None }
    }
}

impl Default for Gratitude {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for Gratitude {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Gratitude
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.capture = Some(ctx.audio.open_capture()?);
        let prompts = ctx.language.activity("gratitude");
        if let Some(start) = prompts.prompts.get("start") {
            speak(ctx, start);
        }
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("gratitude");
        let termination = TerminationPhraseDetector::new(prompts.termination_phrases.clone(), true);
        let silence = SilenceWatcher::new();
        let timeout = Duration::from_secs_f32(ctx.config.silence_timeout_s);

        let mut accumulated: Vec<String> = Vec::new();
        loop {
            if ctx.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                return Ok(NextAction::Terminate);
            }

            let capture = self.capture.as_ref().expect("capture open");
            let mut stopped_on_termination = false;
            let mut heard_final = false;
            ctx.stt.stream_recognize(capture, true, false, IDLE_POLL_INTERVAL, &mut |t: Transcript| {
                if !t.is_final || t.text.is_empty() {
                    return super::ActivityControl::Continue;
                }
                if termination.is_termination_phrase(&t.text, true) {
                    stopped_on_termination = true;
                    return super::ActivityControl::Cancelled;
                }
                heard_final = true;
                accumulated.push(t.text);
                super::ActivityControl::Continue
            })?;

            if stopped_on_termination {
                break;
            }

            if heard_final {
                silence.notify_activity();
                continue;
            }

            if silence.elapsed() >= timeout {
                break;
            }
        }

        let gratitude_text = accumulated.join(" ").trim().to_string();
        if gratitude_text.is_empty() {
            if let Some(no_content) = prompts.prompts.get("no_content") {
                speak(ctx, no_content);
            }
            return Ok(NextAction::ReturnToIdle);
        }

        let _ = block_on(ctx.persistence.save_gratitude_item(&ctx.user_id, &gratitude_text));
        if let Some(saved) = prompts.prompts.get("saved") {
            speak(ctx, saved);
        }

        let seed_template = prompts
            .prompts
            .get("seed_system_prompt")
            .cloned()
            .unwrap_or_else(|| "The user just shared a gratitude note: '{gratitude_note}'.".to_string());
        let opener = prompts.prompts.get("opener").cloned().unwrap_or_else(|| "What else is on your mind?".to_string());

        *ctx.pending_seed.lock().unwrap() = Some(PendingSeed {
            system_prompt_addendum: seed_template.replace("{gratitude_note}", &gratitude_text),
            opener,
        });

        Ok(NextAction::Route(ActivityKind::SmallTalk))
    }

    fn cleanup(&mut self, _ctx: &ActivityContext) {
        self.capture = None;
    }
}

fn speak(ctx: &ActivityContext, text: &str) {
    let chunks = crate::vendor::split_sentences(text);
    let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
        ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
        super::ActivityControl::Continue
    });
}
