//! SmallTalk activity (spec §4.6.b), grounded on
//! `original_source/.../_pipeline_smalltalk.py`: an open-ended LLM conversation bounded
//! by `max_turns`, using the shared silence watcher and termination phrase detector.

use std::time::Duration;

use super::{block_on, Activity, ActivityContext, ActivityKind, NextAction, SilenceWatcher, TerminationPhraseDetector};
use crate::audio::CaptureHandle;
use crate::dialog::LlmSession;
use crate::error::ActivityError;
use crate::vendor::{IDLE_POLL_INTERVAL, Transcript};

pub struct SmallTalk {
    capture: Option<CaptureHandle>,
    conversation_id: Option<String>,
    seed: Option<super::PendingSeed>,
}

impl SmallTalk {
    pub fn new() -> Self {
        Self { capture: None, conversation_id: None, seed: None }
    }
}

impl Default for SmallTalk {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for SmallTalk {
    fn kind(&self) -> ActivityKind {
        ActivityKind::SmallTalk
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.capture = Some(ctx.audio.open_capture()?);
        self.conversation_id = block_on(ctx.persistence.start_conversation("smalltalk")).ok();
        self.seed = ctx.pending_seed.lock().unwrap().take();
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("smalltalk");
        let termination = TerminationPhraseDetector::new(prompts.termination_phrases.clone(), false);
        let silence = SilenceWatcher::new();
        let timeout = Duration::from_secs_f32(ctx.config.silence_timeout_s);

        let mut session = LlmSession::new((ctx.llm_factory)(), ctx.config.max_turns, ctx.config.temperature);

        if let Some(seed) = self.seed.take() {
            session.seed_context(&seed.system_prompt_addendum);
            speak(ctx, &seed.opener);
        } else if let Some(opening) = prompts.prompts.get("start") {
            speak(ctx, opening);
        }

        let mut turns = 0usize;
        loop {
            if ctx.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                return Ok(NextAction::Terminate);
            }
            if turns >= ctx.config.max_turns {
                return Ok(NextAction::ReturnToIdle);
            }

            let capture = self.capture.as_ref().expect("capture open");
            let mut transcript_text: Option<String> = None;
            ctx.stt.stream_recognize(capture, false, true, IDLE_POLL_INTERVAL, &mut |t: Transcript| {
                if t.is_final && !t.text.is_empty() {
                    transcript_text = Some(t.text);
                }
                super::ActivityControl::Continue
            })?;

            let Some(text) = transcript_text else {
                if silence.elapsed() >= timeout {
                    if let Some(nudge) = prompts.prompts.get("nudge") {
                        speak(ctx, nudge);
                    }
                    return Ok(NextAction::ReturnToIdle);
                }
                continue;
            };
            silence.notify_activity();

            if termination.is_termination_phrase(&text, true) {
                if let Some(farewell) = prompts.prompts.get("termination") {
                    speak(ctx, farewell);
                }
                return Ok(NextAction::ReturnToIdle);
            }

            if let Some(id) = &self.conversation_id {
                let _ = block_on(ctx.persistence.add_message(id, "user", &text));
            }

            let reply = session.send(&text, |sentence| {
                let chunks = vec![sentence];
                let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
                    ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
                    super::ActivityControl::Continue
                });
                super::ActivityControl::Continue
            })?;
            if let Some(id) = &self.conversation_id {
                let _ = block_on(ctx.persistence.add_message(id, "assistant", &reply));
            }
            turns += 1;
        }
    }

    fn cleanup(&mut self, ctx: &ActivityContext) {
        if let Some(id) = self.conversation_id.take() {
            let _ = block_on(ctx.persistence.end_conversation(&id));
        }
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
