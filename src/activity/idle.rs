//! Idle activity (spec §4.6.a): listens for the wake phrase, then matches a spoken
//! intent to one of the other activities.
//!
//! Resolved Open Questions (spec §9 / §4.6.a Expansion): a nudge restarts the STT
//! session rather than resuming the old one, and `nudge_timeout_s` is its own
//! independent clock that restarts from zero at the moment the nudge is spoken — it is
//! not simply "more of the same" silence-watcher elapsed time.

use std::time::{Duration, Instant};

use tracing::info;

use super::{Activity, ActivityContext, ActivityKind, ActivityState, KeywordIntentMatcher, NextAction, SilenceWatcher, TerminationPhraseDetector};
use crate::audio::CaptureHandle;
use crate::error::ActivityError;
use crate::vendor::{IDLE_POLL_INTERVAL, Transcript, WakeWordDetector};

pub struct Idle {
    capture: Option<CaptureHandle>,
    wake_word: Option<Box<dyn WakeWordDetector>>,
    state: ActivityState,
}

impl Idle {
    pub fn new() -> Self {
        Self { capture: None, wake_word: None, state: ActivityState::Prompting }
    }
}

impl Default for Idle {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for Idle {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Idle
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let capture = ctx.audio.open_capture()?;
        let mut wake_word = (ctx.wake_word_factory)();
        wake_word.init()?;
        self.capture = Some(capture);
        self.wake_word = Some(wake_word);
        self.state = ActivityState::Listening;
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("idle");
        let termination = TerminationPhraseDetector::new(prompts.termination_phrases.clone(), false);
        let matcher = KeywordIntentMatcher::from_keyword_list(&prompts.intent_keywords);

        loop {
            if ctx.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                return Ok(NextAction::Terminate);
            }

            let capture = self.capture.take().expect("initialized");
            let mut wake_word = self.wake_word.take().expect("initialized");
            wake_word.start(capture)?;
            let heard = wake_word.wait_for_wake();
            wake_word.stop();

            if !heard {
                self.wake_word = Some(wake_word);
                self.capture = Some(ctx.audio.open_capture()?);
                continue;
            }
            info!("wake phrase heard, listening for intent");

            self.capture = Some(ctx.audio.open_capture()?);
            let result = self.listen_for_intent(ctx, &termination, &matcher, &prompts)?;
            self.wake_word = Some(wake_word);
            if let Some(action) = result {
                return Ok(action);
            }
        }
    }

    fn cleanup(&mut self, _ctx: &ActivityContext) {
        if let Some(mut w) = self.wake_word.take() {
            w.stop();
            w.cleanup();
        }
        self.capture = None;
        self.state = ActivityState::Done;
    }
}

impl Idle {
    fn listen_for_intent(
        &mut self,
        ctx: &ActivityContext,
        termination: &TerminationPhraseDetector,
        matcher: &KeywordIntentMatcher,
        prompts: &crate::config::ActivityPrompts,
    ) -> Result<Option<NextAction>, ActivityError> {
        let silence = SilenceWatcher::new();
        let stt_timeout = Duration::from_secs_f32(ctx.config.stt_timeout_s);
        let nudge_deadline = Duration::from_secs_f32(ctx.config.nudge_timeout_s);
        let mut nudged = false;
        let mut nudge_started_at: Option<Instant> = None;

        loop {
            let capture = self.capture.as_ref().expect("capture open");
            let mut outcome_text: Option<String> = None;

            ctx.stt.stream_recognize(capture, false, true, IDLE_POLL_INTERVAL, &mut |t: Transcript| {
                if t.is_final && !t.text.is_empty() {
                    outcome_text = Some(t.text);
                }
                super::ActivityControl::Continue
            })?;

            if let Some(text) = outcome_text {
                silence.notify_activity();
                nudged = false;

                if termination.is_termination_phrase(&text, true) {
                    return Ok(Some(NextAction::Terminate));
                }
                if let Some(matched) = matcher.match_intent(&text) {
                    return Ok(Some(NextAction::Route(matched.kind)));
                }

                let intervention = ctx.intervention.snapshot();
                let should_suggest = intervention.latest_decision.as_ref().is_some_and(|d| d.trigger_intervention);
                if should_suggest {
                    if let Some(msg) = prompts.prompts.get("unknown_intent_prompt") {
                        self.speak(ctx, msg);
                    }
                    return Ok(Some(NextAction::Route(ActivityKind::ActivitySuggestion)));
                }
                continue;
            }

            if !nudged && silence.elapsed() >= stt_timeout {
                nudged = true;
                nudge_started_at = Some(Instant::now());
                if let Some(msg) = prompts.prompts.get("nudge") {
                    self.speak(ctx, msg);
                }
                self.capture = Some(ctx.audio.open_capture()?);
                continue;
            }

            if nudged && nudge_started_at.is_some_and(|t| t.elapsed() >= nudge_deadline) {
                return Ok(None);
            }
        }
    }

    fn speak(&self, ctx: &ActivityContext, text: &str) {
        let chunks = crate::vendor::split_sentences(text);
        let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
            ctx.audio.play_pcm_stream(std::iter::once(pcm), true, ctx.config.nudge_pre_delay_ms, ctx.config.nudge_post_delay_ms);
            super::ActivityControl::Continue
        });
    }
}

