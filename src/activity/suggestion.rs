//! Activity Suggestion activity (spec §4.6.g), grounded on
//! `original_source/.../activities/activity_suggestion.py`: speaks the intervention
//! service's ranked activity list (or an unranked list of everything on a cold start),
//! listens for a keyword match, and routes to whichever activity the user named.

use std::time::{Duration, Instant};

use super::{Activity, ActivityContext, ActivityKind, KeywordIntentMatcher, NextAction, SilenceWatcher, TerminationPhraseDetector};
use crate::audio::CaptureHandle;
use crate::error::ActivityError;
use crate::intervention::RankedActivity;
use crate::vendor::{IDLE_POLL_INTERVAL, Transcript};

pub struct ActivitySuggestion {
    capture: Option<CaptureHandle>,
}

impl ActivitySuggestion {
    pub fn new() -> Self {
        Self { capture: None }
    }
}

impl Default for ActivitySuggestion {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for ActivitySuggestion {
    fn kind(&self) -> ActivityKind {
        ActivityKind::ActivitySuggestion
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.capture = Some(ctx.audio.open_capture()?);
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("activity_suggestion");
        let termination = TerminationPhraseDetector::new(prompts.termination_phrases.clone(), true);
        let matcher = KeywordIntentMatcher::from_keyword_list(&prompts.intent_keywords);

        greet_with_suggestions(ctx, &prompts);

        let silence = SilenceWatcher::new();
        let timeout = Duration::from_secs_f32(ctx.config.silence_timeout_s);
        let nudge_deadline = Duration::from_secs_f32(ctx.config.nudge_timeout_s);
        let mut nudged = false;
        let mut nudge_started_at: Option<Instant> = None;

        loop {
            if ctx.shutdown.load(std::sync::atomic::Ordering::SeqCst) {
                return Ok(NextAction::Terminate);
            }

            let capture = self.capture.as_ref().expect("capture open");
            let mut transcript: Option<String> = None;
            let mut stopped_on_termination = false;
            ctx.stt.stream_recognize(capture, true, true, IDLE_POLL_INTERVAL, &mut |t: Transcript| {
                if termination.is_termination_phrase(&t.text, true) {
                    stopped_on_termination = true;
                    return super::ActivityControl::Cancelled;
                }
                if t.is_final && !t.text.is_empty() {
                    transcript = Some(t.text);
                }
                super::ActivityControl::Continue
            })?;

            if stopped_on_termination {
                if let Some(msg) = prompts.prompts.get("termination") {
                    speak(ctx, msg);
                }
                return Ok(NextAction::ReturnToIdle);
            }

            if let Some(text) = transcript {
                silence.notify_activity();
                nudged = false;

                if let Some(matched) = matcher.match_intent(&text) {
                    if matched.kind == ActivityKind::SmallTalk {
                        return Ok(NextAction::Route(ActivityKind::SmallTalk));
                    }
                    if let Some(template) = prompts.prompts.get("starting_activity_feedback") {
                        let name = prompts.prompts.get(&format!("activity_name_{}", matched.kind.as_str())).cloned().unwrap_or_else(|| matched.kind.as_str().to_string());
                        speak(ctx, &template.replace("{activity}", &name));
                    }
                    return Ok(NextAction::Route(matched.kind));
                }

                if let Some(msg) = prompts.prompts.get("no_match") {
                    speak(ctx, msg);
                }
                return Ok(NextAction::Route(ActivityKind::SmallTalk));
            }

            if !nudged && silence.elapsed() >= timeout {
                nudged = true;
                nudge_started_at = Some(Instant::now());
                if let Some(msg) = prompts.prompts.get("nudge") {
                    speak(ctx, msg);
                }
                continue;
            }

            if nudged && nudge_started_at.is_some_and(|t| t.elapsed() >= nudge_deadline) {
                if let Some(msg) = prompts.prompts.get("timeout") {
                    speak(ctx, msg);
                }
                return Ok(NextAction::ReturnToIdle);
            }
        }
    }

    fn cleanup(&mut self, _ctx: &ActivityContext) {
        self.capture = None;
    }
}

fn greet_with_suggestions(ctx: &ActivityContext, prompts: &crate::config::ActivityPrompts) {
    let ranked = load_ranked_activities(ctx);

    if ranked.is_empty() {
        let intro = prompts.prompts.get("cold_start_intro").cloned().unwrap_or_else(|| "Here are some wellness activities you can try:".to_string());
        speak(ctx, &intro);
        return;
    }

    let intro = prompts
        .prompts
        .get("ranked_intro")
        .cloned()
        .unwrap_or_else(|| "Here are some suggested activities for you, ranked from highest to lowest based on our past interactions.".to_string());

    let mut sorted = ranked;
    sorted.sort_by_key(|a| a.rank);
    sorted.truncate(5);

    let lines: Vec<String> = sorted
        .iter()
        .map(|a| {
            let name = prompts.prompts.get(&format!("activity_name_{}", a.activity_type)).cloned().unwrap_or_else(|| a.activity_type.clone());
            match prompts.prompts.get(&format!("activity_description_{}", a.activity_type)) {
                Some(desc) => format!("Rank {}: {} – {}", a.rank, name, desc),
                None => format!("Rank {}: {}", a.rank, name),
            }
        })
        .collect();

    speak(ctx, &format!("{intro}\n\n{}", lines.join("\n\n")));
}

/// Always re-reads the intervention record rather than caching it, since the poller
/// may have refreshed it since this activity's last run (spec §4.6.g).
fn load_ranked_activities(ctx: &ActivityContext) -> Vec<RankedActivity> {
    ctx.intervention.snapshot().latest_suggestion.map(|s| s.ranked_activities).unwrap_or_default()
}

fn speak(ctx: &ActivityContext, text: &str) {
    let chunks = crate::vendor::split_sentences(text);
    let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
        ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
        super::ActivityControl::Continue
    });
}
