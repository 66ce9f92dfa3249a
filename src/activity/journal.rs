//! Journal activity (spec §4.6.c), grounded on `original_source/.../activities/journal.py`:
//! accumulates spoken paragraphs, finalizing one whenever a final transcript follows a
//! long enough pause, and saves the entry on termination phrase or timeout.
//!
//! Resolved Open Question (spec §9): saving is idempotent via an atomic `saved` flag
//! checked at the start of `save_entry` and set only after persistence succeeds, so both
//! the termination path and the fallback timeout path in `cleanup` can call it
//! unconditionally without risking a duplicate entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::{block_on, Activity, ActivityContext, ActivityKind, NextAction, SilenceWatcher, TerminationPhraseDetector};
use crate::audio::CaptureHandle;
use crate::error::ActivityError;
use crate::vendor::{IDLE_POLL_INTERVAL, Transcript};

pub struct Journal {
    capture: Option<CaptureHandle>,
    paragraphs: Vec<String>,
    current: String,
    saved: AtomicBool,
}

impl Journal {
    pub fn new() -> Self {
        Self { capture: None, paragraphs: Vec::new(), current: String::new(), saved: AtomicBool::new(false) }
    }

    fn finalize_paragraph(&mut self) {
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            self.paragraphs.push(trimmed.to_string());
        }
        self.current.clear();
    }

    fn has_content(&self, min_words: usize) -> bool {
        let body = self.paragraphs.join(" ") + " " + &self.current;
        content_count(body.trim()) >= min_words
    }

    fn save_entry(&mut self, ctx: &ActivityContext) -> bool {
        if self.saved.load(Ordering::SeqCst) {
            return true;
        }
        self.finalize_paragraph();
        if self.paragraphs.is_empty() {
            return false;
        }
        let body = self.paragraphs.join("\n\n");
        let word_count = content_count(&body);
        let title = format!("Journal {}", chrono::Utc::now().format("%Y-%m-%d %H:%M"));

        let saved = block_on(ctx.persistence.upsert_journal(&ctx.user_id, &title, &body, &ctx.config.default_mood, &[], false)).is_ok();
        if saved {
            self.saved.store(true, Ordering::SeqCst);
            let prompts = ctx.language.activity("journal");
            if let Some(template) = prompts.prompts.get("saved") {
                speak(ctx, &template.replace("{word_count}", &word_count.to_string()));
            }
        }
        saved
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for Journal {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Journal
    }

    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.capture = Some(ctx.audio.open_capture()?);
        self.paragraphs.clear();
        self.current.clear();
        self.saved.store(false, Ordering::SeqCst);
        let prompts = ctx.language.activity("journal");
        if let Some(start) = prompts.prompts.get("start") {
            speak(ctx, start);
        }
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("journal");
        let termination = TerminationPhraseDetector::new(prompts.termination_phrases.clone(), true);
        let silence = SilenceWatcher::new();
        let silence_timeout = Duration::from_secs_f32(ctx.config.silence_timeout_s);
        let nudge_deadline = Duration::from_secs_f32(ctx.config.nudge_timeout_s);
        let pause_threshold = Duration::from_secs_f32(ctx.config.pause_finalization_s);

        let mut last_final: Option<Instant> = None;
        let mut nudged = false;
        let mut nudge_started_at: Option<Instant> = None;
        let mut terminated = false;

        loop {
            if ctx.shutdown.load(Ordering::SeqCst) {
                terminated = true;
                break;
            }

            let capture = self.capture.take().expect("capture open");
            let mut hit_termination = false;
            let mut heard_final = false;

            let outcome = ctx.stt.stream_recognize(&capture, true, false, IDLE_POLL_INTERVAL, &mut |t: Transcript| {
                if !t.is_final || t.text.is_empty() {
                    return super::ActivityControl::Continue;
                }
                heard_final = true;
                if termination.is_termination_phrase(&t.text, true) {
                    hit_termination = true;
                    return super::ActivityControl::Cancelled;
                }

                let now = Instant::now();
                if last_final.is_some_and(|prev| now.duration_since(prev) > pause_threshold) {
                    self.finalize_paragraph();
                }
                if self.current.is_empty() {
                    self.current = t.text;
                } else {
                    self.current.push(' ');
                    self.current.push_str(&t.text);
                }
                last_final = Some(now);
                super::ActivityControl::Continue
            });
            self.capture = Some(capture);
            outcome?;

            if hit_termination {
                terminated = true;
                break;
            }
            if heard_final {
                silence.notify_activity();
                nudged = false;
                continue;
            }

            if !nudged && silence.elapsed() >= silence_timeout {
                nudged = true;
                nudge_started_at = Some(Instant::now());
                if let Some(nudge) = prompts.prompts.get("nudge") {
                    speak(ctx, nudge);
                }
                continue;
            }

            if nudged && nudge_started_at.is_some_and(|t| t.elapsed() >= nudge_deadline) {
                terminated = true;
                break;
            }
        }

        self.finalize_paragraph();
        if terminated {
            if self.has_content(ctx.config.min_words_threshold) {
                self.save_entry(ctx);
            } else if let Some(no_content) = prompts.prompts.get("no_content") {
                speak(ctx, no_content);
            }
        }

        if ctx.shutdown.load(Ordering::SeqCst) {
            Ok(NextAction::Terminate)
        } else {
            Ok(NextAction::ReturnToIdle)
        }
    }

    fn cleanup(&mut self, ctx: &ActivityContext) {
        if !self.saved.load(Ordering::SeqCst) && self.has_content(ctx.config.min_words_threshold) {
            self.save_entry(ctx);
        }
        self.capture = None;
    }
}

fn content_count(text: &str) -> usize {
    let has_cjk = text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c));
    if has_cjk {
        text.chars().filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c)).count()
    } else {
        text.split_whitespace().count()
    }
}

fn speak(ctx: &ActivityContext, text: &str) {
    let chunks = crate::vendor::split_sentences(text);
    let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
        ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
        super::ActivityControl::Continue
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_count_uses_characters_for_cjk() {
        assert_eq!(content_count("你好世界"), 4);
        assert_eq!(content_count("hello there world"), 3);
    }
}
