//! Quote activity (spec §4.6.e), grounded on
//! `original_source/.../activities/spiritual_quote.py`: fetch a not-yet-seen quote
//! filtered by the user's religion (falling back to "general"), speak it, mark it seen,
//! and hand off to SmallTalk seeded with the quote text (spec §8 testable property 8).

use super::{block_on, Activity, ActivityContext, ActivityKind, NextAction, PendingSeed};
use crate::error::ActivityError;

pub struct Quote;

impl Quote {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Quote {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity for Quote {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Quote
    }

    fn initialize(&mut self, _ctx: &ActivityContext) -> Result<(), ActivityError> {
        Ok(())
    }

    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError> {
        let prompts = ctx.language.activity("quote");

        let religion = block_on(ctx.persistence.get_user_religion(&ctx.user_id)).unwrap_or_else(|_| "general".to_string());
        let language = block_on(ctx.persistence.get_user_language(&ctx.user_id)).unwrap_or_else(|_| ctx.language.language.clone());
        let quote = block_on(ctx.persistence.fetch_next_quote(&ctx.user_id, &religion, &language)).ok().flatten();

        let Some(quote) = quote else {
            if let Some(msg) = prompts.prompts.get("no_quote") {
                speak(ctx, msg);
            }
            return Ok(NextAction::ReturnToIdle);
        };

        if let Some(preamble) = prompts.prompts.get("preamble") {
            speak(ctx, preamble);
        }
        speak(ctx, &quote.text);

        let _ = block_on(ctx.persistence.mark_quote_seen(&ctx.user_id, &quote.id));

        let seed_template = prompts
            .prompts
            .get("seed_system_prompt")
            .cloned()
            .unwrap_or_else(|| "You just shared this quote with the user: '{quote}'.".to_string());
        let opener = prompts.prompts.get("opener").cloned().unwrap_or_else(|| "What are your thoughts on that quote?".to_string());

        *ctx.pending_seed.lock().unwrap() = Some(PendingSeed {
            system_prompt_addendum: seed_template.replace("{quote}", &quote.text),
            opener,
        });

        Ok(NextAction::Route(ActivityKind::SmallTalk))
    }

    fn cleanup(&mut self, _ctx: &ActivityContext) {}
}

fn speak(ctx: &ActivityContext, text: &str) {
    let chunks = crate::vendor::split_sentences(text);
    let _ = ctx.tts.stream_synthesize(&chunks, &mut |pcm| {
        ctx.audio.play_pcm_stream(std::iter::once(pcm), false, 0, 0);
        super::ActivityControl::Continue
    });
}
