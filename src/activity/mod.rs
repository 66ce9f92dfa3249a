//! Activity Runtime (spec §4.6): the shared skeleton every conversational activity runs
//! inside, plus the seven concrete activities themselves.
//!
//! Cancellation is cooperative rather than exception-driven (spec §9): an activity's
//! `run` loop returns a typed [`NextAction`] instead of throwing past itself and
//! unwinding through the orchestrator, and hands back an [`ActivityControl`] signal
//! internally to its own sub-loops instead of a `Termination` sentinel error.

mod context;
mod gratitude;
mod idle;
mod intent;
mod journal;
mod meditation;
mod quote;
mod session;
mod silence;
mod smalltalk;
mod suggestion;
mod termination;

pub use context::{ActivityContext, PendingSeed};
pub use intent::KeywordIntentMatcher;
pub use session::ActivitySession;
pub use silence::SilenceWatcher;
pub use termination::TerminationPhraseDetector;

pub use gratitude::Gratitude;
pub use idle::Idle;
pub use journal::Journal;
pub use meditation::Meditation;
pub use quote::Quote;
pub use smalltalk::SmallTalk;
pub use suggestion::ActivitySuggestion;

use serde::{Deserialize, Serialize};

use crate::error::ActivityError;

/// Which activity a session is running (spec §3's Activity Session `kind` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Idle,
    SmallTalk,
    Journal,
    Gratitude,
    Quote,
    Meditation,
    ActivitySuggestion,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Idle => "idle",
            ActivityKind::SmallTalk => "smalltalk",
            ActivityKind::Journal => "journal",
            ActivityKind::Gratitude => "gratitude",
            ActivityKind::Quote => "quote",
            ActivityKind::Meditation => "meditation",
            ActivityKind::ActivitySuggestion => "activity_suggestion",
        }
    }
}

/// The lifecycle state of a running Activity Session (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Prompting,
    Listening,
    Speaking,
    Nudged,
    TerminatingSave,
    Done,
}

/// What the orchestrator should do once an activity's `run` returns (spec §9: a typed
/// value returned to the orchestrator, replacing the source system's pattern of one
/// activity constructing and handing off into the next activity's object from inside
/// its own loop).
#[derive(Debug, Clone)]
pub enum NextAction {
    /// Hand off to a specific activity, e.g. Idle recognized an intent.
    Route(ActivityKind),
    /// Return to the Idle activity (timeout, unknown intent with no suggestion, or a
    /// plain termination phrase with nothing else to route to).
    ReturnToIdle,
    /// The process is shutting down; no further activity should be started.
    Terminate,
}

/// A cooperative cancellation signal threaded through an activity's internal sub-loops
/// (listening loop, silence watcher, playback) in place of the source system's raised
/// `Termination` exception (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityControl {
    Continue,
    Cancelled,
}

impl ActivityControl {
    pub fn is_cancelled(self) -> bool {
        matches!(self, ActivityControl::Cancelled)
    }
}

/// Bridges the blocking `Activity::run` loops to the async `Persistence`/intervention
/// calls they occasionally need, from inside a thread the Orchestrator already runs
/// via `spawn_blocking`.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// The common shape every activity implements (spec §3.3 lifecycle: construct,
/// initialize, run, cleanup).
pub trait Activity: Send {
    fn kind(&self) -> ActivityKind;

    /// Acquire resources (open the mic, speak the opening prompt). Called once.
    fn initialize(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError>;

    /// Run the activity's listen loop to completion and report what should happen next.
    fn run(&mut self, ctx: &ActivityContext) -> Result<NextAction, ActivityError>;

    /// Release resources (close the mic, persist any pending state). Always called,
    /// even when `initialize`/`run` returned an error, mirroring the source system's
    /// `finally`-block cleanup discipline without relying on unwinding to get there.
    fn cleanup(&mut self, ctx: &ActivityContext);
}
