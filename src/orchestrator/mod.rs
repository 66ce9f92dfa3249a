//! Orchestrator (spec §4.7): the top-level supervisor. Starts in Idle, listens for
//! wake + intent, routes to an activity, cleans up, and resumes Idle. Owns the
//! intervention poller task and the status event bus (spec §5 task-ownership table).
//!
//! Generalizes the teacher's `main.rs` task-spawning/shutdown pattern (bounded channels,
//! multi-stage graceful shutdown with per-task timeouts via `tokio::select!`) to this
//! activity loop. The loop itself is blocking (every `Activity::run` call blocks on
//! vendor I/O), so it runs on a dedicated blocking thread while the async runtime keeps
//! the intervention poller and status bus alive around it.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::activity::{Activity, ActivityContext, ActivityKind, ActivitySuggestion, Gratitude, Idle, Journal, Meditation, NextAction, Quote, SmallTalk};
use crate::intervention::{InterventionClient, InterventionPoller, InterventionRecordStore};
use crate::status::StatusSnapshot;

/// The short pause the Orchestrator enforces between one activity's cleanup and the
/// next activity's initialize, letting audio devices settle (spec §4.7).
const GRACE_DELAY: Duration = Duration::from_millis(200);

fn construct_activity(kind: ActivityKind) -> Box<dyn Activity> {
    match kind {
        ActivityKind::Idle => Box::new(Idle::new()),
        ActivityKind::SmallTalk => Box::new(SmallTalk::new()),
        ActivityKind::Journal => Box::new(Journal::new()),
        ActivityKind::Gratitude => Box::new(Gratitude::new()),
        ActivityKind::Quote => Box::new(Quote::new()),
        ActivityKind::Meditation => Box::new(Meditation::new()),
        ActivityKind::ActivitySuggestion => Box::new(ActivitySuggestion::new()),
    }
}

/// Runs one activity's full `initialize`/`run`/`cleanup` lifecycle (spec §3.3),
/// always calling `cleanup` even when `initialize`/`run` errored (mirrors the source
/// system's `finally`-block discipline per the Activity trait's own doc comment).
fn run_one(kind: ActivityKind, ctx: &ActivityContext) -> NextAction {
    let mut activity = construct_activity(kind);
    info!(activity = activity.kind().as_str(), "entering activity");

    let outcome = activity.initialize(ctx).and_then(|()| activity.run(ctx));
    activity.cleanup(ctx);

    match outcome {
        Ok(next) => next,
        Err(e) => {
            warn!(activity = kind.as_str(), error = %e, "activity ended in error, returning to idle");
            NextAction::ReturnToIdle
        }
    }
}

/// The blocking activity loop itself (spec §4.7's pseudocode): Idle until it routes
/// somewhere, run that activity, repeat, until `Terminate` or the shutdown flag trips.
fn activity_loop(ctx: Arc<ActivityContext>) {
    let mut current = ActivityKind::Idle;
    loop {
        if ctx.shutdown.load(Ordering::SeqCst) {
            info!("shutdown flag set, exiting activity loop");
            return;
        }

        let next = run_one(current, &ctx);
        match next {
            NextAction::Terminate => {
                info!("orchestrator terminating");
                return;
            }
            NextAction::ReturnToIdle => {
                current = ActivityKind::Idle;
            }
            NextAction::Route(kind) => {
                current = kind;
            }
        }

        if current != ActivityKind::Idle || !ctx.shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(GRACE_DELAY);
        }
    }
}

/// Owns the activity loop's blocking thread plus the intervention poller, joined
/// together at shutdown (spec §5's "every spawned task's handle is retained"), and the
/// receiving end of the status bus the Audio I/O Fabric publishes mic/speaker state to.
pub struct Orchestrator {
    ctx: Arc<ActivityContext>,
    status_rx: watch::Receiver<StatusSnapshot>,
    poller: Option<InterventionPoller>,
    loop_handle: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<ActivityContext>, status_rx: watch::Receiver<StatusSnapshot>) -> Self {
        Self { ctx, status_rx, poller: None, loop_handle: None }
    }

    /// A cloned handle onto the current mic/speaker status snapshot (spec §6.1), for a
    /// future UI or WebSocket collaborator to poll or await changes on.
    pub fn status_receiver(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_rx.clone()
    }

    /// Starts the intervention poller (if configured) and the blocking activity loop.
    pub fn start(&mut self, intervention_client: Option<Arc<InterventionClient>>, record_store: Arc<InterventionRecordStore>, poll_interval: Duration) {
        if let Some(client) = intervention_client {
            let (trigger_tx, mut trigger_rx) = mpsc::channel(1);
            self.poller = Some(InterventionPoller::spawn(client, record_store, self.ctx.user_id.clone(), poll_interval, trigger_tx));
            tokio::spawn(async move {
                while trigger_rx.recv().await.is_some() {
                    info!("intervention service flagged an intervention opportunity");
                }
            });
        }

        let ctx = self.ctx.clone();
        self.loop_handle = Some(tokio::task::spawn_blocking(move || activity_loop(ctx)));
    }

    /// Sets the shared shutdown flag and waits (bounded) for the activity loop and
    /// poller to finish, per spec §5's cancellation sequence.
    pub async fn shutdown(mut self, timeout: Duration) {
        self.ctx.shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = self.loop_handle.take() {
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("activity loop did not finish within the shutdown grace period");
            }
        }

        if let Some(poller) = self.poller.take() {
            poller.shutdown(timeout).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_activity_covers_every_kind() {
        for kind in [
            ActivityKind::Idle,
            ActivityKind::SmallTalk,
            ActivityKind::Journal,
            ActivityKind::Gratitude,
            ActivityKind::Quote,
            ActivityKind::Meditation,
            ActivityKind::ActivitySuggestion,
        ] {
            assert_eq!(construct_activity(kind).kind(), kind);
        }
    }
}
