//! Periodic intervention poller (spec §6.5), replacing the source system's
//! `threading.Timer` self-reschedule with a `tokio::time::interval` task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{InterventionClient, InterventionRecordStore};

pub struct InterventionPoller {
    handle: JoinHandle<()>,
}

impl InterventionPoller {
    /// Spawns the poll loop; `on_trigger` is notified (best-effort) whenever a response
    /// comes back with `trigger_intervention = true`.
    pub fn spawn(client: Arc<InterventionClient>, record: Arc<InterventionRecordStore>, user_id: String, poll_interval: Duration, on_trigger: mpsc::Sender<()>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                debug!("intervention poll tick");

                if let Err(e) = record.record_request(chrono_now()) {
                    warn!(error = %e, "failed to persist intervention request timestamp");
                }

                match client.suggest(&user_id, None).await {
                    Ok(response) => {
                        let trigger = response.decision.trigger_intervention;
                        if let Err(e) = record.record_response(response.decision, response.suggestion, chrono_now()) {
                            warn!(error = %e, "failed to persist intervention response");
                        }
                        if trigger {
                            let _ = on_trigger.send(()).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "intervention poll failed"),
                }
            }
        });

        Self { handle }
    }

    pub async fn shutdown(self, timeout: Duration) {
        self.handle.abort();
        let _ = tokio::time::timeout(timeout, self.handle).await;
    }
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
