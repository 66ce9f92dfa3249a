//! UI status bus (spec §3's UI Status Snapshot, §6.1/§6.2): a non-blocking,
//! last-writer-wins channel the Orchestrator publishes to and a GUI collaborator polls,
//! plus the optional inbound control events and outbound lifecycle events from §6.1/6.2.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicStatus {
    Idle,
    Listening,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerStatus {
    Idle,
    Speaking,
}

/// `{ mic_status, speaker_status }` (spec §3's UI Status Snapshot entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub mic_status: MicStatus,
    pub speaker_status: SpeakerStatus,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self { mic_status: MicStatus::Idle, speaker_status: SpeakerStatus::Idle }
    }
}

/// Inbound orchestration events (spec §6.1, optional WebSocket control surface).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    StartPipeline,
    StopPipeline,
    GetStatus,
}

/// The reply to `ControlEvent::GetStatus` (spec §6.1).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub active: bool,
    pub stt_active: bool,
    pub language: String,
    pub wakeword_initialized: bool,
    pub wakeword_running: bool,
}

/// Outbound lifecycle events (spec §6.2), emitted on state transitions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    Connected,
    SystemReady,
    WakewordDetected,
    SttFinal { text: String },
    PipelineStopped,
    Error { message: String },
}

/// Last-writer-wins snapshot bus (spec §4.7: "owns ... the status event bus").
pub struct StatusBus {
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusBus {
    pub fn new() -> (Self, watch::Receiver<StatusSnapshot>) {
        let (tx, rx) = watch::channel(StatusSnapshot::default());
        (Self { tx }, rx)
    }

    pub fn set_mic(&self, mic_status: MicStatus) {
        self.tx.send_modify(|s| s.mic_status = mic_status);
    }

    pub fn set_speaker(&self, speaker_status: SpeakerStatus) {
        self.tx.send_modify(|s| s.speaker_status = speaker_status);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_writer_wins_is_immediately_visible() {
        let (bus, rx) = StatusBus::new();
        bus.set_mic(MicStatus::Listening);
        bus.set_speaker(SpeakerStatus::Speaking);
        let snapshot = *rx.borrow();
        assert_eq!(snapshot.mic_status, MicStatus::Listening);
        assert_eq!(snapshot.speaker_status, SpeakerStatus::Speaking);
        assert_eq!(bus.snapshot(), snapshot);
    }
}
