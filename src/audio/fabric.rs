//! Audio I/O Fabric (spec §4.1): the single owner of the microphone and speaker.
//!
//! Generalizes the capture/playback pair the rest of this module already builds
//! ([`Capturer`], [`Player`]) behind the invariants spec §3 requires: at most one open
//! capture stream at a time (invariant 1), playback that never overlaps itself
//! (invariant 2), and mic muted for the duration of any playback (invariant 3).

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Capturer, Player};
use crate::error::DeviceError;
use crate::status::{MicStatus, SpeakerStatus, StatusBus};

/// The result of waiting for the next capture frame with a bound on how long to wait.
pub enum FrameWait {
    Frame(Vec<f32>),
    /// No frame arrived within the timeout; the capture is still open.
    Idle,
    /// The capture has been closed; no further frames will arrive.
    Closed,
}

/// A capture session handle; frames are pulled from it and it must be dropped (or
/// explicitly closed) before another caller may open the microphone again.
pub struct CaptureHandle {
    receiver: std_mpsc::Receiver<Vec<f32>>,
    fabric: Arc<FabricInner>,
}

impl CaptureHandle {
    /// Block for the next PCM frame. Returns `None` once the capture has been closed.
    pub fn next_frame(&self) -> Option<Vec<f32>> {
        self.receiver.recv().ok()
    }

    /// Block for the next PCM frame, giving up after `timeout` so a caller can act on
    /// idle time without waiting forever (spec §3.2 invariant 5's silence/nudge/timeout
    /// contract needs to observe elapsed silence even when the mic keeps streaming).
    pub fn next_frame_timeout(&self, timeout: Duration) -> FrameWait {
        match self.receiver.recv_timeout(timeout) {
            Ok(frame) => FrameWait::Frame(frame),
            Err(std_mpsc::RecvTimeoutError::Timeout) => FrameWait::Idle,
            Err(std_mpsc::RecvTimeoutError::Disconnected) => FrameWait::Closed,
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.fabric.close_capture();
    }
}

struct FabricInner {
    capture_open: AtomicBool,
    capturer: Mutex<Option<Capturer>>,
    capture_sample_rate: u32,
    player: Player,
    external_interrupt: Arc<AtomicBool>,
    status: Arc<StatusBus>,
}

impl FabricInner {
    fn close_capture(&self) {
        if let Some(mut capturer) = self.capturer.lock().take() {
            capturer.shutdown();
        }
        self.capture_open.store(false, Ordering::SeqCst);
        self.status.set_mic(MicStatus::Idle);
    }
}

/// Owns the microphone and speaker for the whole process.
pub struct AudioFabric {
    inner: Arc<FabricInner>,
}

impl AudioFabric {
    /// `capture_sample_rate` is the target rate STT expects (e.g. 16kHz); `playback_sample_rate`
    /// is the rate TTS synthesizes at (e.g. 24kHz for Kokoro). The speaker auto-interrupts
    /// whenever the caller marks the mic as actively hearing speech (half-duplex discipline).
    /// `status` is the bus the fabric publishes mic/speaker transitions to (spec §4.7).
    pub fn new(capture_sample_rate: u32, playback_sample_rate: u32, status: Arc<StatusBus>) -> Result<Self, DeviceError> {
        let external_interrupt = Arc::new(AtomicBool::new(false));
        let player = Player::new(playback_sample_rate, Some(external_interrupt.clone()))
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(FabricInner {
                capture_open: AtomicBool::new(false),
                capturer: Mutex::new(None),
                capture_sample_rate,
                player,
                external_interrupt,
                status,
            }),
        })
    }

    /// Open the microphone. Fails with [`DeviceError::Busy`] if a capture is already open
    /// (spec invariant 1: the fabric enforces at most one open `Audio Stream Handle`).
    pub fn open_capture(&self) -> Result<CaptureHandle, DeviceError> {
        self.inner
            .capture_open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DeviceError::Busy)?;

        let (sender, receiver) = std_mpsc::channel::<Vec<f32>>();
        let mut capturer = match Capturer::new(self.inner.capture_sample_rate, move |samples: &[f32]| {
            let _ = sender.send(samples.to_vec());
        }) {
            Ok(c) => c,
            Err(e) => {
                self.inner.capture_open.store(false, Ordering::SeqCst);
                return Err(DeviceError::Unavailable(e.to_string()));
            }
        };

        if let Err(e) = capturer.start() {
            self.inner.capture_open.store(false, Ordering::SeqCst);
            return Err(DeviceError::Unavailable(e.to_string()));
        }

        *self.inner.capturer.lock() = Some(capturer);
        self.inner.status.set_mic(MicStatus::Listening);
        Ok(CaptureHandle { receiver, fabric: self.inner.clone() })
    }

    /// Mute the open capture stream (if any); has no effect when the mic is closed.
    pub fn mute(&self) {
        if let Some(capturer) = self.inner.capturer.lock().as_mut() {
            let _ = capturer.stop();
            self.inner.status.set_mic(MicStatus::Muted);
        }
    }

    /// Unmute a previously-muted capture stream (if any).
    pub fn unmute(&self) {
        if let Some(capturer) = self.inner.capturer.lock().as_mut() {
            let _ = capturer.start();
            self.inner.status.set_mic(MicStatus::Listening);
        }
    }

    /// Tell the speaker the mic has just heard speech, interrupting any playback in
    /// progress (half-duplex discipline; spec invariant 3).
    pub fn notify_speech_detected(&self) {
        self.inner.external_interrupt.store(true, Ordering::SeqCst);
    }

    pub fn clear_speech_detected(&self) {
        self.inner.external_interrupt.store(false, Ordering::SeqCst);
    }

    /// Play a lazily-produced sequence of PCM chunks, muting the mic for the duration
    /// (spec invariant 3) and optionally framing playback with nudge pre/post delays
    /// (spec §4.1's `use_nudge_delays` parameter, used by the Activity Runtime's nudge
    /// prompts to let trailing capture audio settle before and after the prompt plays).
    pub fn play_pcm_stream<I>(&self, chunks: I, use_nudge_delays: bool, pre_delay_ms: u64, post_delay_ms: u64) -> bool
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        self.mute();
        self.inner.status.set_speaker(SpeakerStatus::Speaking);
        if use_nudge_delays && pre_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(pre_delay_ms));
        }

        let mut completed = true;
        for chunk in chunks {
            if !self.inner.player.play(&chunk) {
                completed = false;
                break;
            }
        }

        if use_nudge_delays && post_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(post_delay_ms));
        }
        self.inner.status.set_speaker(SpeakerStatus::Idle);
        self.unmute();
        completed
    }

    /// Play a single pre-recorded WAV file (spec §4.1, used when `use_audio_files` is set).
    pub fn play_file(&self, path: &Path) -> Result<bool, DeviceError> {
        let mut reader = hound::WavReader::open(path).map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().filter_map(Result::ok).collect(),
            hound::SampleFormat::Int => {
                let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader.samples::<i32>().filter_map(Result::ok).map(|s| s as f32 / max).collect()
            }
        };

        if samples.is_empty() {
            warn!(path = %path.display(), "audio file contained no samples");
            return Ok(true);
        }

        Ok(self.play_pcm_stream(std::iter::once(samples), false, 0, 0))
    }

    pub fn interrupt_playback(&self) {
        debug!("playback interrupted by fabric caller");
        self.inner.player.interrupt();
    }

    /// Play a WAV file without muting capture (spec §3.2 invariant 3 only binds TTS,
    /// nudge, termination and wake-acknowledge audio — meditation audio is a distinct
    /// playback path that races against its own listener rather than the mic).
    pub fn play_file_concurrent(&self, path: &Path) -> Result<bool, DeviceError> {
        let mut reader = hound::WavReader::open(path).map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().filter_map(Result::ok).collect(),
            hound::SampleFormat::Int => {
                let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader.samples::<i32>().filter_map(Result::ok).map(|s| s as f32 / max).collect()
            }
        };
        self.inner.status.set_speaker(SpeakerStatus::Speaking);
        let completed = self.inner.player.play(&samples);
        self.inner.status.set_speaker(SpeakerStatus::Idle);
        Ok(completed)
    }
}
