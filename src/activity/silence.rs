//! Shared silence watcher (spec §4.6), grounded on
//! `original_source/.../conversation_audio_manager.py`'s `start_silence_monitoring` /
//! `stop_silence_monitoring`, generalized from a polling `threading.Timer` into an
//! elapsed-time clock that every activity's listen loop samples directly.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks elapsed silence since the last transcript or wake event, excluding any
/// interval during which the speaker was playing or the mic was muted (spec §8
/// property 5). Pausing freezes the clock; resuming shifts the epoch forward by the
/// paused duration so paused time never counts as silence.
pub struct SilenceWatcher {
    inner: Mutex<Inner>,
}

struct Inner {
    last_activity: Instant,
    paused_since: Option<Instant>,
}

impl Default for SilenceWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SilenceWatcher {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { last_activity: Instant::now(), paused_since: None }) }
    }

    /// Call whenever a transcript or other meaningful user activity arrives.
    pub fn notify_activity(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_activity = Instant::now();
        inner.paused_since = None;
    }

    /// Call while the speaker is playing or the mic is muted.
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.paused_since.is_none() {
            inner.paused_since = Some(Instant::now());
        }
    }

    /// Call once playback ends / the mic is unmuted.
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(paused_at) = inner.paused_since.take() {
            let paused_for = paused_at.elapsed();
            inner.last_activity += paused_for;
        }
    }

    pub fn elapsed(&self) -> Duration {
        let inner = self.inner.lock().unwrap();
        match inner.paused_since {
            Some(paused_at) => paused_at.saturating_duration_since(inner.last_activity),
            None => inner.last_activity.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn pause_excludes_elapsed_time() {
        let watcher = SilenceWatcher::new();
        sleep(Duration::from_millis(20));
        watcher.pause();
        sleep(Duration::from_millis(50));
        watcher.resume();
        assert!(watcher.elapsed() < Duration::from_millis(40));
    }

    #[test]
    fn notify_activity_resets_clock() {
        let watcher = SilenceWatcher::new();
        sleep(Duration::from_millis(20));
        watcher.notify_activity();
        assert!(watcher.elapsed() < Duration::from_millis(10));
    }
}
