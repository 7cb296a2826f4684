use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Commands a client-side audio player must honor.
///
/// The validator drives review playback exclusively through this
/// interface, so the review state machine stays free of any media API.
pub trait AudioPlayback: Send + Sync {
    /// Move the playhead to an absolute position in seconds.
    fn seek(&self, position_secs: f64);

    /// Begin playback from the current position.
    fn play(&self);

    /// Pause playback, keeping the current position.
    fn pause(&self);
}

/// Playhead state a UI client should mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CursorState {
    pub position_secs: f64,
    pub playing: bool,
}

/// [`AudioPlayback`] implementation that tracks the commanded playhead so
/// the HTTP surface can report where the client player should be.
#[derive(Default)]
pub struct PlaybackCursor {
    state: Mutex<CursorState>,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CursorState {
        *self.state.lock()
    }
}

impl AudioPlayback for PlaybackCursor {
    fn seek(&self, position_secs: f64) {
        self.state.lock().position_secs = position_secs.max(0.0);
    }

    fn play(&self) {
        self.state.lock().playing = true;
    }

    fn pause(&self) {
        self.state.lock().playing = false;
    }
}

/// Plays a bounded window of audio, then auto-pauses.
///
/// The stop is a scheduled task rather than a media boundary; re-triggering
/// playback cancels the previous schedule so overlapping windows cannot
/// fight over the pause.
pub struct WindowedPlayback {
    player: Arc<dyn AudioPlayback>,
    context_secs: f64,
    stop_task: Mutex<Option<JoinHandle<()>>>,
}

impl WindowedPlayback {
    pub fn new(player: Arc<dyn AudioPlayback>, context_secs: f64) -> Self {
        Self {
            player,
            context_secs,
            stop_task: Mutex::new(None),
        }
    }

    pub fn context_secs(&self) -> f64 {
        self.context_secs
    }

    /// Seek without starting playback.
    pub fn seek(&self, position_secs: f64) {
        self.player.seek(position_secs);
    }

    /// Play `context_secs` before the timestamp through `context_secs`
    /// after it.
    pub fn play_around(&self, timestamp_secs: f64) {
        let start = (timestamp_secs - self.context_secs).max(0.0);
        let end = timestamp_secs + self.context_secs;
        self.play_window(start, end);
    }

    /// Play from `start` to `end`, then pause.
    pub fn play_window(&self, start: f64, end: f64) {
        // Cancel any pending auto-stop before scheduling a new one.
        if let Some(previous) = self.stop_task.lock().take() {
            previous.abort();
        }

        let start = start.max(0.0);
        let window = Duration::from_secs_f64((end - start).max(0.0));
        debug!("Playing window {:.1}s - {:.1}s", start, end);

        self.player.seek(start);
        self.player.play();

        let player = Arc::clone(&self.player);
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            player.pause();
        });
        *self.stop_task.lock() = Some(task);
    }
}

impl Drop for WindowedPlayback {
    fn drop(&mut self) {
        if let Some(task) = self.stop_task.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_clamps_negative_seeks() {
        let cursor = PlaybackCursor::new();
        cursor.seek(-2.5);
        assert_eq!(cursor.snapshot().position_secs, 0.0);
    }

    #[test]
    fn cursor_tracks_play_pause() {
        let cursor = PlaybackCursor::new();
        cursor.seek(4.2);
        cursor.play();
        assert!(cursor.snapshot().playing);
        cursor.pause();
        let state = cursor.snapshot();
        assert!(!state.playing);
        assert!((state.position_secs - 4.2).abs() < 1e-9);
    }
}
