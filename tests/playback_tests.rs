// Integration tests for review playback windows
//
// The auto-stop is a scheduled task, so a paused tokio clock makes the
// window timing deterministic.

use std::sync::Arc;
use std::time::Duration;

use consult_scribe::audio::{AudioPlayback, PlaybackCursor, WindowedPlayback};

async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

async fn advance(secs: f64) {
    tokio::time::advance(Duration::from_secs_f64(secs)).await;
    settle().await;
}

fn windowed(context_secs: f64) -> (WindowedPlayback, Arc<PlaybackCursor>) {
    let cursor = Arc::new(PlaybackCursor::new());
    let playback = WindowedPlayback::new(
        Arc::clone(&cursor) as Arc<dyn AudioPlayback>,
        context_secs,
    );
    (playback, cursor)
}

#[tokio::test(start_paused = true)]
async fn window_plays_context_around_the_word_then_auto_pauses() {
    let (playback, cursor) = windowed(3.0);

    playback.play_around(10.0);
    settle().await;

    let state = cursor.snapshot();
    assert!(state.playing);
    assert!((state.position_secs - 7.0).abs() < 1e-9);

    // Six-second window: still playing at 5s in.
    advance(5.0).await;
    assert!(cursor.snapshot().playing);

    advance(1.5).await;
    assert!(!cursor.snapshot().playing, "auto-pause after the window");
}

#[tokio::test(start_paused = true)]
async fn window_start_is_clamped_at_the_beginning_of_the_audio() {
    let (playback, cursor) = windowed(3.0);

    playback.play_around(1.0);
    settle().await;

    assert_eq!(cursor.snapshot().position_secs, 0.0);
    assert!(cursor.snapshot().playing);

    // Window runs from 0.0 to 4.0.
    advance(3.5).await;
    assert!(cursor.snapshot().playing);
    advance(1.0).await;
    assert!(!cursor.snapshot().playing);
}

#[tokio::test(start_paused = true)]
async fn retriggering_cancels_the_previous_auto_stop() {
    let (playback, cursor) = windowed(3.0);

    playback.play_window(0.0, 2.0);
    settle().await;
    advance(1.0).await;

    // Re-trigger before the first window elapses; its stop must not fire.
    playback.play_window(5.0, 9.0);
    settle().await;
    assert!((cursor.snapshot().position_secs - 5.0).abs() < 1e-9);

    // 1.5s later the first window's deadline has long passed.
    advance(1.5).await;
    assert!(
        cursor.snapshot().playing,
        "cancelled auto-stop must not pause the new window"
    );

    // The second window (4s) runs to its own deadline.
    advance(3.0).await;
    assert!(!cursor.snapshot().playing);
}

#[tokio::test(start_paused = true)]
async fn seek_alone_does_not_start_playback() {
    let (playback, cursor) = windowed(3.0);

    playback.seek(12.5);

    let state = cursor.snapshot();
    assert!((state.position_secs - 12.5).abs() < 1e-9);
    assert!(!state.playing);
}
