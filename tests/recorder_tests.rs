// Integration tests for the recording session lifecycle
//
// Capture is driven by the file backend replaying a generated WAV
// fixture under a paused tokio clock, so timer behavior (elapsed ticks,
// pause freezing) is deterministic. The transcription service is
// scripted so the processing → completed/error transition can be
// observed and raced deliberately.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

use consult_scribe::audio::{AudioSource, CaptureConfig};
use consult_scribe::recorder::{ConsultationSession, RecorderError, RecorderStatus};
use consult_scribe::services::TranscriptionService;
use consult_scribe::transcript::{DiarizedTranscript, TranscriptSegment};
use consult_scribe::RecordingManager;

// ============================================================================
// Fixtures
// ============================================================================

fn write_fixture(dir: &TempDir, secs: u32) -> Result<PathBuf> {
    let path = dir.path().join("consultation.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..(16_000 * secs) {
        writer.write_sample((i % 128) as i16)?;
    }
    writer.finalize()?;

    Ok(path)
}

fn sample_transcript() -> DiarizedTranscript {
    DiarizedTranscript {
        language: "es".to_string(),
        num_speakers: 1,
        segments: vec![TranscriptSegment {
            start: 0.0,
            end: 2.0,
            text: "buenos dias".to_string(),
            speaker: "SPEAKER_00".to_string(),
            words: None,
        }],
    }
}

/// Transcriber that blocks until released, then succeeds or fails.
struct ScriptedTranscriber {
    release: Arc<Notify>,
    fail: bool,
}

impl ScriptedTranscriber {
    fn new(fail: bool) -> (Self, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        (
            Self {
                release: Arc::clone(&release),
                fail,
            },
            release,
        )
    }
}

#[async_trait::async_trait]
impl TranscriptionService for ScriptedTranscriber {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<DiarizedTranscript> {
        assert!(!audio_wav.is_empty(), "artifact must contain WAV bytes");
        self.release.notified().await;
        if self.fail {
            anyhow::bail!("transcription backend offline")
        }
        Ok(sample_transcript())
    }
}

fn session() -> ConsultationSession {
    ConsultationSession::new("apt-17", "pat-4", "Ana Salas")
}

fn manager(path: PathBuf, transcriber: ScriptedTranscriber) -> Arc<RecordingManager> {
    RecordingManager::new(
        Arc::new(transcriber),
        AudioSource::File(path),
        CaptureConfig::default(),
    )
}

/// Let spawned tasks run after a clock manipulation.
async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

async fn advance_secs(n: u64) {
    for _ in 0..n {
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn start_transitions_to_recording_with_a_fresh_session() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    manager.start_recording(session()).await?;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Recording);
    assert_eq!(
        snapshot.session.as_ref().map(|s| s.appointment_id.as_str()),
        Some("apt-17")
    );
    assert_eq!(snapshot.elapsed_secs, 0);
    assert!(!snapshot.has_audio);
    assert!(snapshot.transcript.is_none());
    assert!(snapshot.error.is_none());

    manager.cancel_recording().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_while_a_session_is_active_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(2).await;

    let second = ConsultationSession::new("apt-99", "pat-9", "Luis Vega");
    let result = manager.start_recording(second).await;
    assert!(matches!(result, Err(RecorderError::AlreadyRecording)));

    // The active session is untouched.
    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Recording);
    assert_eq!(
        snapshot.session.as_ref().map(|s| s.appointment_id.as_str()),
        Some("apt-17")
    );
    assert_eq!(snapshot.elapsed_secs, 2);

    manager.cancel_recording().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn elapsed_time_advances_only_while_recording() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 30)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(3).await;
    assert_eq!(manager.snapshot().await.elapsed_secs, 3);

    // Frozen across the paused interval.
    manager.pause_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Paused);
    advance_secs(5).await;
    assert_eq!(manager.snapshot().await.elapsed_secs, 3);

    manager.resume_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Recording);
    advance_secs(2).await;
    assert_eq!(manager.snapshot().await.elapsed_secs, 5);

    // Stop freezes the counter without resetting it.
    release.notify_one();
    manager.stop_recording().await;
    settle().await;
    assert_eq!(manager.snapshot().await.elapsed_secs, 5);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_are_noops_in_the_wrong_state() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    // Nothing to pause or resume yet.
    manager.pause_recording().await;
    manager.resume_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Idle);

    manager.start_recording(session()).await?;
    manager.resume_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Recording);

    manager.pause_recording().await;
    manager.pause_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Paused);

    manager.cancel_recording().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_finalizes_audio_before_transcription_settles() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 3)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(3).await;
    manager.stop_recording().await;

    // Capture stopped and artifact stored; transcription still in flight.
    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Processing);
    assert!(snapshot.has_audio);
    assert!((snapshot.audio_duration_secs.unwrap() - 3.0).abs() < 0.5);
    assert!(snapshot.transcript.is_none());

    release.notify_one();
    settle().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Completed);
    assert!(snapshot.has_audio, "artifact survives completion");
    let transcript = snapshot.transcript.expect("transcript stored");
    assert_eq!(transcript.segments.len(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_from_paused_finalizes_capture() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(2).await;
    manager.pause_recording().await;

    release.notify_one();
    manager.stop_recording().await;
    settle().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Completed);
    assert!(snapshot.has_audio);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_when_idle_is_a_noop() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 3)?, transcriber);

    manager.stop_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Idle);
    Ok(())
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn device_failure_surfaces_an_error_without_a_partial_session() -> Result<()> {
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(PathBuf::from("/nonexistent/capture.wav"), transcriber);

    let result = manager.start_recording(session()).await;
    assert!(matches!(result, Err(RecorderError::Device(_))));

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Error);
    assert!(snapshot.session.is_none(), "no partial session retained");
    assert!(snapshot.error.is_some());
    assert!(!snapshot.has_audio);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_new_session_can_start_from_the_error_state() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(true);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(1).await;
    release.notify_one();
    manager.stop_recording().await;
    settle().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Error);

    // Error is terminal: a fresh start is accepted and clears the failure.
    manager
        .start_recording(ConsultationSession::new("apt-18", "pat-4", "Ana Salas"))
        .await?;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Recording);
    assert!(snapshot.error.is_none());
    assert!(!snapshot.has_audio);
    assert_eq!(snapshot.elapsed_secs, 0);

    manager.cancel_recording().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn transcription_failure_preserves_the_audio() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(true);
    let manager = manager(write_fixture(&dir, 2)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(2).await;
    manager.stop_recording().await;

    release.notify_one();
    settle().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Error);
    assert!(snapshot
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("offline"));
    assert!(snapshot.has_audio, "audio preserved for manual fallback");
    assert!(snapshot.transcript.is_none());

    Ok(())
}

// ============================================================================
// Cancel / clear / stale results
// ============================================================================

#[tokio::test(start_paused = true)]
async fn cancel_discards_everything_and_returns_to_idle() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, _release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 10)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(2).await;
    manager.cancel_recording().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Idle);
    assert!(snapshot.session.is_none());
    assert_eq!(snapshot.elapsed_secs, 0);
    assert!(!snapshot.has_audio);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_superseded_transcription_result_cannot_corrupt_state() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 3)?, transcriber);

    manager.start_recording(session()).await?;
    advance_secs(1).await;
    manager.stop_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Processing);

    // The user walks away before the service answers.
    manager.clear_recording().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Idle);

    // The stale completion lands afterwards and must be dropped.
    release.notify_one();
    settle().await;

    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Idle);
    assert!(snapshot.transcript.is_none());
    assert!(!snapshot.has_audio);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clear_resets_a_completed_session() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 2)?, transcriber);

    release.notify_one();
    manager.start_recording(session()).await?;
    advance_secs(2).await;
    manager.stop_recording().await;
    settle().await;
    assert_eq!(manager.snapshot().await.status, RecorderStatus::Completed);

    manager.clear_recording().await;
    let snapshot = manager.snapshot().await;
    assert_eq!(snapshot.status, RecorderStatus::Idle);
    assert!(snapshot.transcript.is_none());
    assert_eq!(snapshot.elapsed_secs, 0);

    Ok(())
}

// ============================================================================
// Observation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn subscribers_observe_status_transitions() -> Result<()> {
    let dir = TempDir::new()?;
    let (transcriber, release) = ScriptedTranscriber::new(false);
    let manager = manager(write_fixture(&dir, 3)?, transcriber);
    let rx = manager.subscribe();

    assert_eq!(rx.borrow().status, RecorderStatus::Idle);

    manager.start_recording(session()).await?;
    assert_eq!(rx.borrow().status, RecorderStatus::Recording);

    advance_secs(2).await;
    assert_eq!(rx.borrow().elapsed_secs, 2);

    manager.stop_recording().await;
    assert_eq!(rx.borrow().status, RecorderStatus::Processing);

    release.notify_one();
    settle().await;
    assert_eq!(rx.borrow().status, RecorderStatus::Completed);

    Ok(())
}
