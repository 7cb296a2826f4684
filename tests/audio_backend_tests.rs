// Integration tests for the file-driven capture backend

use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

use consult_scribe::audio::{AudioBackend, CaptureConfig, CaptureState, FileBackend, SessionBuffer};

fn write_fixture(dir: &TempDir, secs: u32) -> Result<PathBuf> {
    let path = dir.path().join("fixture.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..(16_000 * secs) {
        writer.write_sample((i % 64) as i16)?;
    }
    writer.finalize()?;

    Ok(path)
}

#[tokio::test]
async fn unpaced_backend_delivers_every_sample() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, 3)?;

    let mut backend = FileBackend::unpaced(&path, CaptureConfig::default());
    let mut frames = backend.start().await?;
    assert_eq!(backend.state(), CaptureState::Active);

    let mut buffer = SessionBuffer::new(16_000, 1);
    while let Some(frame) = frames.recv().await {
        assert_eq!(frame.sample_rate, 16_000);
        assert_eq!(frame.channels, 1);
        buffer.push_frame(&frame);
    }

    assert!((buffer.duration_secs() - 3.0).abs() < 1e-9);

    backend.stop().await?;
    assert_eq!(backend.state(), CaptureState::Inactive);
    Ok(())
}

#[tokio::test]
async fn frame_timestamps_advance_by_the_frame_interval() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, 2)?;

    let mut backend = FileBackend::unpaced(&path, CaptureConfig::default());
    let mut frames = backend.start().await?;

    let mut timestamps = Vec::new();
    while let Some(frame) = frames.recv().await {
        timestamps.push(frame.timestamp_ms);
    }
    assert_eq!(timestamps, vec![0, 1_000]);

    backend.stop().await?;
    Ok(())
}

#[tokio::test]
async fn start_fails_for_a_missing_file() {
    let mut backend = FileBackend::new("/nonexistent/audio.wav", CaptureConfig::default());
    assert!(backend.start().await.is_err());
    assert_eq!(backend.state(), CaptureState::Inactive);
}

#[tokio::test]
async fn start_fails_on_format_mismatch() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    writer.write_sample(0i16)?;
    writer.write_sample(0i16)?;
    writer.finalize()?;

    let mut backend = FileBackend::new(&path, CaptureConfig::default());
    let err = backend.start().await.expect_err("format mismatch");
    assert!(err.to_string().contains("format mismatch"));
    Ok(())
}

#[tokio::test]
async fn pause_suspends_delivery_without_discarding_audio() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_fixture(&dir, 1)?;

    // 100ms frames so the pause lands inside a pacing interval.
    let config = CaptureConfig {
        frame_duration_ms: 100,
        ..CaptureConfig::default()
    };
    let mut backend = FileBackend::new(&path, config);
    let mut frames = backend.start().await?;

    let first = frames.recv().await.expect("first frame");

    backend.pause().await?;
    assert_eq!(backend.state(), CaptureState::Paused);

    // Nothing arrives while paused.
    let pending =
        tokio::time::timeout(std::time::Duration::from_millis(250), frames.recv()).await;
    assert!(pending.is_err(), "no frames while paused");

    backend.resume().await?;
    assert_eq!(backend.state(), CaptureState::Active);

    // Everything recorded before and after the pause is still delivered.
    let mut total = first.samples.len();
    while let Some(frame) = frames.recv().await {
        total += frame.samples.len();
    }
    assert_eq!(total, 16_000, "no audio discarded across the pause");

    backend.stop().await?;
    Ok(())
}
