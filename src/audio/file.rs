use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioFrame, CaptureConfig, CaptureState};

/// Replays a WAV file as timed capture frames.
///
/// Stands in for a live microphone in tests and batch processing. Paced
/// delivery mimics real capture cadence; `unpaced` floods frames as fast
/// as the channel accepts them.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    paced: bool,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    state: CaptureState,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>, config: CaptureConfig) -> Self {
        Self::with_pacing(path, config, true)
    }

    pub fn unpaced(path: impl AsRef<Path>, config: CaptureConfig) -> Self {
        Self::with_pacing(path, config, false)
    }

    fn with_pacing(path: impl AsRef<Path>, config: CaptureConfig, paced: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            paced,
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            feeder: None,
            state: CaptureState::Inactive,
        }
    }

    fn read_samples(&self) -> Result<Vec<i16>> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open WAV file: {}", self.path.display()))?;

        let spec = reader.spec();
        if spec.sample_rate != self.config.sample_rate || spec.channels != self.config.channels {
            anyhow::bail!(
                "WAV format mismatch: expected {}Hz {}ch, got {}Hz {}ch",
                self.config.sample_rate,
                self.config.channels,
                spec.sample_rate,
                spec.channels
            );
        }

        reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let samples = self.read_samples()?;

        info!(
            "File capture started: {} ({:.1}s)",
            self.path.display(),
            samples.len() as f64 / (self.config.sample_rate as f64 * self.config.channels as f64)
        );

        self.paused.store(false, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(32);
        let frame_samples = self.config.frame_samples().max(1);
        let frame_duration = Duration::from_millis(self.config.frame_duration_ms);
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let paced = self.paced;
        let paused = Arc::clone(&self.paused);
        let stopped = Arc::clone(&self.stopped);

        self.feeder = Some(tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            let frame_ms = frame_duration.as_millis() as u64;

            'feed: for chunk in samples.chunks(frame_samples) {
                loop {
                    while paused.load(Ordering::SeqCst) && !stopped.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    if stopped.load(Ordering::SeqCst) {
                        break 'feed;
                    }
                    if paced {
                        tokio::time::sleep(frame_duration).await;
                    }
                    // A pause that landed during the pacing sleep holds
                    // this frame instead of leaking it through.
                    if !paused.load(Ordering::SeqCst) {
                        break;
                    }
                }

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                timestamp_ms += frame_ms;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        self.state = CaptureState::Active;
        Ok(rx)
    }

    async fn pause(&mut self) -> Result<()> {
        if self.state != CaptureState::Active {
            anyhow::bail!("file capture is not active");
        }
        self.paused.store(true, Ordering::SeqCst);
        self.state = CaptureState::Paused;
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        if self.state != CaptureState::Paused {
            anyhow::bail!("file capture is not paused");
        }
        self.paused.store(false, Ordering::SeqCst);
        self.state = CaptureState::Active;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        if let Some(feeder) = self.feeder.take() {
            if let Err(e) = feeder.await {
                if !e.is_cancelled() {
                    warn!("File feeder task panicked: {}", e);
                }
            }
        }
        self.state = CaptureState::Inactive;
        Ok(())
    }

    fn state(&self) -> CaptureState {
        self.state
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}
