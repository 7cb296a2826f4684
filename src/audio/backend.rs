use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Capture lifecycle as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Device not held.
    Inactive,
    /// Frames are being delivered.
    Active,
    /// Device held, frame delivery suspended.
    Paused,
}

/// Audio sample data (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved).
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Timestamp in milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Requested capture format for a consultation recording.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (backends resample if the device differs).
    pub sample_rate: u32,
    /// Target channel count (1 = mono).
    pub channels: u16,
    /// Buffering granularity: one frame per interval.
    pub frame_duration_ms: u64,
    /// Request echo cancellation from the capture stack where supported.
    pub echo_cancellation: bool,
    /// Request noise suppression from the capture stack where supported.
    pub noise_suppression: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000, // 16kHz for speech transcription
            channels: 1,         // Mono
            frame_duration_ms: 1_000,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

impl CaptureConfig {
    /// Samples per delivered frame.
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms / 1_000) as usize
            * self.channels as usize
    }
}

/// Audio capture backend trait.
///
/// The recorder treats the device as an exclusively-held resource: a
/// backend must release it on `stop()` and on drop, whichever comes first.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Acquire the device and begin capture.
    ///
    /// Returns a channel receiver that will receive audio frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Suspend frame delivery without releasing the device.
    async fn pause(&mut self) -> Result<()>;

    /// Resume a paused capture.
    async fn resume(&mut self) -> Result<()>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Current capture state.
    fn state(&self) -> CaptureState;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Audio source type.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input.
    Microphone,
    /// WAV file replayed as timed frames (tests, batch processing).
    File(PathBuf),
}

/// Audio backend factory.
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create an audio backend for the given source.
    pub fn create(source: &AudioSource, config: CaptureConfig) -> Box<dyn AudioBackend> {
        match source {
            AudioSource::Microphone => {
                Box::new(super::microphone::MicrophoneBackend::new(config))
            }
            AudioSource::File(path) => Box::new(super::file::FileBackend::new(path, config)),
        }
    }
}
