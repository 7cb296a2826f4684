use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioFrame, CaptureConfig, CaptureState};

/// cpal-based microphone capture.
///
/// The cpal `Stream` is not `Send`, so it lives on a dedicated capture
/// thread for the duration of the session. The thread acquires the device,
/// reports the outcome, then parks until told to stop; dropping the stream
/// releases the device. Echo cancellation and noise suppression are
/// requested via the OS capture stack; cpal itself exposes no knobs for
/// them, so the flags are logged as hints.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    paused: Arc<AtomicBool>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    state: CaptureState,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            paused: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
            state: CaptureState::Inactive,
        }
    }
}

fn default_input_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow!("no default input device available"))
}

/// Mix interleaved channels down to mono by averaging.
fn mix_to_mono(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear-interpolation resampler.
fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos.fract();

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx] as f64;
            let s1 = samples[src_idx + 1] as f64;
            (s0 + (s1 - s0) * frac) as i16
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0
        };
        output.push(sample);
    }
    output
}

/// Per-callback state for assembling fixed-duration frames.
struct FrameAssembler {
    pending: Vec<i16>,
    frame_samples: usize,
    frames_delivered: u64,
    frame_ms: u64,
    sample_rate: u32,
    channels: u16,
    tx: mpsc::Sender<AudioFrame>,
}

impl FrameAssembler {
    fn push(&mut self, samples: &[i16]) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let frame = AudioFrame {
                samples: std::mem::replace(&mut self.pending, rest),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: self.frames_delivered * self.frame_ms,
            };
            self.frames_delivered += 1;
            if self.tx.try_send(frame).is_err() {
                warn!("Dropping audio frame: capture channel full or closed");
            }
        }
    }
}

fn capture_thread_main(
    config: CaptureConfig,
    paused: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let acquire = || -> Result<cpal::Stream> {
        let device = default_input_device()?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(|e| anyhow!("failed to read input config: {}", e))?;
        let sample_format = supported.sample_format();
        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let device_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels as usize;
        let target_rate = config.sample_rate;

        info!(
            device = %device_name,
            device_rate,
            device_channels,
            echo_cancellation = config.echo_cancellation,
            noise_suppression = config.noise_suppression,
            "Microphone capture starting"
        );

        let assembler = Arc::new(parking_lot::Mutex::new(FrameAssembler {
            pending: Vec::new(),
            frame_samples: config.frame_samples().max(1),
            frames_delivered: 0,
            frame_ms: config.frame_duration_ms,
            sample_rate: target_rate,
            channels: config.channels,
            tx: frame_tx,
        }));

        let process = {
            let assembler = Arc::clone(&assembler);
            let paused = Arc::clone(&paused);
            move |data: &[i16]| {
                if paused.load(Ordering::SeqCst) {
                    return;
                }
                let mono = mix_to_mono(data, device_channels);
                let resampled = resample_linear(&mono, device_rate, target_rate);
                assembler.lock().push(&resampled);
            }
        };

        let err_fn = |err| error!("Microphone stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::I16 => {
                let process = process.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| process(data),
                    err_fn,
                    None,
                )
            }
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    process(&converted);
                },
                err_fn,
                None,
            ),
            other => return Err(anyhow!("unsupported sample format: {:?}", other)),
        }
        .map_err(|e| anyhow!("failed to build input stream: {}", e))?;

        stream
            .play()
            .map_err(|e| anyhow!("failed to start input stream: {}", e))?;

        Ok(stream)
    };

    match acquire() {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            // Park until stop is requested or the backend is dropped.
            let _ = stop_rx.recv();
            drop(stream);
            info!("Microphone released");
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        self.paused.store(false, Ordering::SeqCst);

        let config = self.config.clone();
        let paused = Arc::clone(&self.paused);
        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread_main(config, paused, frame_tx, ready_tx, stop_rx))
            .map_err(|e| anyhow!("failed to spawn capture thread: {}", e))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.thread = Some(handle);
                self.state = CaptureState::Active;
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(anyhow!("capture thread exited before reporting readiness"))
            }
        }
    }

    async fn pause(&mut self) -> Result<()> {
        if self.state != CaptureState::Active {
            anyhow::bail!("microphone capture is not active");
        }
        self.paused.store(true, Ordering::SeqCst);
        self.state = CaptureState::Paused;
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        if self.state != CaptureState::Paused {
            anyhow::bail!("microphone capture is not paused");
        }
        self.paused.store(false, Ordering::SeqCst);
        self.state = CaptureState::Active;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || {
                if handle.join().is_err() {
                    error!("Capture thread panicked");
                }
            })
            .await?;
        }
        self.state = CaptureState::Inactive;
        Ok(())
    }

    fn state(&self) -> CaptureState {
        self.state
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // Disconnecting the stop channel unparks the capture thread, which
        // drops the stream and releases the device.
        self.stop_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_to_mono_averages_channels() {
        assert_eq!(mix_to_mono(&[100, 200, -50, 50], 2), vec![150, 0]);
        assert_eq!(mix_to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![100, 200, 300];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn resample_halves_sample_count() {
        let samples: Vec<i16> = (0..480).map(|i| i as i16).collect();
        let out = resample_linear(&samples, 48_000, 16_000);
        assert!(out.len() >= 159 && out.len() <= 161);
    }
}
