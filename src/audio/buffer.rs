use anyhow::{Context, Result};
use std::io::Cursor;
use tracing::info;

use super::backend::AudioFrame;

/// Accumulates captured PCM frames for one consultation recording.
///
/// Frames are appended for the lifetime of the capture; `finalize`
/// consumes the buffer and produces the immutable audio artifact exactly
/// once, at the moment capture stops.
pub struct SessionBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl SessionBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    pub fn push_frame(&mut self, frame: &AudioFrame) {
        self.samples.extend_from_slice(&frame.samples);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Encode the buffered samples as a single in-memory WAV artifact.
    pub fn finalize(self) -> Result<AudioArtifact> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let duration_secs = self.duration_secs();
        let sample_count = self.samples.len();

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("Failed to create WAV writer")?;
            for sample in &self.samples {
                writer
                    .write_sample(*sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV")?;
        }

        info!(
            "Session audio finalized: {:.1}s, {} samples, {} bytes",
            duration_secs,
            sample_count,
            cursor.get_ref().len()
        );

        Ok(AudioArtifact {
            wav: cursor.into_inner(),
            duration_secs,
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_count,
        })
    }
}

/// The finalized captured audio for one session, immutable once created.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Complete WAV container bytes.
    pub wav: Vec<u8>,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16_000,
            channels: 1,
            timestamp_ms,
        }
    }

    #[test]
    fn finalize_produces_readable_wav() {
        let mut buffer = SessionBuffer::new(16_000, 1);
        buffer.push_frame(&frame(vec![100i16; 16_000], 0));
        buffer.push_frame(&frame(vec![-100i16; 16_000], 1_000));

        let artifact = buffer.finalize().unwrap();
        assert_eq!(artifact.sample_count, 32_000);
        assert!((artifact.duration_secs - 2.0).abs() < 1e-9);

        let reader = hound::WavReader::new(Cursor::new(&artifact.wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.channels, 1);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 32_000);
        assert_eq!(samples[0], 100);
        assert_eq!(samples[31_999], -100);
    }

    #[test]
    fn empty_buffer_finalizes_to_empty_wav() {
        let artifact = SessionBuffer::new(16_000, 1).finalize().unwrap();
        assert_eq!(artifact.sample_count, 0);
        assert_eq!(artifact.duration_secs, 0.0);

        let reader = hound::WavReader::new(Cursor::new(&artifact.wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }
}
