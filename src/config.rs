use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub classifier: ClassifierSettings,
    pub review: ReviewSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Capture granularity: one buffered frame per interval.
    pub frame_duration_ms: u64,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReviewSettings {
    /// Words transcribed below this confidence are flagged for review.
    pub warning_threshold: f64,
    /// Seconds of audio played before/after a word for "play in context".
    pub context_seconds: f64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "consult-scribe")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8070_i64)?
            .set_default("audio.sample_rate", 16_000_i64)?
            .set_default("audio.channels", 1_i64)?
            .set_default("audio.frame_duration_ms", 1_000_i64)?
            .set_default("audio.echo_cancellation", true)?
            .set_default("audio.noise_suppression", true)?
            .set_default("transcription.endpoint", "http://localhost:9000/v1/transcribe")?
            .set_default("transcription.timeout_secs", 120_i64)?
            .set_default("classifier.endpoint", "http://localhost:9100/v1/medical-terms")?
            .set_default("classifier.timeout_secs", 30_i64)?
            .set_default("review.warning_threshold", 0.7)?
            .set_default("review.context_seconds", 3.0)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
