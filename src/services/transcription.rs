use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::info;

use crate::transcript::DiarizedTranscript;

/// Boundary to the external speech-to-text service.
///
/// Takes the finalized session audio and returns a diarized transcript
/// with word-level confidence. There is no mid-flight cancellation: once
/// issued, the call either resolves or fails, and the recorder decides
/// what to do with the outcome.
#[async_trait::async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<DiarizedTranscript>;
}

/// HTTP client for the hosted transcription endpoint.
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriptionService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("consult-scribe/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl TranscriptionService for HttpTranscriptionService {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<DiarizedTranscript> {
        info!(
            "Submitting {} bytes of audio to {}",
            audio_wav.len(),
            self.endpoint
        );

        let part = Part::bytes(audio_wav.to_vec())
            .file_name("consultation.wav")
            .mime_str("audio/wav")
            .context("Failed to build audio part")?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?
            .error_for_status()
            .context("Transcription service returned an error status")?;

        let transcript: DiarizedTranscript = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        info!(
            "Transcription complete: {} segments, {} speakers, language {}",
            transcript.segments.len(),
            transcript.num_speakers,
            transcript.language
        );

        Ok(transcript)
    }
}
