use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use consult_scribe::audio::{AudioSource, CaptureConfig};
use consult_scribe::services::{HttpMedicalTermClassifier, HttpTranscriptionService};
use consult_scribe::{create_router, AppState, Config, RecordingManager};

#[derive(Debug, Parser)]
#[command(name = "consult-scribe", about = "Consultation recording and transcript review service")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/consult-scribe")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let transcriber = Arc::new(HttpTranscriptionService::new(
        cfg.transcription.endpoint.clone(),
        Duration::from_secs(cfg.transcription.timeout_secs),
    )?);
    let classifier = Arc::new(HttpMedicalTermClassifier::new(
        cfg.classifier.endpoint.clone(),
        Duration::from_secs(cfg.classifier.timeout_secs),
    )?);

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        frame_duration_ms: cfg.audio.frame_duration_ms,
        echo_cancellation: cfg.audio.echo_cancellation,
        noise_suppression: cfg.audio.noise_suppression,
    };

    let recorder = RecordingManager::new(transcriber, AudioSource::Microphone, capture_config);
    let state = AppState::new(Arc::clone(&recorder), classifier, cfg.review);

    let router = create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(recorder))
        .await?;

    Ok(())
}

async fn shutdown_signal(recorder: Arc<RecordingManager>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("Shutdown signal received");
    // Release the microphone before the process exits.
    recorder.shutdown().await;
}
