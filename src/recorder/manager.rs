use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::session::ConsultationSession;
use super::state::{RecorderError, RecorderSnapshot, RecorderStatus};
use crate::audio::{
    AudioArtifact, AudioBackend, AudioBackendFactory, AudioSource, CaptureConfig, CaptureState,
    SessionBuffer,
};
use crate::services::TranscriptionService;
use crate::transcript::DiarizedTranscript;

/// Owns the single in-flight consultation recording.
///
/// One instance is created at startup and shared application-wide, so
/// status survives navigation and in-flight transcription results always
/// have a live owner to land on. All mutation happens behind one lock;
/// observers follow along through a watch channel.
pub struct RecordingManager {
    transcriber: Arc<dyn TranscriptionService>,
    source: AudioSource,
    capture_config: CaptureConfig,
    elapsed_secs: Arc<AtomicU64>,
    events: Arc<watch::Sender<RecorderSnapshot>>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    status: RecorderStatus,
    session: Option<ConsultationSession>,
    backend: Option<Box<dyn AudioBackend>>,
    buffer: Option<Arc<parking_lot::Mutex<Option<SessionBuffer>>>>,
    artifact: Option<Arc<AudioArtifact>>,
    transcript: Option<DiarizedTranscript>,
    error: Option<String>,
    /// Bumped on every session start/cancel/clear; a settled transcription
    /// carrying an older epoch is stale and must not touch state.
    epoch: u64,
    tick_task: Option<JoinHandle<()>>,
    drain_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            status: RecorderStatus::Idle,
            session: None,
            backend: None,
            buffer: None,
            artifact: None,
            transcript: None,
            error: None,
            epoch: 0,
            tick_task: None,
            drain_task: None,
        }
    }

    fn stop_tick(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }
}

fn snapshot_of(inner: &Inner, elapsed_secs: &AtomicU64) -> RecorderSnapshot {
    RecorderSnapshot {
        status: inner.status,
        session: inner.session.clone(),
        elapsed_secs: elapsed_secs.load(Ordering::SeqCst),
        has_audio: inner.artifact.is_some(),
        audio_duration_secs: inner.artifact.as_ref().map(|a| a.duration_secs),
        transcript: inner.transcript.clone(),
        error: inner.error.clone(),
    }
}

impl RecordingManager {
    pub fn new(
        transcriber: Arc<dyn TranscriptionService>,
        source: AudioSource,
        capture_config: CaptureConfig,
    ) -> Arc<Self> {
        let (events, _) = watch::channel(RecorderSnapshot::idle());

        Arc::new(Self {
            transcriber,
            source,
            capture_config,
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            events: Arc::new(events),
            inner: Arc::new(Mutex::new(Inner::new())),
        })
    }

    /// Observe recorder snapshots, including per-second elapsed updates.
    pub fn subscribe(&self) -> watch::Receiver<RecorderSnapshot> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> RecorderSnapshot {
        let inner = self.inner.lock().await;
        snapshot_of(&inner, &self.elapsed_secs)
    }

    pub async fn audio(&self) -> Option<Arc<AudioArtifact>> {
        self.inner.lock().await.artifact.clone()
    }

    pub async fn transcript(&self) -> Option<DiarizedTranscript> {
        self.inner.lock().await.transcript.clone()
    }

    /// Begin a new recording session.
    ///
    /// Valid from idle and from the terminal states. A start while a
    /// session is active (recording, paused, or processing) is rejected
    /// and leaves state untouched.
    pub async fn start_recording(
        &self,
        session: ConsultationSession,
    ) -> Result<(), RecorderError> {
        let mut inner = self.inner.lock().await;

        if inner.status.is_session_active() {
            warn!(
                "Rejecting start for appointment {}: session already active",
                session.appointment_id
            );
            return Err(RecorderError::AlreadyRecording);
        }

        info!(
            "Starting recording for appointment {} (patient {})",
            session.appointment_id, session.patient_name
        );

        // Clear the outputs of any prior session.
        inner.epoch += 1;
        inner.artifact = None;
        inner.transcript = None;
        inner.error = None;
        inner.session = None;
        self.elapsed_secs.store(0, Ordering::SeqCst);

        let mut backend = AudioBackendFactory::create(&self.source, self.capture_config.clone());

        let frames = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Audio capture failed to start: {:#}", e);
                inner.status = RecorderStatus::Error;
                inner.error = Some(format!("could not access the microphone: {}", e));
                self.notify(&inner);
                return Err(RecorderError::Device(e.to_string()));
            }
        };

        let buffer = Arc::new(parking_lot::Mutex::new(Some(SessionBuffer::new(
            self.capture_config.sample_rate,
            self.capture_config.channels,
        ))));

        let drain_buffer = Arc::clone(&buffer);
        inner.drain_task = Some(tokio::spawn(async move {
            let mut frames = frames;
            while let Some(frame) = frames.recv().await {
                if let Some(buffer) = drain_buffer.lock().as_mut() {
                    buffer.push_frame(&frame);
                }
            }
        }));

        inner.backend = Some(backend);
        inner.buffer = Some(buffer);
        inner.session = Some(session);
        inner.status = RecorderStatus::Recording;
        inner.tick_task = Some(self.spawn_tick());
        self.notify(&inner);

        Ok(())
    }

    /// Freeze the elapsed timer and suspend capture. No-op unless
    /// currently recording with an active capture.
    pub async fn pause_recording(&self) {
        let mut inner = self.inner.lock().await;

        if inner.status != RecorderStatus::Recording {
            return;
        }
        let capturing = inner
            .backend
            .as_ref()
            .map(|b| b.state() == CaptureState::Active)
            .unwrap_or(false);
        if !capturing {
            return;
        }

        if let Some(backend) = inner.backend.as_mut() {
            if let Err(e) = backend.pause().await {
                warn!("Failed to pause capture: {:#}", e);
                return;
            }
        }

        inner.stop_tick();
        inner.status = RecorderStatus::Paused;
        info!("Recording paused");
        self.notify(&inner);
    }

    /// Resume a paused capture and restart the elapsed timer. No-op
    /// unless currently paused.
    pub async fn resume_recording(&self) {
        let mut inner = self.inner.lock().await;

        if inner.status != RecorderStatus::Paused {
            return;
        }
        let paused = inner
            .backend
            .as_ref()
            .map(|b| b.state() == CaptureState::Paused)
            .unwrap_or(false);
        if !paused {
            return;
        }

        if let Some(backend) = inner.backend.as_mut() {
            if let Err(e) = backend.resume().await {
                warn!("Failed to resume capture: {:#}", e);
                return;
            }
        }

        inner.status = RecorderStatus::Recording;
        inner.tick_task = Some(self.spawn_tick());
        info!("Recording resumed");
        self.notify(&inner);
    }

    /// Finalize the captured audio, release the device, and hand the
    /// artifact to the transcription service in the background.
    ///
    /// Resolves once capture has stopped; the processing → completed/error
    /// transition happens whenever the transcription call settles.
    pub async fn stop_recording(&self) {
        let mut inner = self.inner.lock().await;

        if !matches!(
            inner.status,
            RecorderStatus::Recording | RecorderStatus::Paused
        ) {
            return;
        }

        info!("Stopping recording");
        inner.stop_tick();

        // Release the device; the capture channel closes and the drain
        // task finishes consuming buffered frames.
        if let Some(mut backend) = inner.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture backend: {:#}", e);
            }
        }
        if let Some(drain) = inner.drain_task.take() {
            if let Err(e) = drain.await {
                if !e.is_cancelled() {
                    error!("Capture drain task panicked: {}", e);
                }
            }
        }

        let buffered = inner.buffer.take().and_then(|b| b.lock().take());
        match buffered.map(SessionBuffer::finalize) {
            Some(Ok(artifact)) => {
                inner.artifact = Some(Arc::new(artifact));
            }
            Some(Err(e)) => {
                error!("Failed to finalize session audio: {:#}", e);
                inner.status = RecorderStatus::Error;
                inner.error = Some("could not finalize the recorded audio".to_string());
                self.notify(&inner);
                return;
            }
            None => {}
        }

        // Surface processing immediately; the caller is not blocked on
        // the transcription round-trip.
        inner.status = RecorderStatus::Processing;
        self.notify(&inner);

        if let Some(artifact) = inner.artifact.clone() {
            let epoch = inner.epoch;
            let transcriber = Arc::clone(&self.transcriber);
            let shared = Arc::clone(&self.inner);
            let events = Arc::clone(&self.events);
            let elapsed = Arc::clone(&self.elapsed_secs);
            tokio::spawn(async move {
                let outcome = transcriber
                    .transcribe(&artifact.wav)
                    .await
                    .map_err(|e| format!("{:#}", e));
                Self::settle_transcription(shared, events, elapsed, epoch, outcome).await;
            });
        }
    }

    /// Force-stop capture, discard buffered audio, and reset to idle.
    pub async fn cancel_recording(&self) {
        let mut inner = self.inner.lock().await;

        info!("Cancelling recording session");
        inner.epoch += 1;
        inner.stop_tick();
        if let Some(drain) = inner.drain_task.take() {
            drain.abort();
        }
        if let Some(mut backend) = inner.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture backend: {:#}", e);
            }
        }

        inner.buffer = None;
        self.reset(&mut inner);
        self.notify(&inner);
    }

    /// Reset to idle without forcing a device stop.
    ///
    /// Intended for dismissing the processing/completed/error states,
    /// where the device is already released. A backend still present is
    /// dropped, which releases the device as its teardown obligation.
    pub async fn clear_recording(&self) {
        let mut inner = self.inner.lock().await;

        info!("Clearing recording state");
        inner.epoch += 1;
        inner.stop_tick();
        if let Some(drain) = inner.drain_task.take() {
            drain.abort();
        }
        inner.backend = None;
        inner.buffer = None;
        self.reset(&mut inner);
        self.notify(&inner);
    }

    /// Release any held device before the process exits.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_tick();
        if let Some(drain) = inner.drain_task.take() {
            drain.abort();
        }
        if let Some(mut backend) = inner.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture backend on shutdown: {:#}", e);
            }
        }
    }

    async fn settle_transcription(
        shared: Arc<Mutex<Inner>>,
        events: Arc<watch::Sender<RecorderSnapshot>>,
        elapsed_secs: Arc<AtomicU64>,
        epoch: u64,
        outcome: Result<DiarizedTranscript, String>,
    ) {
        let mut inner = shared.lock().await;

        if inner.epoch != epoch {
            info!("Ignoring transcription outcome from a superseded session");
            return;
        }
        if inner.status != RecorderStatus::Processing {
            return;
        }

        match outcome {
            Ok(transcript) => {
                info!(
                    "Transcription completed: {} segments",
                    transcript.segments.len()
                );
                inner.transcript = Some(transcript);
                inner.status = RecorderStatus::Completed;
            }
            Err(message) => {
                error!("Transcription failed: {}", message);
                let message = if message.trim().is_empty() {
                    "transcription failed".to_string()
                } else {
                    message
                };

                // The audio artifact is preserved so the consultation can
                // proceed manually with the untranscribed recording.
                inner.error = Some(message);
                inner.status = RecorderStatus::Error;
            }
        }

        events.send_replace(snapshot_of(&inner, &elapsed_secs));
    }

    fn reset(&self, inner: &mut Inner) {
        inner.status = RecorderStatus::Idle;
        inner.session = None;
        inner.artifact = None;
        inner.transcript = None;
        inner.error = None;
        self.elapsed_secs.store(0, Ordering::SeqCst);
    }

    fn spawn_tick(&self) -> JoinHandle<()> {
        let elapsed = Arc::clone(&self.elapsed_secs);
        let events = Arc::clone(&self.events);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let secs = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send_modify(|snapshot| snapshot.elapsed_secs = secs);
            }
        })
    }

    fn notify(&self, inner: &Inner) {
        self.events
            .send_replace(snapshot_of(inner, &self.elapsed_secs));
    }
}
