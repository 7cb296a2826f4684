use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::state::{AppState, ValidationEntry};
use crate::audio::{CursorState, PlaybackCursor};
use crate::recorder::{ConsultationSession, RecorderError};
use crate::transcript::DiarizedTranscript;
use crate::validator::{
    FlaggedWord, ReviewProgress, ValidationGate, ValidationSession, WordCorrection,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateValidationRequest {
    /// Transcript to review; defaults to the recorder's completed
    /// transcript when omitted.
    pub transcript: Option<DiarizedTranscript>,
}

#[derive(Debug, Deserialize)]
pub struct WordActionRequest {
    pub word_id: String,
    pub correction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectWordRequest {
    /// Omit to clear the selection.
    pub word_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationView {
    pub validation_id: String,
    pub flagged: Vec<FlaggedWord>,
    pub selected: Option<String>,
    pub progress: ReviewProgress,
    pub gate: ValidationGate,
    pub playback: CursorState,
}

#[derive(Debug, Serialize)]
pub struct ValidationResultResponse {
    pub validation_id: String,
    pub final_transcript: String,
    pub corrections: Vec<WordCorrection>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn validation_view(entry: &ValidationEntry) -> ValidationView {
    ValidationView {
        validation_id: entry.session.id().to_string(),
        flagged: entry.session.flagged_words().to_vec(),
        selected: entry.session.state().selected.clone(),
        progress: entry.session.progress(),
        gate: entry.session.gate(),
        playback: entry.cursor.snapshot(),
    }
}

// ============================================================================
// Recording Handlers
// ============================================================================

/// POST /recording/start
/// Start a new consultation recording
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    let session =
        ConsultationSession::new(req.appointment_id, req.patient_id, req.patient_name);

    match state.recorder.start_recording(session).await {
        Ok(()) => {
            let snapshot = state.recorder.snapshot().await;
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        Err(RecorderError::AlreadyRecording) => {
            error_response(StatusCode::CONFLICT, "a recording session is already active")
        }
        Err(e @ RecorderError::Device(_)) => {
            error!("Failed to start recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /recording/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.recorder.pause_recording().await;
    Json(state.recorder.snapshot().await)
}

/// POST /recording/resume
pub async fn resume_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.recorder.resume_recording().await;
    Json(state.recorder.snapshot().await)
}

/// POST /recording/stop
/// Finalize capture; transcription continues in the background
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.recorder.stop_recording().await;
    Json(state.recorder.snapshot().await)
}

/// POST /recording/cancel
pub async fn cancel_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.recorder.cancel_recording().await;
    Json(state.recorder.snapshot().await)
}

/// POST /recording/clear
pub async fn clear_recording(State(state): State<AppState>) -> impl IntoResponse {
    state.recorder.clear_recording().await;
    Json(state.recorder.snapshot().await)
}

/// GET /recording/status
pub async fn recording_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.recorder.snapshot().await)
}

/// GET /recording/transcript
pub async fn recording_transcript(State(state): State<AppState>) -> impl IntoResponse {
    match state.recorder.transcript().await {
        Some(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no transcript available"),
    }
}

/// GET /recording/audio
/// The finalized session audio, for the manual-entry fallback
pub async fn recording_audio(State(state): State<AppState>) -> impl IntoResponse {
    match state.recorder.audio().await {
        Some(artifact) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "audio/wav")],
            artifact.wav.clone(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no recorded audio available"),
    }
}

// ============================================================================
// Validation Handlers
// ============================================================================

/// POST /validations
/// Open a review session for a diarized transcript
pub async fn create_validation(
    State(state): State<AppState>,
    Json(req): Json<CreateValidationRequest>,
) -> impl IntoResponse {
    let transcript = match req.transcript {
        Some(transcript) => transcript,
        None => match state.recorder.transcript().await {
            Some(transcript) => transcript,
            None => {
                return error_response(
                    StatusCode::CONFLICT,
                    "no transcript available to validate",
                );
            }
        },
    };

    let cursor = Arc::new(PlaybackCursor::new());
    let mut session = ValidationSession::new(
        transcript,
        state.review.warning_threshold,
        Arc::clone(&cursor) as Arc<dyn crate::audio::AudioPlayback>,
        state.review.context_seconds,
    );

    session.classify(state.classifier.as_ref()).await;

    let id = session.id().to_string();
    let entry = ValidationEntry { session, cursor };
    let view = validation_view(&entry);

    {
        let mut validations = state.validations.write().await;
        validations.insert(id.clone(), Arc::new(Mutex::new(entry)));
    }

    info!("Validation session created: {}", id);
    (StatusCode::OK, Json(view)).into_response()
}

async fn with_validation<F>(state: &AppState, id: &str, f: F) -> axum::response::Response
where
    F: FnOnce(&mut ValidationEntry),
{
    let entry = {
        let validations = state.validations.read().await;
        validations.get(id).cloned()
    };

    match entry {
        Some(entry) => {
            let mut entry = entry.lock().await;
            f(&mut entry);
            (StatusCode::OK, Json(validation_view(&entry))).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("validation session {} not found", id),
        ),
    }
}

/// GET /validations/:id
pub async fn get_validation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    with_validation(&state, &id, |_| {}).await
}

/// POST /validations/:id/accept
pub async fn accept_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WordActionRequest>,
) -> impl IntoResponse {
    with_validation(&state, &id, |entry| {
        entry.session.accept(req.word_id, req.correction);
    })
    .await
}

/// POST /validations/:id/skip
pub async fn skip_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WordActionRequest>,
) -> impl IntoResponse {
    with_validation(&state, &id, |entry| {
        entry.session.skip(req.word_id);
    })
    .await
}

/// POST /validations/:id/update
pub async fn update_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WordActionRequest>,
) -> impl IntoResponse {
    match req.correction {
        Some(correction) => {
            with_validation(&state, &id, |entry| {
                entry.session.update(req.word_id, correction);
            })
            .await
        }
        None => error_response(StatusCode::BAD_REQUEST, "correction is required"),
    }
}

/// POST /validations/:id/accept-all
pub async fn accept_all(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    with_validation(&state, &id, |entry| {
        entry.session.accept_all();
    })
    .await
}

/// POST /validations/:id/select
pub async fn select_word(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SelectWordRequest>,
) -> impl IntoResponse {
    with_validation(&state, &id, |entry| {
        entry.session.select(req.word_id);
    })
    .await
}

/// POST /validations/:id/play
/// Play the selected word in context; auto-pauses after the window
pub async fn play_selected(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    with_validation(&state, &id, |entry| {
        entry.session.play_selected_in_context();
    })
    .await
}

/// GET /validations/:id/result
/// Final transcript + corrections, gated on review completion
pub async fn validation_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let entry = {
        let validations = state.validations.read().await;
        validations.get(&id).cloned()
    };

    match entry {
        Some(entry) => {
            let entry = entry.lock().await;
            let gate = entry.session.gate();
            if !gate.can_proceed {
                return error_response(
                    StatusCode::CONFLICT,
                    format!(
                        "{} medical term(s) still pending review",
                        gate.pending_medical
                    ),
                );
            }

            let response = ValidationResultResponse {
                validation_id: entry.session.id().to_string(),
                final_transcript: entry.session.final_transcript(),
                corrections: entry.session.corrections(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("validation session {} not found", id),
        ),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
