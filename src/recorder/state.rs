use serde::Serialize;
use thiserror::Error;

use super::session::ConsultationSession;
use crate::transcript::DiarizedTranscript;

/// Recording lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderStatus {
    Idle,
    Recording,
    Paused,
    Processing,
    Completed,
    Error,
}

impl RecorderStatus {
    /// Terminal states from which a new session may start.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecorderStatus::Completed | RecorderStatus::Error)
    }

    /// States with an in-flight session that blocks a new start.
    pub fn is_session_active(self) -> bool {
        matches!(
            self,
            RecorderStatus::Recording | RecorderStatus::Paused | RecorderStatus::Processing
        )
    }
}

/// Point-in-time view of the recorder, broadcast to observers.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderSnapshot {
    pub status: RecorderStatus,
    pub session: Option<ConsultationSession>,
    /// Whole seconds elapsed while status was `recording`.
    pub elapsed_secs: u64,
    pub has_audio: bool,
    pub audio_duration_secs: Option<f64>,
    pub transcript: Option<DiarizedTranscript>,
    pub error: Option<String>,
}

impl RecorderSnapshot {
    pub fn idle() -> Self {
        Self {
            status: RecorderStatus::Idle,
            session: None,
            elapsed_secs: 0,
            has_audio: false,
            audio_duration_secs: None,
            transcript: None,
            error: None,
        }
    }
}

/// Precondition failures surfaced to the caller of a recorder operation.
///
/// Everything arising after a session is underway (transcription failures,
/// device loss) is converted into recorder state instead, so the host
/// never sees it as an error value.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("could not access the microphone: {0}")]
    Device(String),
}
