pub mod audio;
pub mod config;
pub mod http;
pub mod recorder;
pub mod services;
pub mod transcript;
pub mod validator;

pub use audio::{
    AudioArtifact, AudioBackend, AudioBackendFactory, AudioFrame, AudioPlayback, AudioSource,
    CaptureConfig, CaptureState, PlaybackCursor, SessionBuffer, WindowedPlayback,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use recorder::{
    ConsultationSession, RecorderError, RecorderSnapshot, RecorderStatus, RecordingManager,
};
pub use services::{
    HttpMedicalTermClassifier, HttpTranscriptionService, MedicalTermClassifier, TermCategory,
    TermClassification, TranscriptionService,
};
pub use transcript::{DiarizedTranscript, TranscriptSegment, TranscriptWord};
pub use validator::{
    FlaggedWord, ReviewProgress, ValidationAction, ValidationGate, ValidationSession,
    ValidationState, WordCorrection,
};
