use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::audio::PlaybackCursor;
use crate::config::ReviewSettings;
use crate::recorder::RecordingManager;
use crate::services::MedicalTermClassifier;
use crate::validator::ValidationSession;

/// A review session plus the playback cursor its client should mirror.
pub struct ValidationEntry {
    pub session: ValidationSession,
    pub cursor: Arc<PlaybackCursor>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single application-wide recorder.
    pub recorder: Arc<RecordingManager>,

    /// Medical term classification service.
    pub classifier: Arc<dyn MedicalTermClassifier>,

    /// Review thresholds.
    pub review: ReviewSettings,

    /// Open validation sessions (validation_id → entry).
    pub validations: Arc<RwLock<HashMap<String, Arc<Mutex<ValidationEntry>>>>>,
}

impl AppState {
    pub fn new(
        recorder: Arc<RecordingManager>,
        classifier: Arc<dyn MedicalTermClassifier>,
        review: ReviewSettings,
    ) -> Self {
        Self {
            recorder,
            classifier,
            review,
            validations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
