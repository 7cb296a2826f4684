use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one consultation recording.
///
/// Immutable once created; owned by the recording manager for the
/// session's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSession {
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub started_at: DateTime<Utc>,
}

impl ConsultationSession {
    pub fn new(
        appointment_id: impl Into<String>,
        patient_id: impl Into<String>,
        patient_name: impl Into<String>,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            patient_id: patient_id.into(),
            patient_name: patient_name.into(),
            started_at: Utc::now(),
        }
    }
}
