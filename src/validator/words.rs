use serde::Serialize;

use crate::services::TermCategory;

/// A transcript word flagged for review because its confidence fell below
/// the warning threshold.
///
/// Created in bulk when a transcript with word-level confidence arrives;
/// mutated by classification results and review actions, never deleted.
/// The original transcript is left untouched; corrections live here.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedWord {
    /// Stable identifier, `<segment index>-<word index>`.
    pub id: String,

    /// Word as transcribed.
    pub word: String,

    /// User-entered replacement, if any.
    pub corrected: Option<String>,

    /// Transcription confidence in [0, 1].
    pub probability: f64,

    /// Word start (word-level timestamp when present, else segment start).
    pub start_secs: f64,

    /// Word end (word-level timestamp when present, else segment end).
    pub end_secs: f64,

    /// Raw speaker label of the containing segment.
    pub speaker: String,

    /// Whether the classifier marked this word clinically relevant.
    pub is_medical_term: bool,

    /// Clinical category, when classified as medical.
    pub category: Option<TermCategory>,

    /// Once set, never reverts.
    pub is_reviewed: bool,

    pub is_accepted: bool,
}

impl FlaggedWord {
    /// Still waiting on the human reviewer.
    pub fn is_pending_review(&self) -> bool {
        self.is_medical_term && !self.is_reviewed
    }
}

/// Aggregate review progress, recomputed from the flagged collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewProgress {
    pub total: usize,
    pub reviewed: usize,
    pub medical_total: usize,
    pub medical_reviewed: usize,
    pub percentage: f64,
}

/// The review gate the surrounding workflow honors before the
/// consultation may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationGate {
    pub can_proceed: bool,
    pub pending_medical: usize,
}

/// A committed correction, reported alongside the final transcript.
#[derive(Debug, Clone, Serialize)]
pub struct WordCorrection {
    pub id: String,
    pub original_word: String,
    pub corrected_word: String,
    pub speaker: String,
    pub timestamp_secs: f64,
}
