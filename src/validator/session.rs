use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::reducer::{self, ValidationAction, ValidationState};
use super::selectors;
use super::words::{FlaggedWord, ReviewProgress, ValidationGate, WordCorrection};
use crate::audio::{AudioPlayback, WindowedPlayback};
use crate::services::MedicalTermClassifier;
use crate::transcript::DiarizedTranscript;

/// Drives one transcript through the review loop.
///
/// Owns the reducer state plus the playback coupling: selecting a word
/// seeks the player to its timestamp, and "play in context" schedules a
/// bounded window with auto-pause.
pub struct ValidationSession {
    id: String,
    transcript: DiarizedTranscript,
    state: ValidationState,
    playback: WindowedPlayback,
}

impl ValidationSession {
    pub fn new(
        transcript: DiarizedTranscript,
        warning_threshold: f64,
        player: Arc<dyn AudioPlayback>,
        context_secs: f64,
    ) -> Self {
        let state = reducer::initial_state(&transcript, warning_threshold);
        info!(
            "Validation session opened: {} flagged of {} segments",
            state.words.len(),
            transcript.segments.len()
        );

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transcript,
            state,
            playback: WindowedPlayback::new(player, context_secs),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn flagged_words(&self) -> &[FlaggedWord] {
        &self.state.words
    }

    pub fn selected_word(&self) -> Option<&FlaggedWord> {
        let id = self.state.selected.as_deref()?;
        self.state.words.iter().find(|w| w.id == id)
    }

    /// Run the single classification round for this transcript.
    ///
    /// The flagged words' text is deduplicated case-insensitively before
    /// the call. A classifier failure is absorbed: every flagged word is
    /// auto-accepted so review cannot be blocked by an outage.
    pub async fn classify(&mut self, classifier: &dyn MedicalTermClassifier) {
        if !self.state.classification_pending {
            return;
        }

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for word in &self.state.words {
            let lower = word.word.to_lowercase();
            if seen.insert(lower.clone()) {
                terms.push(lower);
            }
        }

        match classifier.classify(&terms).await {
            Ok(classifications) => {
                self.dispatch(ValidationAction::ClassificationResolved(classifications));
            }
            Err(e) => {
                warn!(
                    "Medical term classification failed, auto-accepting all flagged words: {:#}",
                    e
                );
                self.dispatch(ValidationAction::ClassificationFailed);
            }
        }
    }

    pub fn accept(&mut self, id: impl Into<String>, correction: Option<String>) {
        self.dispatch(ValidationAction::Accept {
            id: id.into(),
            correction,
        });
    }

    pub fn skip(&mut self, id: impl Into<String>) {
        self.dispatch(ValidationAction::Skip { id: id.into() });
    }

    pub fn update(&mut self, id: impl Into<String>, correction: impl Into<String>) {
        self.dispatch(ValidationAction::Update {
            id: id.into(),
            correction: correction.into(),
        });
    }

    pub fn accept_all(&mut self) {
        self.dispatch(ValidationAction::AcceptAll);
    }

    /// Explicit navigation; selecting a concrete word seeks playback to
    /// its timestamp.
    pub fn select(&mut self, id: Option<String>) {
        self.dispatch(ValidationAction::Select(id));
        if let Some(word) = self.selected_word() {
            self.playback.seek(word.start_secs);
        }
    }

    /// Play the selected word with surrounding context. Returns false if
    /// nothing is selected.
    pub fn play_selected_in_context(&self) -> bool {
        match self.selected_word() {
            Some(word) => {
                self.playback.play_around(word.start_secs);
                true
            }
            None => false,
        }
    }

    pub fn progress(&self) -> ReviewProgress {
        selectors::review_progress(&self.state.words)
    }

    pub fn gate(&self) -> ValidationGate {
        selectors::validation_gate(&self.state.words)
    }

    pub fn final_transcript(&self) -> String {
        selectors::rebuild_transcript(&self.transcript, &self.state.words)
    }

    pub fn corrections(&self) -> Vec<WordCorrection> {
        selectors::committed_corrections(&self.state.words)
    }

    fn dispatch(&mut self, action: ValidationAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reducer::reduce(state, action);
    }
}
