use std::collections::HashMap;

use super::words::FlaggedWord;
use crate::services::TermClassification;
use crate::transcript::DiarizedTranscript;

/// Review-queue state, advanced exclusively through [`reduce`].
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    /// Flagged words in timestamp order.
    pub words: Vec<FlaggedWord>,

    /// Id of the word currently holding UI focus.
    pub selected: Option<String>,

    /// True from derivation until the classification round settles.
    pub classification_pending: bool,
}

/// Review actions.
#[derive(Debug, Clone)]
pub enum ValidationAction {
    /// Classifier verdicts arrived.
    ClassificationResolved(Vec<TermClassification>),

    /// Classifier call failed; fail open so review cannot deadlock.
    ClassificationFailed,

    /// Mark reviewed and accepted, optionally committing a correction.
    Accept {
        id: String,
        correction: Option<String>,
    },

    /// Mark reviewed and accepted as transcribed.
    Skip { id: String },

    /// Store a draft correction without committing the review.
    Update { id: String, correction: String },

    /// Escape hatch: mark everything reviewed and accepted.
    AcceptAll,

    /// Explicit navigation.
    Select(Option<String>),
}

/// Emit one flagged word per transcript word below the warning threshold,
/// sorted by timestamp ascending.
pub fn derive_flagged_words(
    transcript: &DiarizedTranscript,
    warning_threshold: f64,
) -> Vec<FlaggedWord> {
    let mut flagged = Vec::new();

    for (seg_idx, segment) in transcript.segments.iter().enumerate() {
        let Some(words) = &segment.words else {
            continue;
        };
        for (word_idx, word) in words.iter().enumerate() {
            if word.probability < warning_threshold {
                flagged.push(FlaggedWord {
                    id: format!("{}-{}", seg_idx, word_idx),
                    word: word.word.clone(),
                    corrected: None,
                    probability: word.probability,
                    start_secs: word.start.unwrap_or(segment.start),
                    end_secs: word.end.unwrap_or(segment.end),
                    speaker: segment.speaker.clone(),
                    is_medical_term: false,
                    category: None,
                    is_reviewed: false,
                    is_accepted: false,
                });
            }
        }
    }

    // Stable sort keeps derivation order deterministic for equal timestamps.
    flagged.sort_by(|a, b| {
        a.start_secs
            .partial_cmp(&b.start_secs)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    flagged
}

pub fn initial_state(transcript: &DiarizedTranscript, warning_threshold: f64) -> ValidationState {
    let words = derive_flagged_words(transcript, warning_threshold);
    ValidationState {
        classification_pending: !words.is_empty(),
        words,
        selected: None,
    }
}

/// Pure state transition: `(state, action) -> state`.
pub fn reduce(mut state: ValidationState, action: ValidationAction) -> ValidationState {
    match action {
        ValidationAction::ClassificationResolved(classifications) => {
            let verdicts: HashMap<String, &TermClassification> = classifications
                .iter()
                .map(|c| (c.word.to_lowercase(), c))
                .collect();

            for word in &mut state.words {
                match verdicts.get(&word.word.to_lowercase()) {
                    Some(verdict) if verdict.is_medical => {
                        word.is_medical_term = true;
                        word.category = verdict.category;
                    }
                    // Missing from the response or non-medical: accept
                    // immediately, these never enter the human queue.
                    _ => {
                        word.is_reviewed = true;
                        word.is_accepted = true;
                    }
                }
            }

            state.classification_pending = false;
            state.selected = first_pending(&state.words).map(|w| w.id.clone());
        }

        ValidationAction::ClassificationFailed => {
            for word in &mut state.words {
                word.is_reviewed = true;
                word.is_accepted = true;
            }
            state.classification_pending = false;
            state.selected = None;
        }

        ValidationAction::Accept { id, correction } => {
            return commit_review(state, &id, correction);
        }

        ValidationAction::Skip { id } => {
            return commit_review(state, &id, None);
        }

        ValidationAction::Update { id, correction } => {
            if let Some(word) = state.words.iter_mut().find(|w| w.id == id) {
                word.corrected = Some(correction);
            }
        }

        ValidationAction::AcceptAll => {
            for word in &mut state.words {
                word.is_reviewed = true;
                word.is_accepted = true;
            }
            state.selected = None;
        }

        ValidationAction::Select(id) => {
            state.selected = id.filter(|id| state.words.iter().any(|w| &w.id == id));
        }
    }

    state
}

fn commit_review(
    mut state: ValidationState,
    id: &str,
    correction: Option<String>,
) -> ValidationState {
    let Some(idx) = state.words.iter().position(|w| w.id == id) else {
        return state;
    };

    {
        let word = &mut state.words[idx];
        let unchanged_correction =
            correction.is_none() || correction.as_deref() == word.corrected.as_deref();
        if word.is_reviewed && word.is_accepted && unchanged_correction {
            // Repeat of a settled review; leave state untouched.
            return state;
        }

        word.is_reviewed = true;
        word.is_accepted = true;
        if let Some(correction) = correction {
            word.corrected = Some(correction);
        }
    }

    state.selected = next_pending_after(&state.words, idx).map(|w| w.id.clone());
    state
}

fn first_pending(words: &[FlaggedWord]) -> Option<&FlaggedWord> {
    words.iter().find(|w| w.is_pending_review())
}

/// Next unreviewed medical word after `idx` in timestamp order, wrapping
/// to search from the start.
fn next_pending_after(words: &[FlaggedWord], idx: usize) -> Option<&FlaggedWord> {
    words[idx + 1..]
        .iter()
        .chain(words[..=idx].iter())
        .find(|w| w.is_pending_review())
}
