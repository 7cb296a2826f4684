use std::collections::HashMap;

use super::words::{FlaggedWord, ReviewProgress, ValidationGate, WordCorrection};
use crate::transcript::{display_speaker, DiarizedTranscript};

pub fn review_progress(words: &[FlaggedWord]) -> ReviewProgress {
    let total = words.len();
    let reviewed = words.iter().filter(|w| w.is_reviewed).count();
    let medical_total = words.iter().filter(|w| w.is_medical_term).count();
    let medical_reviewed = words
        .iter()
        .filter(|w| w.is_medical_term && w.is_reviewed)
        .count();
    let percentage = if total == 0 {
        100.0
    } else {
        reviewed as f64 * 100.0 / total as f64
    };

    ReviewProgress {
        total,
        reviewed,
        medical_total,
        medical_reviewed,
        percentage,
    }
}

/// The sole gate the surrounding workflow honors: review is satisfied iff
/// no clinically relevant word is still unreviewed.
pub fn validation_gate(words: &[FlaggedWord]) -> ValidationGate {
    let pending_medical = words.iter().filter(|w| w.is_pending_review()).count();
    ValidationGate {
        can_proceed: pending_medical == 0,
        pending_medical,
    }
}

/// Corrections committed by review: reviewed words whose replacement
/// differs from the transcribed original. Drafts stored via `Update`
/// alone are not committed.
pub fn committed_corrections(words: &[FlaggedWord]) -> Vec<WordCorrection> {
    words
        .iter()
        .filter_map(|w| match &w.corrected {
            Some(corrected) if w.is_reviewed && corrected != &w.word => Some(WordCorrection {
                id: w.id.clone(),
                original_word: w.word.clone(),
                corrected_word: corrected.clone(),
                speaker: w.speaker.clone(),
                timestamp_secs: w.start_secs,
            }),
            _ => None,
        })
        .collect()
}

/// Rebuild the final transcript text with committed corrections applied.
///
/// Walks segments in original order; a speaker label is inserted only at
/// speaker-turn boundaries, not once per segment.
pub fn rebuild_transcript(transcript: &DiarizedTranscript, words: &[FlaggedWord]) -> String {
    let corrections: HashMap<&str, &str> = words
        .iter()
        .filter_map(|w| match &w.corrected {
            Some(corrected) if w.is_reviewed && corrected != &w.word => {
                Some((w.id.as_str(), corrected.as_str()))
            }
            _ => None,
        })
        .collect();

    let mut out = String::new();
    let mut prev_speaker: Option<&str> = None;

    for (seg_idx, segment) in transcript.segments.iter().enumerate() {
        let text = match &segment.words {
            Some(segment_words) => segment_words
                .iter()
                .enumerate()
                .map(|(word_idx, word)| {
                    let id = format!("{}-{}", seg_idx, word_idx);
                    match corrections.get(id.as_str()) {
                        Some(corrected) => corrected.to_string(),
                        None => word.word.clone(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            None => segment.text.trim().to_string(),
        };

        if prev_speaker != Some(segment.speaker.as_str()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&display_speaker(&segment.speaker));
            out.push_str(": ");
            prev_speaker = Some(segment.speaker.as_str());
        } else if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&text);
    }

    out
}
