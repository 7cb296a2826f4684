use serde::{Deserialize, Serialize};

/// Diarized transcript returned by the transcription service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizedTranscript {
    /// Detected language tag (e.g. "es", "en").
    pub language: String,

    /// Number of distinct speakers detected.
    pub num_speakers: u32,

    /// Ordered transcript segments.
    pub segments: Vec<TranscriptSegment>,
}

/// One diarized span of speech attributed to a single speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start in seconds.
    pub start: f64,

    /// Segment end in seconds.
    pub end: f64,

    /// Raw segment text.
    pub text: String,

    /// Raw speaker label, `SPEAKER_<NN>`.
    pub speaker: String,

    /// Word-level detail when the service provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TranscriptWord>>,
}

/// A single transcribed word with its confidence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,

    /// Confidence that the transcription of this word is correct, in [0, 1].
    pub probability: f64,

    /// Word start in seconds, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// Word end in seconds, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Map a raw `SPEAKER_<NN>` label to its display form `Speaker <NN>`.
///
/// Labels that do not follow the service pattern pass through unchanged,
/// so the mapping stays reversible for correction matching.
pub fn display_speaker(raw: &str) -> String {
    match raw.strip_prefix("SPEAKER_") {
        Some(nn) => format!("Speaker {}", nn),
        None => raw.to_string(),
    }
}

/// Inverse of [`display_speaker`].
pub fn raw_speaker(display: &str) -> String {
    match display.strip_prefix("Speaker ") {
        Some(nn) => format!("SPEAKER_{}", nn),
        None => display.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_labels_round_trip() {
        assert_eq!(display_speaker("SPEAKER_00"), "Speaker 00");
        assert_eq!(display_speaker("SPEAKER_17"), "Speaker 17");
        assert_eq!(raw_speaker("Speaker 00"), "SPEAKER_00");
        assert_eq!(raw_speaker(&display_speaker("SPEAKER_03")), "SPEAKER_03");
    }

    #[test]
    fn unknown_speaker_labels_pass_through() {
        assert_eq!(display_speaker("narrator"), "narrator");
        assert_eq!(raw_speaker("narrator"), "narrator");
    }

    #[test]
    fn transcript_deserializes_from_service_shape() {
        let raw = r#"{
            "language": "es",
            "num_speakers": 2,
            "segments": [
                {
                    "start": 0.0,
                    "end": 2.4,
                    "text": "buenos dias",
                    "speaker": "SPEAKER_00",
                    "words": [
                        {"word": "buenos", "probability": 0.98, "start": 0.0, "end": 0.9},
                        {"word": "dias", "probability": 0.42, "start": 1.0, "end": 1.6}
                    ]
                },
                {"start": 2.5, "end": 3.1, "text": "hola", "speaker": "SPEAKER_01"}
            ]
        }"#;

        let transcript: DiarizedTranscript = serde_json::from_str(raw).unwrap();
        assert_eq!(transcript.num_speakers, 2);
        assert_eq!(transcript.segments.len(), 2);
        let words = transcript.segments[0].words.as_ref().unwrap();
        assert_eq!(words.len(), 2);
        assert!(words[1].probability < 0.7);
        assert!(transcript.segments[1].words.is_none());
    }
}
