pub mod reducer;
pub mod selectors;
pub mod session;
pub mod words;

pub use reducer::{derive_flagged_words, initial_state, reduce, ValidationAction, ValidationState};
pub use selectors::{committed_corrections, rebuild_transcript, review_progress, validation_gate};
pub use session::ValidationSession;
pub use words::{FlaggedWord, ReviewProgress, ValidationGate, WordCorrection};
