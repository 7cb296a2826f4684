pub mod backend;
pub mod buffer;
pub mod file;
pub mod microphone;
pub mod playback;

pub use backend::{
    AudioBackend, AudioBackendFactory, AudioFrame, AudioSource, CaptureConfig, CaptureState,
};
pub use buffer::{AudioArtifact, SessionBuffer};
pub use file::FileBackend;
pub use microphone::MicrophoneBackend;
pub use playback::{AudioPlayback, CursorState, PlaybackCursor, WindowedPlayback};
