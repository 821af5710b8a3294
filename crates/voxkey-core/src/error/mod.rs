use error_location::ErrorLocation;
use thiserror::Error;

/// Audio capture, conversion and transcription errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("No microphone found {location}")]
    NoMicrophoneFound {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Whisper model file not found at specified path.
    #[error("Model not found at path: {path:?} {location}")]
    ModelNotFound {
        /// Path to the missing model file.
        path: std::path::PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transcription process failed.
    #[error("Transcription failed: {source} {location}")]
    TranscriptionFailed {
        /// Underlying error from whisper-rs.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio data captured or provided.
    #[error("No audio captured {location}")]
    NoAudioCaptured {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device operation failed.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;

/// Session-level errors produced by the controller and its collaborators.
///
/// Errors in this enum terminate a single session (`Failed` state, then
/// reset to `Idle`); they never outlive the session that raised them.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Audio subsystem error (capture, conversion or transcription).
    #[error("Audio error: {source} {location}")]
    Audio {
        /// The underlying audio error.
        #[source]
        source: AudioError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Text insertion failed outright (clipboard unavailable).
    #[error("Insertion failed: {reason} {location}")]
    InsertionFailed {
        /// Description of the insertion failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transcription did not resolve within the configured bound.
    #[error("Transcription timed out after {waited_ms}ms {location}")]
    TranscriptionTimeout {
        /// How long the controller waited before abandoning the result.
        waited_ms: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

// Manual From<AudioError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<AudioError> for SessionError {
    #[track_caller]
    fn from(source: AudioError) -> Self {
        SessionError::Audio {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`SessionError`].
pub type SessionResult<T> = std::result::Result<T, SessionError>;
