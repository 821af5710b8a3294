use std::time::Duration;

use serde::{Deserialize, Serialize};
use voxkey_core::SessionConfig;

/// Session thresholds, all configurable.
///
/// The staleness timeout in particular is a mitigation for release events
/// the OS never delivers; it is deliberately a tunable, not a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimingConfig {
    /// Holds shorter than this are cancelled instead of transcribed.
    #[serde(default = "default_min_hold_ms")]
    pub min_hold_ms: u64,
    /// An active session older than this is force-reset by the next press.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
    /// Bound on how long a pending transcription result is waited for.
    #[serde(default = "default_transcription_timeout_secs")]
    pub transcription_timeout_secs: u64,
    /// How long terminal states stay visible before the reset to idle.
    #[serde(default = "default_completion_hold_ms")]
    pub completion_hold_ms: u64,
    /// Upper bound on a single recording.
    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u64,
}

fn default_min_hold_ms() -> u64 {
    150
}

fn default_staleness_secs() -> u64 {
    10
}

fn default_transcription_timeout_secs() -> u64 {
    10
}

fn default_completion_hold_ms() -> u64 {
    1200
}

fn default_max_recording_secs() -> u64 {
    300
}

impl Default for SessionTimingConfig {
    fn default() -> Self {
        Self {
            min_hold_ms: default_min_hold_ms(),
            staleness_secs: default_staleness_secs(),
            transcription_timeout_secs: default_transcription_timeout_secs(),
            completion_hold_ms: default_completion_hold_ms(),
            max_recording_secs: default_max_recording_secs(),
        }
    }
}

impl SessionTimingConfig {
    /// Maps the TOML-facing values into the controller's config.
    pub fn to_session_config(&self, language: String) -> SessionConfig {
        SessionConfig {
            language,
            min_hold: Duration::from_millis(self.min_hold_ms),
            staleness_threshold: Duration::from_secs(self.staleness_secs),
            transcription_timeout: Duration::from_secs(self.transcription_timeout_secs),
            completion_hold: Duration::from_millis(self.completion_hold_ms),
            max_recording: Duration::from_secs(self.max_recording_secs),
        }
    }
}
