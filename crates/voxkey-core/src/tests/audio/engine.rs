use crate::{
    AudioError,
    audio::{ResampledBuffer, TARGET_SAMPLE_RATE, TranscriptionEngine, WhisperEngine},
};

use std::{path::PathBuf, time::Duration};

/// WHAT: WhisperEngine rejects non-existent model path
/// WHY: Early validation prevents runtime failures
#[test]
fn given_invalid_model_path_when_creating_engine_then_model_not_found_error() {
    // Given: Path to non-existent Whisper model
    let invalid_path = PathBuf::from("/nonexistent/model.bin");

    // When: Attempting to create WhisperEngine
    let result = WhisperEngine::new(&invalid_path, false);

    // Then: Returns ModelNotFound error
    assert!(matches!(result, Err(AudioError::ModelNotFound { .. })));
}

/// WHAT: Empty samples cause NoAudioCaptured error
/// WHY: Transcription should not run on empty audio
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn given_empty_samples_when_transcribing_then_no_audio_captured_error() {
    // Given: WhisperEngine with valid model
    let model_path = std::env::var("TEST_WHISPER_MODEL_PATH")
        .unwrap_or_else(|_| "models/ggml-base.en.bin".to_string());
    let mut engine = WhisperEngine::new(&model_path, false).unwrap();
    let empty = ResampledBuffer {
        samples: vec![],
        sample_rate: TARGET_SAMPLE_RATE,
        duration: Duration::ZERO,
    };

    // When: Attempting to transcribe empty samples
    let result = engine.transcribe(&empty, "en");

    // Then: Returns NoAudioCaptured error
    assert!(matches!(
        result,
        Err(AudioError::NoAudioCaptured { .. })
    ));
}

/// WHAT: Audio at the wrong rate is rejected before inference
/// WHY: The engine contract fixes the sample rate; feeding it native-rate
///      audio would transcribe garbage
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn given_wrong_sample_rate_when_transcribing_then_error() {
    // Given: WhisperEngine with valid model and 48kHz audio
    let model_path = std::env::var("TEST_WHISPER_MODEL_PATH")
        .unwrap_or_else(|_| "models/ggml-base.en.bin".to_string());
    let mut engine = WhisperEngine::new(&model_path, false).unwrap();
    let wrong_rate = ResampledBuffer {
        samples: vec![0.0; 48_000],
        sample_rate: 48_000,
        duration: Duration::from_secs(1),
    };

    // When: Attempting to transcribe
    let result = engine.transcribe(&wrong_rate, "en");

    // Then: Returns TranscriptionFailed before running inference
    assert!(matches!(
        result,
        Err(AudioError::TranscriptionFailed { .. })
    ));
}
