use crate::{
    AudioError, CoreResult,
    audio::{ResampledBuffer, TARGET_SAMPLE_RATE},
};

use std::{panic::Location, path::Path, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// The output of one successful transcription run.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Full transcript text, trimmed.
    pub text: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f32,
    /// Wall-clock inference time.
    pub elapsed: Duration,
}

/// Speech-to-text engine, as seen by the session controller.
///
/// Invoked at most once per session, from the controller's completion
/// pipeline only, with audio already converted to the engine's fixed rate.
pub trait TranscriptionEngine: Send {
    /// Transcribes one session's resampled audio.
    ///
    /// # Errors
    ///
    /// Returns an error when the audio is empty, at the wrong rate, or the
    /// inference pass fails.
    fn transcribe(&mut self, audio: &ResampledBuffer, language: &str) -> CoreResult<Transcription>;
}

/// Whisper-backed implementation of [`TranscriptionEngine`].
pub struct WhisperEngine {
    ctx: WhisperContext,
}

impl WhisperEngine {
    /// Loads the Whisper model at `model_path`.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::ModelNotFound`] when the file is missing and
    /// [`AudioError::TranscriptionFailed`] when the context fails to load.
    #[track_caller]
    #[instrument(skip(model_path))]
    pub fn new<P: AsRef<Path>>(model_path: P, use_gpu: bool) -> CoreResult<Self> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(AudioError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);

        let ctx = WhisperContext::new_with_params(
            path.to_str().ok_or(AudioError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            })?,
            ctx_params,
        )
        .map_err(|e| AudioError::TranscriptionFailed {
            source: Box::new(e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(model_path = ?path, use_gpu, "Whisper model loaded");

        Ok(Self { ctx })
    }
}

impl TranscriptionEngine for WhisperEngine {
    #[instrument(skip(self, audio))]
    fn transcribe(&mut self, audio: &ResampledBuffer, language: &str) -> CoreResult<Transcription> {
        if audio.samples.is_empty() {
            return Err(AudioError::NoAudioCaptured {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if audio.sample_rate != TARGET_SAMPLE_RATE {
            return Err(AudioError::TranscriptionFailed {
                source: format!(
                    "engine requires {}Hz audio, got {}Hz",
                    TARGET_SAMPLE_RATE, audio.sample_rate
                )
                .into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let start = std::time::Instant::now();

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_suppress_nst(true);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| AudioError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        state
            .full(params, &audio.samples)
            .map_err(|e| AudioError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let num_segments = state.full_n_segments();

        // Pre-allocate result string to avoid repeated reallocations.
        // Average English speech is ~150 words/min, ~5 chars/word.
        // Conservative estimate: 256 bytes per segment covers most cases
        // with a single allocation.
        let mut result = String::with_capacity(num_segments as usize * 256);

        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| AudioError::TranscriptionFailed {
                    source: format!("Failed to get segment {}", i).into(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            result.push_str(&segment.to_string());
            result.push(' ');
        }

        let text = result.trim().to_string();
        let elapsed = start.elapsed();

        // The wrapper exposes no token posteriors, so confidence reduces to
        // whether the decoder produced any text at all.
        let confidence = if text.is_empty() { 0.0 } else { 1.0 };

        debug!(
            sample_count = audio.samples.len(),
            segment_count = num_segments,
            text_len = text.len(),
            elapsed_ms = elapsed.as_millis(),
            "Transcription complete"
        );

        Ok(Transcription {
            text,
            confidence,
            elapsed,
        })
    }
}
