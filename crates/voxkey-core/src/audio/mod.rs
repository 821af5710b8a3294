pub(crate) mod accumulator;
pub(crate) mod capture;
pub(crate) mod engine;
pub(crate) mod level;
pub(crate) mod resampler;

pub use {
    accumulator::{CapturedAudio, RawAudioChunk, StreamingAccumulator},
    capture::{CapturePipeline, CpalCapture},
    engine::{Transcription, TranscriptionEngine, WhisperEngine},
    level::{LevelReading, compute_levels},
    resampler::{ResampledBuffer, TARGET_SAMPLE_RATE, resample_session},
};
