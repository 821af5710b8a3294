//! Voxkey Core Library
//!
//! Push-to-talk session machinery: native-rate audio capture through CPAL,
//! a race-free recording-session state machine, whole-buffer resampling and
//! a Whisper transcription adapter.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use tokio::sync::{mpsc, watch};
//! use voxkey_core::{
//!     CpalCapture, SessionConfig, SessionController, SessionEvent, WhisperEngine,
//! };
//! # use voxkey_core::{InsertionOutcome, SessionResult, TextInserter};
//! # struct NullInserter;
//! # #[async_trait::async_trait]
//! # impl TextInserter for NullInserter {
//! #     async fn insert(&mut self, _text: &str) -> SessionResult<InsertionOutcome> {
//! #         Ok(InsertionOutcome::CopiedToClipboard)
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let capture = CpalCapture::new(None)?;
//!     let engine = WhisperEngine::new(PathBuf::from("models/ggml-base.en.bin"), true)?;
//!     let controller =
//!         SessionController::new(capture, engine, NullInserter, SessionConfig::default());
//!
//!     let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(32);
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     # drop(events_tx);
//!     controller.run(events_rx, shutdown_rx).await;
//!     Ok(())
//! }
//! ```

mod audio;
mod error;
mod session;

pub use {
    audio::{
        CapturePipeline, CapturedAudio, CpalCapture, LevelReading, RawAudioChunk, ResampledBuffer,
        StreamingAccumulator, TARGET_SAMPLE_RATE, Transcription, TranscriptionEngine,
        WhisperEngine, compute_levels, resample_session,
    },
    error::{
        AudioError, Result as CoreResult, SessionError, SessionResult,
    },
    session::{
        HotkeyEvent, HotkeyEventKind, InsertionOutcome, SessionConfig, SessionController,
        SessionEvent, SessionGuard, SessionState, TextInserter,
    },
};

#[cfg(test)]
mod tests;
