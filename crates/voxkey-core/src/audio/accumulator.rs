use crate::{AudioError, CoreResult};

use std::{
    panic::Location,
    sync::Mutex,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tracing::{debug, error, warn};

/// Maximum samples the accumulator will hold (5 minutes of stereo 48kHz).
///
/// **Memory footprint at max capacity:**
/// - 48,000 Hz * 2 channels * 300s * 4 bytes/f32 = ~115MB
/// - This is a hard upper bound; push-to-talk recordings are far shorter
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 2 * 300;

/// One batch of frames handed off from the capture pump.
///
/// Produced at the hardware's native rate; consumed by the
/// [`StreamingAccumulator`] for the lifetime of one session, then discarded.
#[derive(Debug, Clone)]
pub struct RawAudioChunk {
    /// Interleaved samples as delivered by the input stream.
    pub samples: Vec<f32>,
    /// Sample rate the hardware delivered these frames at.
    pub native_sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// When the pump pulled these frames off the ring.
    pub captured_at: Instant,
}

/// The full recording of one session, moved out of the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    /// Interleaved samples at the native rate.
    pub samples: Vec<f32>,
    /// Sample rate of `samples`.
    pub native_sample_rate: u32,
    /// Interleaved channel count of `samples`.
    pub channels: u16,
}

impl CapturedAudio {
    /// Wall-clock duration of the recording.
    pub fn duration(&self) -> Duration {
        if self.native_sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.native_sample_rate))
    }
}

struct AccumulatorInner {
    samples: Vec<f32>,
    native_sample_rate: Option<u32>,
    channels: Option<u16>,
    dropped: usize,
}

/// Thread-safe container for the frames of one recording session.
///
/// The capture pump appends; the session controller drains. The buffer is
/// non-empty only while a session is recording and is moved out exactly
/// once per session via [`StreamingAccumulator::drain`]. The mutex is held
/// only for the duration of a single append or drain.
pub struct StreamingAccumulator {
    inner: Mutex<AccumulatorInner>,
    max_samples: usize,
}

impl StreamingAccumulator {
    /// Creates an accumulator bounded by [`MAX_BUFFER_SAMPLES`].
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFER_SAMPLES)
    }

    /// Creates an accumulator with an explicit sample limit.
    pub fn with_limit(max_samples: usize) -> Self {
        Self {
            inner: Mutex::new(AccumulatorInner {
                samples: Vec::new(),
                native_sample_rate: None,
                channels: None,
                dropped: 0,
            }),
            max_samples,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AccumulatorInner> {
        // Recover from lock poison rather than silently dropping audio.
        // A poisoned mutex means a previous holder panicked, but the
        // buffer data is still valid and usable.
        self.inner.lock().unwrap_or_else(|e| {
            error!("Accumulator lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    /// Appends one chunk, recording the stream format from the first chunk.
    ///
    /// Chunks whose format disagrees with the session's first chunk are
    /// dropped and counted. Samples beyond the capacity limit are dropped
    /// (newest lost) so the earliest speech is preserved.
    pub fn append(&self, chunk: RawAudioChunk) {
        let mut inner = self.lock();

        match (inner.native_sample_rate, inner.channels) {
            (None, None) => {
                inner.native_sample_rate = Some(chunk.native_sample_rate);
                inner.channels = Some(chunk.channels);
            }
            (rate, channels) => {
                if rate != Some(chunk.native_sample_rate) || channels != Some(chunk.channels) {
                    inner.dropped += chunk.samples.len();
                    warn!(
                        chunk_rate = chunk.native_sample_rate,
                        chunk_channels = chunk.channels,
                        "Dropped chunk with mismatched stream format"
                    );
                    return;
                }
            }
        }

        let room = self.max_samples.saturating_sub(inner.samples.len());
        if chunk.samples.len() > room {
            inner.dropped += chunk.samples.len() - room;
            warn!(
                dropped = chunk.samples.len() - room,
                total_dropped = inner.dropped,
                "Accumulator full, dropping newest samples"
            );
        }
        let take = room.min(chunk.samples.len());
        inner.samples.extend_from_slice(&chunk.samples[..take]);
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    /// Returns true when no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the session's audio out, leaving the accumulator empty.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::NoAudioCaptured`] when nothing was buffered.
    #[track_caller]
    pub fn drain(&self) -> CoreResult<CapturedAudio> {
        let mut inner = self.lock();

        let samples = std::mem::take(&mut inner.samples);
        let native_sample_rate = inner.native_sample_rate.take();
        let channels = inner.channels.take();
        let dropped = std::mem::take(&mut inner.dropped);
        drop(inner);

        if dropped > 0 {
            warn!(dropped, "Session lost samples to accumulator bounds");
        }

        match (native_sample_rate, channels) {
            (Some(rate), Some(ch)) if !samples.is_empty() => {
                debug!(
                    sample_count = samples.len(),
                    native_sample_rate = rate,
                    channels = ch,
                    "Accumulator drained"
                );
                Ok(CapturedAudio {
                    samples,
                    native_sample_rate: rate,
                    channels: ch,
                })
            }
            _ => Err(AudioError::NoAudioCaptured {
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Discards any buffered audio and format metadata.
    ///
    /// Called on every session boundary so no audio survives its session.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.samples.clear();
        inner.native_sample_rate = None;
        inner.channels = None;
        inner.dropped = 0;
    }
}

impl Default for StreamingAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
