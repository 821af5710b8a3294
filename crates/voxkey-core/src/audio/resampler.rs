use crate::{AudioError, CoreResult, audio::CapturedAudio};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, info};

/// Sample rate the transcription engine requires.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// One session's audio, converted to the engine's fixed rate.
///
/// Produced once per session by [`resample_session`]; consumed once by the
/// transcription engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledBuffer {
    /// Mono samples at `sample_rate`.
    pub samples: Vec<f32>,
    /// Fixed target rate ([`TARGET_SAMPLE_RATE`]).
    pub sample_rate: u32,
    /// Duration of the converted audio.
    pub duration: Duration,
}

/// Converts one session's accumulated audio to mono at the target rate.
///
/// The whole buffer is converted in a single stateless pass at session end.
/// Stream-oriented converters carry internal state across calls, and feeding
/// them small irregular callback buffers silently truncates the signal at
/// every chunk boundary; converting the concatenated buffer once avoids that
/// entire defect class. Output length is exactly
/// `round(input_frames * target_rate / native_rate)`.
///
/// # Errors
///
/// Returns [`AudioError::ResamplingError`] for a zero sample rate or channel
/// count, and [`AudioError::NoAudioCaptured`] for an empty buffer.
#[track_caller]
pub fn resample_session(audio: CapturedAudio, target_rate: u32) -> CoreResult<ResampledBuffer> {
    if audio.samples.is_empty() {
        return Err(AudioError::NoAudioCaptured {
            location: ErrorLocation::from(Location::caller()),
        });
    }
    if audio.native_sample_rate == 0 || target_rate == 0 {
        return Err(AudioError::ResamplingError {
            reason: format!(
                "invalid sample rate: native {} -> target {}",
                audio.native_sample_rate, target_rate
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    if audio.channels == 0 {
        return Err(AudioError::ResamplingError {
            reason: "zero channel count".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mono = downmix(&audio.samples, audio.channels);
    let native_rate = audio.native_sample_rate;

    let samples = if native_rate == target_rate {
        mono
    } else {
        let output_len = scaled_len(mono.len(), native_rate, target_rate);
        let resampled = interpolate(&mono, output_len, native_rate, target_rate);
        info!(
            native_rate,
            target_rate,
            input_samples = mono.len(),
            output_samples = resampled.len(),
            "Whole-buffer resample complete"
        );
        resampled
    };

    let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(target_rate));

    Ok(ResampledBuffer {
        samples,
        sample_rate: target_rate,
        duration,
    })
}

/// Mixes interleaved frames down to mono by averaging channels.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| f64::from(s)).sum();
            (sum / frame.len() as f64) as f32
        })
        .collect();

    debug!(
        channels,
        frames = mono.len(),
        "Downmixed interleaved audio to mono"
    );
    mono
}

/// Output length of a whole-buffer conversion: `round(n * target / native)`.
fn scaled_len(input_len: usize, native_rate: u32, target_rate: u32) -> usize {
    let scaled = input_len as u64 * u64::from(target_rate);
    let native = u64::from(native_rate);
    ((scaled + native / 2) / native) as usize
}

/// Linear-interpolation resample of the entire mono buffer in one pass.
fn interpolate(mono: &[f32], output_len: usize, native_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = f64::from(native_rate) / f64::from(target_rate);
    let last = mono.len() - 1;

    let mut resampled = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_floor = (src_pos.floor() as usize).min(last);
        let src_ceil = (src_floor + 1).min(last);
        let fract = (src_pos - src_pos.floor()) as f32;

        let s1 = mono[src_floor];
        let s2 = mono[src_ceil];
        resampled.push(s1 + (s2 - s1) * fract);
    }
    resampled
}
