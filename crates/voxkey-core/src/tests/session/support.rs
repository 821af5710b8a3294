//! Hand-rolled fakes for exercising the session controller without audio
//! hardware, a Whisper model or a desktop clipboard.

use crate::{
    AudioError, CoreResult, SessionError, SessionResult,
    audio::{
        CapturePipeline, LevelReading, RawAudioChunk, ResampledBuffer, StreamingAccumulator,
        Transcription, TranscriptionEngine,
    },
    session::{InsertionOutcome, SessionState, TextInserter},
};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::sync::watch;

/// Capture fake that deposits a scripted recording into the sink on start.
pub(crate) struct FakeCapture {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    deposit_samples: usize,
    deposit_rate: u32,
    deposit_channels: u16,
    fail_start: bool,
    level_tx: watch::Sender<LevelReading>,
    level_rx: watch::Receiver<LevelReading>,
}

impl FakeCapture {
    pub(crate) fn with_deposit(samples: usize, rate: u32, channels: u16) -> Self {
        let (level_tx, level_rx) = watch::channel(LevelReading::default());
        Self {
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
            deposit_samples: samples,
            deposit_rate: rate,
            deposit_channels: channels,
            fail_start: false,
            level_tx,
            level_rx,
        }
    }

    pub(crate) fn new() -> Self {
        Self::with_deposit(16_000, 16_000, 1)
    }

    pub(crate) fn failing() -> Self {
        let mut capture = Self::new();
        capture.fail_start = true;
        capture
    }

    pub(crate) fn starts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.starts)
    }

    pub(crate) fn stops(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stops)
    }
}

impl CapturePipeline for FakeCapture {
    fn start(&mut self, sink: Arc<StreamingAccumulator>) -> CoreResult<()> {
        if self.fail_start {
            return Err(AudioError::DeviceError {
                reason: "scripted device failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.starts.fetch_add(1, Ordering::SeqCst);
        self.level_tx.send_replace(LevelReading {
            rms: 0.1,
            peak: 0.2,
        });
        sink.append(RawAudioChunk {
            samples: vec![0.01; self.deposit_samples],
            native_sample_rate: self.deposit_rate,
            channels: self.deposit_channels,
            captured_at: Instant::now(),
        });
        Ok(())
    }

    fn stop(&mut self) -> CoreResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn level_receiver(&self) -> watch::Receiver<LevelReading> {
        self.level_rx.clone()
    }
}

/// Engine fake that replays a script of (text, delay) responses.
pub(crate) struct FakeEngine {
    script: Mutex<VecDeque<(String, Duration)>>,
    calls: Arc<Mutex<Vec<usize>>>,
    fail: bool,
}

impl FakeEngine {
    pub(crate) fn scripted(script: Vec<(&str, Duration)>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|(text, delay)| (text.to_string(), delay))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub(crate) fn instant(text: &str) -> Self {
        Self::scripted(vec![(text, Duration::ZERO)])
    }

    pub(crate) fn failing() -> Self {
        let mut engine = Self::scripted(vec![]);
        engine.fail = true;
        engine
    }

    /// Sample counts each call received.
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.calls)
    }
}

impl TranscriptionEngine for FakeEngine {
    fn transcribe(&mut self, audio: &ResampledBuffer, _language: &str) -> CoreResult<Transcription> {
        self.calls.lock().unwrap().push(audio.samples.len());

        if self.fail {
            return Err(AudioError::TranscriptionFailed {
                source: "scripted inference failure".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (text, delay) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(("fake transcript".to_string(), Duration::ZERO));
        std::thread::sleep(delay);

        Ok(Transcription {
            text,
            confidence: 0.9,
            elapsed: delay,
        })
    }
}

/// Inserter fake recording every delivered transcript.
pub(crate) struct FakeInserter {
    delivered: Arc<Mutex<Vec<String>>>,
    outcome: InsertionOutcome,
    fail: bool,
}

impl FakeInserter {
    pub(crate) fn direct() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            outcome: InsertionOutcome::InsertedDirectly,
            fail: false,
        }
    }

    pub(crate) fn clipboard_only() -> Self {
        let mut inserter = Self::direct();
        inserter.outcome = InsertionOutcome::CopiedToClipboard;
        inserter
    }

    pub(crate) fn failing() -> Self {
        let mut inserter = Self::direct();
        inserter.fail = true;
        inserter
    }

    pub(crate) fn delivered(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.delivered)
    }
}

#[async_trait]
impl TextInserter for FakeInserter {
    async fn insert(&mut self, text: &str) -> SessionResult<InsertionOutcome> {
        if self.fail {
            return Err(SessionError::InsertionFailed {
                reason: "scripted insertion failure".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.delivered.lock().unwrap().push(text.to_string());
        Ok(self.outcome)
    }
}

/// Polls the status feed until `pred` matches or the timeout elapses.
pub(crate) async fn wait_for_state(
    rx: &mut watch::Receiver<SessionState>,
    timeout: Duration,
    pred: impl Fn(&SessionState) -> bool,
) -> bool {
    tokio::time::timeout(timeout, async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return true;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    })
    .await
    .unwrap_or(false)
}
