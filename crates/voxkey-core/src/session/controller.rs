use crate::{
    SessionError,
    audio::{
        CapturePipeline, LevelReading, ResampledBuffer, StreamingAccumulator, TARGET_SAMPLE_RATE,
        TranscriptionEngine, resample_session,
    },
    session::{
        HotkeyEvent, HotkeyEventKind, InsertionOutcome, SessionEvent, SessionGuard, SessionState,
        TextInserter,
    },
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Worst-case sample throughput used to bound the accumulator
/// (stereo input at 48kHz).
const WORST_CASE_SAMPLES_PER_SEC: usize = 48_000 * 2;

/// Session thresholds, immutable for the controller's lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Language tag handed to the transcription engine.
    pub language: String,
    /// Holds shorter than this are cancelled instead of transcribed.
    pub min_hold: Duration,
    /// An active session older than this is assumed abandoned (lost
    /// release event) and force-reset by the next press.
    pub staleness_threshold: Duration,
    /// Bound on how long a pending transcription result is waited for.
    pub transcription_timeout: Duration,
    /// How long terminal states stay visible before the reset to idle.
    pub completion_hold: Duration,
    /// Upper bound on a single recording, used to size the accumulator.
    pub max_recording: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            min_hold: Duration::from_millis(150),
            staleness_threshold: Duration::from_secs(10),
            transcription_timeout: Duration::from_secs(10),
            completion_hold: Duration::from_millis(1200),
            max_recording: Duration::from_secs(300),
        }
    }
}

/// Guard cell plus the observer feed, shared with spawned continuations.
struct ControllerShared {
    guard: Mutex<SessionGuard>,
    status_tx: watch::Sender<SessionState>,
}

impl ControllerShared {
    fn apply(&self, guard: &mut SessionGuard, next: SessionState) {
        debug!(
            from = guard.state().label(),
            to = next.label(),
            generation = guard.generation(),
            "Session transition"
        );
        self.status_tx.send_replace(next.clone());
        guard.transition(next);
    }
}

/// The single authoritative owner of recording-session state.
///
/// Serializes press/release/cancel signals from all sources into one
/// logical timeline. Collaborators are injected: the capture pipeline is
/// owned outright, while the engine and inserter are shared with the
/// completion pipeline the controller spawns per session. Every spawned
/// continuation snapshots the guard's generation and re-validates it
/// before mutating shared state, so a cancelled or superseded session can
/// never corrupt its successor.
pub struct SessionController<C, E, I> {
    capture: C,
    engine: Arc<Mutex<E>>,
    inserter: Arc<Mutex<I>>,
    accumulator: Arc<StreamingAccumulator>,
    shared: Arc<ControllerShared>,
    level_rx: watch::Receiver<LevelReading>,
    config: SessionConfig,
    session_id: Uuid,
}

impl<C, E, I> SessionController<C, E, I>
where
    C: CapturePipeline,
    E: TranscriptionEngine + 'static,
    I: TextInserter + 'static,
{
    /// Builds a controller around its injected collaborators.
    pub fn new(capture: C, engine: E, inserter: I, config: SessionConfig) -> Self {
        let (status_tx, _) = watch::channel(SessionState::Idle);
        let level_rx = capture.level_receiver();
        let max_samples =
            WORST_CASE_SAMPLES_PER_SEC * (config.max_recording.as_secs() as usize).max(1);

        Self {
            capture,
            engine: Arc::new(Mutex::new(engine)),
            inserter: Arc::new(Mutex::new(inserter)),
            accumulator: Arc::new(StreamingAccumulator::with_limit(max_samples)),
            shared: Arc::new(ControllerShared {
                guard: Mutex::new(SessionGuard::new()),
                status_tx,
            }),
            level_rx,
            config,
            session_id: Uuid::new_v4(),
        }
    }

    /// Observable session state for presentation layers.
    pub fn status_receiver(&self) -> watch::Receiver<SessionState> {
        self.shared.status_tx.subscribe()
    }

    /// Live input level feed, forwarded from the capture pipeline.
    pub fn level_receiver(&self) -> watch::Receiver<LevelReading> {
        self.level_rx.clone()
    }

    /// Consumes the serialized inbox until shutdown.
    ///
    /// Events are processed in strict arrival order regardless of which
    /// thread produced them; the inbox is the only way signals reach the
    /// state machine.
    #[instrument(skip(self, events_rx, shutdown_rx))]
    pub async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<SessionEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Session controller running");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Session controller shutting down");
                    break;
                }
                event = events_rx.recv() => match event {
                    Some(SessionEvent::Hotkey(ev)) => match ev.kind {
                        HotkeyEventKind::Pressed => self.on_press(ev).await,
                        HotkeyEventKind::Released => self.on_release(ev).await,
                    },
                    Some(SessionEvent::Cancel) => self.cancel().await,
                    None => {
                        info!("Event inbox closed, stopping controller");
                        break;
                    }
                },
            }
        }

        self.cancel().await;
    }

    /// Starts a new session unless one is already in flight.
    ///
    /// Presses while a session is active are debounced, except when the
    /// session has gone stale (lost release event), in which case the
    /// controller force-resets and treats the press as a fresh session.
    /// Presses in terminal states always start a new session: debounce
    /// applies only to overlapping presses.
    #[instrument(skip(self, event))]
    pub async fn on_press(&mut self, event: HotkeyEvent) {
        let shared = Arc::clone(&self.shared);
        let mut guard = shared.guard.lock().await;

        if guard.state().is_active() {
            let idle_for = guard.last_transition_at().elapsed();
            if idle_for < self.config.staleness_threshold {
                debug!(
                    state = guard.state().label(),
                    generation = guard.generation(),
                    "Press ignored while session active"
                );
                return;
            }
            warn!(
                state = guard.state().label(),
                stale_ms = idle_for.as_millis(),
                "Active session went stale, forcing reset"
            );
            self.force_reset(&mut guard);
        }

        self.session_id = Uuid::new_v4();
        let generation = guard.bump_generation();
        self.accumulator.clear();

        // Capture failure must not leave a partial session behind: the
        // state never reaches Recording unless the stream is live.
        if let Err(e) = self.capture.start(Arc::clone(&self.accumulator)) {
            error!(session_id = %self.session_id, error = ?e, "Failed to start capture");
            self.shared.apply(
                &mut guard,
                SessionState::Failed {
                    reason: e.to_string(),
                },
            );
            schedule_reset(
                Arc::clone(&self.shared),
                generation,
                self.config.completion_hold,
            );
            return;
        }

        self.shared.apply(
            &mut guard,
            SessionState::Recording {
                started_at: event.source_timestamp,
            },
        );
        info!(session_id = %self.session_id, generation, "Recording started");
    }

    /// Ends capture and hands the session to the completion pipeline.
    ///
    /// A release outside `Recording` is a protocol event: logged, ignored.
    #[instrument(skip(self, event))]
    pub async fn on_release(&mut self, event: HotkeyEvent) {
        let shared = Arc::clone(&self.shared);
        let mut guard = shared.guard.lock().await;

        let started_at = match guard.state() {
            SessionState::Recording { started_at } => *started_at,
            state => {
                debug!(state = state.label(), "Release ignored outside recording");
                return;
            }
        };

        if let Err(e) = self.capture.stop() {
            warn!(session_id = %self.session_id, error = ?e, "Failed to stop capture");
        }

        // Both ends of the measurement are source timestamps, which removes
        // scheduler jitter between the physical key action and this handler.
        let held = event
            .source_timestamp
            .saturating_duration_since(started_at);

        if held < self.config.min_hold {
            info!(
                session_id = %self.session_id,
                held_ms = held.as_millis(),
                "Hold below minimum, session cancelled"
            );
            self.accumulator.clear();
            self.shared.apply(&mut guard, SessionState::Cancelled);
            self.shared.apply(&mut guard, SessionState::Idle);
            return;
        }

        let generation = guard.generation();
        self.shared.apply(
            &mut guard,
            SessionState::Transcribing {
                started_at,
                ended_at: event.source_timestamp,
            },
        );

        let prepared = self
            .accumulator
            .drain()
            .and_then(|audio| resample_session(audio, TARGET_SAMPLE_RATE));
        let buffer = match prepared {
            Ok(buffer) => buffer,
            Err(e) => {
                error!(session_id = %self.session_id, error = ?e, "Failed to prepare session audio");
                self.shared.apply(
                    &mut guard,
                    SessionState::Failed {
                        reason: e.to_string(),
                    },
                );
                schedule_reset(
                    Arc::clone(&self.shared),
                    generation,
                    self.config.completion_hold,
                );
                return;
            }
        };

        info!(
            session_id = %self.session_id,
            generation,
            held_ms = held.as_millis(),
            resampled_samples = buffer.samples.len(),
            "Transcription dispatched"
        );

        let task = PipelineTask {
            shared: Arc::clone(&self.shared),
            engine: Arc::clone(&self.engine),
            inserter: Arc::clone(&self.inserter),
            language: self.config.language.clone(),
            transcription_timeout: self.config.transcription_timeout,
            completion_hold: self.config.completion_hold,
            generation,
            session_id: self.session_id,
        };
        tokio::spawn(task.run(buffer));
    }

    /// Aborts whatever is in flight and returns to idle. Idempotent.
    ///
    /// There is no blocking cancellation of spawned work: bumping the
    /// generation is what invalidates it, and its eventual result is
    /// rejected post-hoc.
    #[instrument(skip(self))]
    pub async fn cancel(&mut self) {
        let shared = Arc::clone(&self.shared);
        let mut guard = shared.guard.lock().await;

        guard.bump_generation();
        if let Err(e) = self.capture.stop() {
            warn!(error = ?e, "Failed to stop capture during cancel");
        }
        self.accumulator.clear();

        if matches!(guard.state(), SessionState::Idle) {
            debug!("Cancel while idle");
            return;
        }

        info!(session_id = %self.session_id, from = guard.state().label(), "Session cancelled");
        self.shared.apply(&mut guard, SessionState::Cancelled);
        self.shared.apply(&mut guard, SessionState::Idle);
    }

    /// Recovery from a lost release event: tear the session down so the
    /// pending press can start cleanly.
    fn force_reset(&mut self, guard: &mut SessionGuard) {
        guard.bump_generation();
        if let Err(e) = self.capture.stop() {
            warn!(error = ?e, "Failed to stop capture during forced reset");
        }
        self.accumulator.clear();
        self.shared.apply(guard, SessionState::Idle);
    }
}

/// Everything one session's completion pipeline needs, snapshot at release.
struct PipelineTask<E, I> {
    shared: Arc<ControllerShared>,
    engine: Arc<Mutex<E>>,
    inserter: Arc<Mutex<I>>,
    language: String,
    transcription_timeout: Duration,
    completion_hold: Duration,
    generation: u64,
    session_id: Uuid,
}

impl<E, I> PipelineTask<E, I>
where
    E: TranscriptionEngine + 'static,
    I: TextInserter + 'static,
{
    async fn run(self, buffer: ResampledBuffer) {
        let engine = Arc::clone(&self.engine);
        let language = self.language.clone();
        let inference = tokio::task::spawn_blocking(move || {
            let mut engine = engine.blocking_lock();
            engine.transcribe(&buffer, &language)
        });

        let outcome = tokio::time::timeout(self.transcription_timeout, inference).await;

        let transcription = {
            let mut guard = self.shared.guard.lock().await;
            if guard.generation() != self.generation {
                debug!(session_id = %self.session_id, "Stale transcription result discarded");
                return;
            }
            match outcome {
                Err(_) => {
                    // The blocking task keeps running; only its result is
                    // abandoned. The generation check rejects it later.
                    let err = SessionError::TranscriptionTimeout {
                        waited_ms: self.transcription_timeout.as_millis() as u64,
                        location: ErrorLocation::from(Location::caller()),
                    };
                    self.fail(&mut guard, err.to_string());
                    return;
                }
                Ok(Err(join_err)) => {
                    self.fail(&mut guard, format!("transcription task failed: {join_err}"));
                    return;
                }
                Ok(Ok(Err(e))) => {
                    self.fail(&mut guard, e.to_string());
                    return;
                }
                Ok(Ok(Ok(transcription))) => {
                    self.shared.apply(
                        &mut guard,
                        SessionState::Inserting {
                            text: transcription.text.clone(),
                        },
                    );
                    transcription
                }
            }
        };

        info!(
            session_id = %self.session_id,
            text_len = transcription.text.len(),
            confidence = transcription.confidence,
            elapsed_ms = transcription.elapsed.as_millis(),
            "Transcription complete"
        );

        let delivered = {
            let mut inserter = self.inserter.lock().await;
            inserter.insert(&transcription.text).await
        };

        let mut guard = self.shared.guard.lock().await;
        if guard.generation() != self.generation {
            debug!(session_id = %self.session_id, "Stale insertion result discarded");
            return;
        }

        match delivered {
            Ok(delivery) => {
                if delivery == InsertionOutcome::CopiedToClipboard {
                    warn!(
                        session_id = %self.session_id,
                        "Direct insertion unavailable, text left on clipboard"
                    );
                }
                self.shared.apply(
                    &mut guard,
                    SessionState::Completed {
                        text: transcription.text,
                        delivery,
                    },
                );
                drop(guard);
                schedule_reset(self.shared, self.generation, self.completion_hold);
            }
            Err(e) => {
                self.fail(&mut guard, e.to_string());
            }
        }
    }

    fn fail(&self, guard: &mut SessionGuard, reason: String) {
        error!(session_id = %self.session_id, reason = %reason, "Session failed");
        self.shared.apply(guard, SessionState::Failed { reason });
        schedule_reset(
            Arc::clone(&self.shared),
            self.generation,
            self.completion_hold,
        );
    }
}

/// Returns a terminal state to idle after the feedback delay, unless the
/// session was superseded in the meantime.
fn schedule_reset(shared: Arc<ControllerShared>, generation: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut guard = shared.guard.lock().await;
        if guard.generation() != generation || !guard.state().is_terminal() {
            return;
        }
        shared.apply(&mut guard, SessionState::Idle);
    });
}
