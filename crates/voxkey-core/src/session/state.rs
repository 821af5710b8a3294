use crate::session::InsertionOutcome;

use std::time::Instant;

/// The authoritative state of one recording session.
///
/// Transitions form a DAG: every non-terminal state has exactly one
/// successful edge forward and one failure/cancel edge back to `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No session in flight.
    Idle,
    /// The shortcut is held and audio is being captured.
    Recording {
        /// Source timestamp of the press that started the session.
        started_at: Instant,
    },
    /// The shortcut was released; audio is with the transcription engine.
    Transcribing {
        /// Source timestamp of the press that started the session.
        started_at: Instant,
        /// Source timestamp of the release that ended capture.
        ended_at: Instant,
    },
    /// Transcribed text is being delivered to the insertion service.
    Inserting {
        /// The transcript awaiting delivery.
        text: String,
    },
    /// The session finished and text was delivered.
    Completed {
        /// The delivered transcript.
        text: String,
        /// How the text reached the user.
        delivery: InsertionOutcome,
    },
    /// The session was cancelled and its audio discarded.
    Cancelled,
    /// The session failed; nothing was delivered.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl SessionState {
    /// True while a session is in flight (debounce applies to these states).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Recording { .. }
                | SessionState::Transcribing { .. }
                | SessionState::Inserting { .. }
        )
    }

    /// True for states that resolve back to `Idle` exactly once.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed { .. } | SessionState::Cancelled | SessionState::Failed { .. }
        )
    }

    /// Short label for logs and observers.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording { .. } => "recording",
            SessionState::Transcribing { .. } => "transcribing",
            SessionState::Inserting { .. } => "inserting",
            SessionState::Completed { .. } => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The single mutable cell gating all session transitions.
///
/// Exactly one guard exists per controller; it is the sole gate for
/// starting audio capture. The generation counter is the cancellation
/// mechanism: any continuation that captured an older generation treats
/// itself as stale and discards its result.
#[derive(Debug)]
pub struct SessionGuard {
    state: SessionState,
    generation: u64,
    last_transition_at: Instant,
}

impl SessionGuard {
    /// A fresh guard in `Idle` at generation zero.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            last_transition_at: Instant::now(),
        }
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current generation; continuations compare against their snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the last transition happened (handler-entry time, used only for
    /// staleness recovery, never for session duration).
    pub fn last_transition_at(&self) -> Instant {
        self.last_transition_at
    }

    /// Invalidates every in-flight continuation.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Applies a transition and stamps it.
    pub fn transition(&mut self, next: SessionState) {
        self.last_transition_at = Instant::now();
        self.state = next;
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}
