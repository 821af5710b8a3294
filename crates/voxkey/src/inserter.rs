//! Insertion coordinator: clipboard delivery with optional auto-paste.
//!
//! Always copies the transcript to the clipboard first; when auto-paste is
//! enabled it then simulates the platform paste chord into the focused
//! window. A failed paste is a fallback, not an error -- the text is
//! already on the clipboard and the session controller surfaces which
//! delivery mode actually happened.

use crate::{AppError, AppResult, PasteKeyGuard};

use std::panic::Location;
use std::time::Duration;

use arboard::Clipboard;
use async_trait::async_trait;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};
use voxkey_core::{InsertionOutcome, SessionError, SessionResult, TextInserter};

/// Delay between clipboard write and paste simulation.
///
/// This gives the OS clipboard manager time to process the write before
/// we simulate the paste chord. Too short and the paste may get stale
/// content; too long and the user perceives lag. 50ms is empirically
/// reliable across Windows, macOS, and Linux desktop environments.
const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Delay between key events in the paste simulation.
///
/// Keyboard event timing: some applications and input method editors
/// need a small gap between key_down, key_click, and key_up to register
/// events correctly. 10ms is the minimum reliable interval.
const KEY_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Clipboard-backed implementation of [`TextInserter`].
pub struct ClipboardInserter {
    pub(crate) clipboard: Clipboard,
    auto_paste: bool,
}

impl ClipboardInserter {
    /// Create a new inserter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ClipboardError`] when no clipboard is available.
    #[track_caller]
    #[instrument]
    pub fn new(auto_paste: bool) -> AppResult<Self> {
        let clipboard = Clipboard::new().map_err(|e| AppError::ClipboardError {
            reason: format!("Failed to initialize clipboard: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(auto_paste, "ClipboardInserter initialized");

        Ok(Self {
            clipboard,
            auto_paste,
        })
    }

    #[instrument(skip(self))]
    async fn paste(&mut self) -> AppResult<()> {
        use enigo::{Direction, Key, Keyboard};

        // Simulate the paste chord using spawn_blocking since enigo
        // operations are synchronous and involve small sleeps for key event
        // timing.
        //
        // NOTE: A new Enigo instance is created inside spawn_blocking because:
        // 1. Enigo is not Send, so it cannot be moved across thread boundaries
        // 2. spawn_blocking requires 'static + Send closure
        // 3. Enigo::new() is cheap (no heavy platform initialization)
        // This is intentional, not a bug.
        //
        // RAII SAFETY: PasteKeyGuard ensures the modifier is released on drop,
        // even if key operations fail or panic. Without this, a failure after
        // pressing the modifier would leave it stuck, making the keyboard
        // unusable.
        let paste_result = tokio::task::spawn_blocking(|| {
            let mut guard = PasteKeyGuard::new()?;

            std::thread::sleep(KEY_EVENT_DELAY);

            guard
                .enigo_mut()
                .key(Key::Unicode('v'), Direction::Click)
                .map_err(|e| AppError::AutoPasteFailed {
                    reason: format!("Failed to press V: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            std::thread::sleep(KEY_EVENT_DELAY);

            // Guard drops here, releasing the modifier automatically.
            Ok::<(), AppError>(())
        })
        .await
        .map_err(|e| AppError::AutoPasteFailed {
            reason: format!("Paste task panicked: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        paste_result?;

        debug!("Auto-paste simulated");

        Ok(())
    }
}

#[async_trait]
impl TextInserter for ClipboardInserter {
    #[instrument(skip(self, text))]
    async fn insert(&mut self, text: &str) -> SessionResult<InsertionOutcome> {
        // Step 1: Always copy to clipboard first
        self.clipboard
            .set_text(text)
            .map_err(|e| SessionError::InsertionFailed {
                reason: format!("Failed to set clipboard: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(text_len = text.len(), "Text copied to clipboard");

        if !self.auto_paste {
            return Ok(InsertionOutcome::CopiedToClipboard);
        }

        // Allow the clipboard manager to process the write before pasting.
        // See CLIPBOARD_SETTLE_DELAY documentation for rationale.
        tokio::time::sleep(CLIPBOARD_SETTLE_DELAY).await;

        match self.paste().await {
            Ok(()) => {
                info!(text_len = text.len(), "Text pasted into focused window");
                Ok(InsertionOutcome::InsertedDirectly)
            }
            Err(e) => {
                // The transcript is already on the clipboard; direct
                // insertion is an upgrade, not a requirement.
                warn!(error = ?e, "Auto-paste failed, text left on clipboard");
                Ok(InsertionOutcome::CopiedToClipboard)
            }
        }
    }
}
