use crate::SessionResult;

use async_trait::async_trait;

/// How transcribed text reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// Text was pasted into the focused application.
    InsertedDirectly,
    /// Direct insertion was unavailable; the text is on the clipboard only.
    CopiedToClipboard,
}

/// Text delivery service, as seen by the session controller.
///
/// Invoked at most once per session, sequentially, from the controller's
/// completion pipeline only.
#[async_trait]
pub trait TextInserter: Send {
    /// Delivers `text`, reporting which delivery mode was used.
    ///
    /// Falling back to the clipboard is a successful outcome, not an error;
    /// an error means the text could not be delivered at all.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::InsertionFailed`] when no delivery
    /// path worked.
    async fn insert(&mut self, text: &str) -> SessionResult<InsertionOutcome>;
}
