use std::time::Instant;

/// Whether the shortcut went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEventKind {
    /// The shortcut was pressed.
    Pressed,
    /// The shortcut was released.
    Released,
}

/// One shortcut transition, stamped at OS delivery time.
///
/// `source_timestamp` is captured inside the OS event handler, not when the
/// controller eventually runs: handler scheduling can lag the physical key
/// action by an unbounded amount under load, and session durations are
/// computed from these timestamps only.
#[derive(Debug, Clone, Copy)]
pub struct HotkeyEvent {
    /// Press or release.
    pub kind: HotkeyEventKind,
    /// Monotonic time at which the OS delivered the event.
    pub source_timestamp: Instant,
}

/// Everything the controller's serialized inbox can carry.
///
/// Funneling all signals through one single-consumer queue is what gives
/// press/release/cancel a strict arrival order regardless of which thread
/// produced them.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent {
    /// A shortcut press or release.
    Hotkey(HotkeyEvent),
    /// Abort whatever session is in flight.
    Cancel,
}
