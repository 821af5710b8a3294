//! Shortcut event source: global hotkey registration and the
//! timestamp-and-enqueue handler.
//!
//! The OS delivers hotkey callbacks on a thread of its choosing, possibly
//! re-entrantly. The installed handler therefore does nothing but stamp a
//! monotonic timestamp, map the transition and try a non-blocking send into
//! the controller's serialized inbox. All session logic lives behind that
//! inbox.

use crate::{AppError, AppResult, config::HotkeyConfig};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

use error_location::ErrorLocation;
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use voxkey_core::{HotkeyEvent, HotkeyEventKind, SessionEvent};

/// Global shortcut registration and event delivery.
pub struct HotkeySource;

impl HotkeySource {
    /// Register the configured shortcut with the OS.
    ///
    /// Must be called on a thread with a message pump (e.g. the main thread
    /// running a `tao`/`winit` event loop) so that `WM_HOTKEY` messages are
    /// dispatched on Windows. The returned [`GlobalHotKeyManager`] must be
    /// kept alive on that thread for the hotkey to remain registered.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::HotkeyRegistrationFailed`] when the combination
    /// cannot be parsed or is already bound; this is global and
    /// non-retryable without user action.
    #[track_caller]
    #[instrument(skip(config))]
    pub fn register(config: &HotkeyConfig) -> AppResult<(GlobalHotKeyManager, u32)> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to create manager: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let modifiers = parse_modifiers(&config.modifiers)?;
        let code = parse_key(&config.key)?;
        let hotkey = HotKey::new(Some(modifiers), code);

        manager
            .register(hotkey)
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!(
                    "Failed to register {:?}+{}: {}",
                    config.modifiers, config.key, e
                ),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(
            modifiers = ?config.modifiers,
            key = %config.key,
            "Global hotkey registered"
        );

        Ok((manager, hotkey.id()))
    }

    /// Install the OS event handler feeding the controller's inbox.
    ///
    /// The handler runs in the OS callback context: it stamps the event at
    /// delivery time and enqueues without blocking. A full inbox drops the
    /// event and counts it; that is protocol noise, never a user-facing
    /// error.
    pub fn install(hotkey_id: u32, events_tx: mpsc::Sender<SessionEvent>) {
        let dropped = Arc::new(AtomicUsize::new(0));

        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            // Stamp before anything else: the consumer may run arbitrarily
            // later, and session durations are computed from this instant.
            let at = Instant::now();
            if let Some(session_event) = to_session_event(&event, hotkey_id, at) {
                forward(&events_tx, session_event, &dropped);
            }
        }));

        info!("Hotkey event handler installed");
    }
}

/// Maps an OS hotkey event to an inbox event, stamped with `at`.
///
/// Events for other registrations are ignored.
pub(crate) fn to_session_event(
    event: &GlobalHotKeyEvent,
    hotkey_id: u32,
    at: Instant,
) -> Option<SessionEvent> {
    if event.id != hotkey_id {
        return None;
    }

    let kind = match event.state {
        HotKeyState::Pressed => HotkeyEventKind::Pressed,
        HotKeyState::Released => HotkeyEventKind::Released,
    };

    Some(SessionEvent::Hotkey(HotkeyEvent {
        kind,
        source_timestamp: at,
    }))
}

/// Non-blocking enqueue into the controller inbox.
pub(crate) fn forward(
    events_tx: &mpsc::Sender<SessionEvent>,
    event: SessionEvent,
    dropped: &AtomicUsize,
) {
    if events_tx.try_send(event).is_err() {
        let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(total_dropped = total, "Hotkey inbox full, event dropped");
    }
}

#[track_caller]
pub(crate) fn parse_modifiers(modifiers: &[String]) -> AppResult<Modifiers> {
    let mut result = Modifiers::empty();
    for modifier in modifiers {
        match modifier.as_str() {
            "Control" | "Ctrl" => result |= Modifiers::CONTROL,
            "Option" | "Alt" => result |= Modifiers::ALT,
            "Command" | "Super" => result |= Modifiers::SUPER,
            "Shift" => result |= Modifiers::SHIFT,
            _ => {
                return Err(AppError::HotkeyRegistrationFailed {
                    reason: format!("unknown modifier: {}", modifier),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }
    Ok(result)
}

#[track_caller]
pub(crate) fn parse_key(key: &str) -> AppResult<Code> {
    let code = match key {
        "Space" => Code::Space,
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        _ => {
            return Err(AppError::HotkeyRegistrationFailed {
                reason: format!("unsupported key: {}", key),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };
    Ok(code)
}
