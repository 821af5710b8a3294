pub(crate) mod controller;
pub(crate) mod event;
pub(crate) mod insert;
pub(crate) mod state;

pub use {
    controller::{SessionConfig, SessionController},
    event::{HotkeyEvent, HotkeyEventKind, SessionEvent},
    insert::{InsertionOutcome, TextInserter},
    state::{SessionGuard, SessionState},
};
