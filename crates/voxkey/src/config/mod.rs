mod audio_config;
mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod hotkey_config;
mod session_config;
mod whisper_config;

pub(crate) use {
    audio_config::AudioConfig, behaviour_config::BehaviourConfig, config::Config,
    hotkey_config::HotkeyConfig, session_config::SessionTimingConfig,
    whisper_config::WhisperConfig,
};

pub(crate) const DEFAULT_AUTO_PASTE: bool = true;

pub(crate) fn default_auto_paste() -> bool {
    DEFAULT_AUTO_PASTE
}
