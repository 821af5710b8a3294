use serde::{Deserialize, Serialize};

/// Global shortcut configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Modifier names ("Control", "Shift", "Option"/"Alt", "Command"/"Super").
    #[serde(default = "default_modifiers")]
    pub modifiers: Vec<String>,
    /// Key name ("Space", "A".."Z", "F1".."F12").
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_modifiers() -> Vec<String> {
    vec!["Control".to_string(), "Shift".to_string()]
}

fn default_key() -> String {
    "Space".to_string()
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            modifiers: default_modifiers(),
            key: default_key(),
        }
    }
}
