//! Terminal settings

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted terminal settings
///
/// Stored as `{"soundOn": bool, "soundProOn": bool}`. Each field falls back to
/// its default on its own when missing or not a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Interface sounds
    pub sound_on: bool,
    /// Keystroke clicks and ambient hum (needs `sound_on`)
    pub sound_pro_on: bool,
}

impl Settings {
    /// Parse a stored record; corrupt data gives defaults
    pub fn from_json(raw: &str) -> Self {
        let defaults = Self::default();
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return defaults;
        };
        let flag = |key: &str, default: bool| value.get(key).and_then(Value::as_bool).unwrap_or(default);
        Self {
            sound_on: flag("soundOn", defaults.sound_on),
            sound_pro_on: flag("soundProOn", defaults.sound_pro_on),
        }
    }

    /// Flip `sound_on`
    pub fn toggle_sound(&mut self) {
        self.sound_on = !self.sound_on;
    }

    /// Flip `sound_pro_on`
    pub fn toggle_sound_pro(&mut self) {
        self.sound_pro_on = !self.sound_pro_on;
    }

    /// Whether the "pro" effects are actually audible
    pub fn pro_effects_active(&self) -> bool {
        self.sound_on && self.sound_pro_on
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_on: true,
            sound_pro_on: false,
        }
    }
}
