use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical key symbol -> cycle order of candidate characters.
///
/// A single empty candidate marks a control key that consumes the press
/// without producing text.
pub type KeyMap = BTreeMap<String, Vec<String>>;

const PUNCTUATION: [&str; 13] = [".", ",", "?", "!", "'", "\"", "-", "(", ")", "@", "/", ":", "1"];

/// Everything one player's decoder needs to turn keys into text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardConfig {
    pub phone_map: KeyMap,
    pub mode_switch_key: String,
    #[serde(default = "default_delete_keys")]
    pub delete_keys: Vec<String>,
}

fn default_delete_keys() -> Vec<String> {
    vec!["Backspace".to_string(), "Delete".to_string()]
}

impl KeyboardConfig {
    pub fn new(phone_map: KeyMap, mode_switch_key: impl Into<String>) -> Self {
        Self {
            phone_map,
            mode_switch_key: mode_switch_key.into(),
            delete_keys: default_delete_keys(),
        }
    }

    /// Numeric keypad layout, read like a phone held upside down: 7-8-9 on top
    pub fn player_one() -> Self {
        Self::new(
            build_map(&[
                ("7", &PUNCTUATION),
                ("8", &["a", "b", "c"]),
                ("9", &["d", "e", "f"]),
                ("4", &["g", "h", "i"]),
                ("5", &["j", "k", "l"]),
                ("6", &["m", "n", "o"]),
                ("1", &["p", "q", "r", "s"]),
                ("2", &["t", "u", "v"]),
                ("3", &["w", "x", "y", "z"]),
                ("0", &[" "]),
                ("Backspace", &[""]),
            ]),
            "+",
        )
    }

    /// Right-hand letter block of a standard keyboard
    pub fn player_two() -> Self {
        Self::new(
            build_map(&[
                ("u", &PUNCTUATION),
                ("i", &["a", "b", "c"]),
                ("o", &["d", "e", "f"]),
                ("j", &["g", "h", "i"]),
                ("k", &["j", "k", "l"]),
                ("l", &["m", "n", "o"]),
                ("m", &["p", "q", "r", "s"]),
                (",", &["t", "u", "v"]),
                (".", &["w", "x", "y", "z"]),
                (" ", &[" "]),
                ("Delete", &[""]),
            ]),
            "/",
        )
    }

    pub fn candidates(&self, key: &str) -> Option<&[String]> {
        self.phone_map
            .get(key)
            .map(Vec::as_slice)
            .filter(|c| !c.is_empty())
    }

    pub fn is_mode_switch(&self, key: &str) -> bool {
        self.mode_switch_key == key
    }

    pub fn is_delete(&self, key: &str) -> bool {
        self.delete_keys.iter().any(|k| k == key)
    }

    /// Whether the decoder would treat `key` as a character press
    /// (not the mode switch, not a delete symbol, present in the keymap)
    pub fn is_character_key(&self, key: &str) -> bool {
        !self.is_mode_switch(key) && !self.is_delete(key) && self.candidates(key).is_some()
    }

    /// Whether this keyboard claims `key` at all
    pub fn handles(&self, key: &str) -> bool {
        self.is_mode_switch(key) || self.phone_map.contains_key(key)
    }

    /// Keys mapped to an empty candidate list, which could never cycle
    pub fn empty_keys(&self) -> Vec<&str> {
        self.phone_map
            .iter()
            .filter(|(_, c)| c.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self::player_one()
    }
}

fn build_map(entries: &[(&str, &[&str])]) -> KeyMap {
    entries
        .iter()
        .map(|(key, chars)| {
            (
                key.to_string(),
                chars.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}
