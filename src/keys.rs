use std::time::Instant;

/// Prefixes some platforms put in front of digit keys ("Numpad7", "Digit7")
const DIGIT_PREFIXES: [&str; 2] = ["Numpad", "Digit"];

/// Physical region of the keyboard a key event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum KeyLocation {
    #[default]
    Standard,
    Left,
    Right,
    Numpad,
}

impl KeyLocation {
    /// Map a host location code (0=standard, 1=left, 2=right, 3=numpad).
    /// Unknown codes fall back to `Standard`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => KeyLocation::Left,
            2 => KeyLocation::Right,
            3 => KeyLocation::Numpad,
            _ => KeyLocation::Standard,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            KeyLocation::Standard => 0,
            KeyLocation::Left => 1,
            KeyLocation::Right => 2,
            KeyLocation::Numpad => 3,
        }
    }
}

/// A key press as reported by the host UI layer
#[derive(Debug, Clone, PartialEq)]
pub struct RawKeyEvent {
    pub key: String,
    pub code: String,
    pub location: KeyLocation,
    pub repeat: bool,
    pub timestamp: Instant,
    /// Whether the host says the event originated from a touch source, when it knows
    pub touch_origin: Option<bool>,
}

impl RawKeyEvent {
    pub fn new(key: impl Into<String>, location: KeyLocation, timestamp: Instant) -> Self {
        let key = key.into();
        Self {
            code: key.clone(),
            key,
            location,
            repeat: false,
            timestamp,
            touch_origin: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_touch_origin(mut self, touch_origin: bool) -> Self {
        self.touch_origin = Some(touch_origin);
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Canonical key symbol for keymap lookups
    pub fn canonical_key(&self) -> String {
        normalize(&self.key)
    }
}

/// Turn a raw key identifier into the canonical symbol used by keymaps.
///
/// Numeric-pad and digit-row identifiers collapse to their trailing digit,
/// everything else passes through untouched.
pub fn normalize(raw_key: &str) -> String {
    let prefixed = DIGIT_PREFIXES
        .iter()
        .any(|prefix| raw_key.len() > prefix.len() && raw_key.starts_with(prefix));

    if prefixed {
        if let Some(last) = raw_key.chars().last() {
            return last.to_string();
        }
    }

    raw_key.to_string()
}
