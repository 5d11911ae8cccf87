//! Multitap decoding: repeated presses of one key within a timeout cycle
//! through that key's candidates, anything else commits.

use crate::keymap::KeyboardConfig;
use log::trace;
use std::time::{Duration, Instant};

/// Presses of the same key closer together than this continue a cycle
pub const CYCLE_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum CaseMode {
    #[default]
    #[strum(serialize = "abc")]
    Lower,
    #[strum(serialize = "ABC")]
    Upper,
}

impl CaseMode {
    pub fn toggled(self) -> Self {
        match self {
            CaseMode::Lower => CaseMode::Upper,
            CaseMode::Upper => CaseMode::Lower,
        }
    }

    pub fn format(self, candidate: &str) -> String {
        match self {
            CaseMode::Lower => candidate.to_lowercase(),
            CaseMode::Upper => candidate.to_uppercase(),
        }
    }
}

/// What a single press did to the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Mode switch pressed; carries the new mode
    ModeToggled(CaseMode),
    /// Delete symbol removed this character
    Deleted(char),
    /// Delete symbol on empty text
    NothingToDelete,
    /// Key not in the keymap; swallowed
    Unmapped,
    /// New cycle started, text appended
    Appended(String),
    /// Cycle advanced, the pending character was replaced
    Replaced { index: usize, with: String },
}

/// Per-player decode state
///
/// Invariant: while `last_key` is set, `cycle_index` is below the number of
/// candidates for that key, and the last `pending_chars` characters of
/// `text` are the ones the current cycle put there.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecoderState {
    text: String,
    last_key: Option<String>,
    cycle_index: usize,
    pending_chars: usize,
    last_press: Option<Instant>,
    case_mode: CaseMode,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn case_mode(&self) -> CaseMode {
        self.case_mode
    }

    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }

    pub fn cycle_index(&self) -> usize {
        self.cycle_index
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn abandon_cycle(&mut self) {
        self.last_key = None;
        self.cycle_index = 0;
        self.pending_chars = 0;
    }

    /// Apply one canonical key press.
    ///
    /// Rules in priority order: mode switch, delete, unmapped, then cycle or
    /// commit-and-start.
    pub fn decode(&mut self, key: &str, now: Instant, keyboard: &KeyboardConfig) -> Decoded {
        if keyboard.is_mode_switch(key) {
            self.case_mode = self.case_mode.toggled();
            trace!("mode switch -> {}", self.case_mode);
            return Decoded::ModeToggled(self.case_mode);
        }

        if keyboard.is_delete(key) {
            return match self.text.pop() {
                Some(removed) => {
                    self.abandon_cycle();
                    trace!("deleted {removed:?}");
                    Decoded::Deleted(removed)
                }
                None => Decoded::NothingToDelete,
            };
        }

        let Some(candidates) = keyboard.candidates(key) else {
            trace!("unmapped key {key:?}");
            return Decoded::Unmapped;
        };

        let continues_cycle = self.last_key.as_deref() == Some(key)
            && self
                .last_press
                .is_some_and(|last| now.saturating_duration_since(last) < CYCLE_TIMEOUT);

        let outcome = if continues_cycle {
            self.cycle_index = (self.cycle_index + 1) % candidates.len();
            let formatted = self.case_mode.format(&candidates[self.cycle_index]);

            for _ in 0..self.pending_chars {
                self.text.pop();
            }
            let index = self.text.chars().count();
            self.text.push_str(&formatted);
            self.pending_chars = formatted.chars().count();

            trace!("cycle {key:?} -> {formatted:?} (index {})", self.cycle_index);
            Decoded::Replaced {
                index,
                with: formatted,
            }
        } else {
            self.cycle_index = 0;
            let formatted = self.case_mode.format(&candidates[0]);
            self.text.push_str(&formatted);
            self.pending_chars = formatted.chars().count();

            trace!("commit and start {key:?} -> {formatted:?}");
            Decoded::Appended(formatted)
        };

        self.last_key = Some(key.to_string());
        self.last_press = Some(now);
        outcome
    }
}
