//! Accuracy and speed, recomputed on demand from the typed text.
//!
//! Accuracy counts every position where typed and target agree, not just the
//! unbroken prefix: a typo followed by matching characters still earns credit
//! for the later matches.

use std::time::Instant;

/// Characters per word for WPM purposes
pub const CHARS_PER_WORD: f64 = 5.0;

/// Number of positions where `typed` and `target` hold the same character.
/// Positions past the end of `target` never match.
pub fn correct_count(typed: &str, target: &str) -> usize {
    typed
        .chars()
        .zip(target.chars())
        .filter(|(t, e)| t == e)
        .count()
}

/// Percentage of typed characters that match their target position, 100 for no input
pub fn accuracy(typed: &str, target: &str) -> u32 {
    percent_correct(correct_count(typed, target), typed.chars().count())
}

fn percent_correct(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

/// Seconds since `started_at`, never less than one
pub fn elapsed_seconds(started_at: Option<Instant>, now: Instant) -> f64 {
    let started_at = started_at.unwrap_or(now);
    now.saturating_duration_since(started_at)
        .as_secs_f64()
        .max(1.0)
}

pub fn wpm(valid_chars: usize, elapsed_secs: f64) -> u32 {
    let elapsed_secs = elapsed_secs.max(1.0);
    ((valid_chars as f64 / CHARS_PER_WORD) * (60.0 / elapsed_secs)).round() as u32
}

/// Metrics for one player at one moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub valid_chars: usize,
    pub accuracy: u32,
    pub wpm: u32,
}

impl Score {
    pub fn compute(typed: &str, target: &str, started_at: Option<Instant>, now: Instant) -> Self {
        let valid_chars = correct_count(typed, target);
        Self {
            valid_chars,
            accuracy: percent_correct(valid_chars, typed.chars().count()),
            wpm: wpm(valid_chars, elapsed_seconds(started_at, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn accuracy_of_nothing_typed_is_full() {
        assert_eq!(accuracy("", "anything"), 100);
        assert_eq!(accuracy("", ""), 100);
    }

    #[test]
    fn accuracy_partial_match() {
        assert_eq!(correct_count("abx", "abc"), 2);
        assert_eq!(accuracy("abx", "abc"), 67);
    }

    #[test]
    fn accuracy_keeps_counting_after_a_mismatch() {
        assert_eq!(correct_count("xbc", "abc"), 2);
        assert_eq!(accuracy("xbc", "abc"), 67);
    }

    #[test]
    fn overflow_past_target_never_matches() {
        assert_eq!(correct_count("abcabc", "abc"), 3);
        assert_eq!(accuracy("abcabc", "abc"), 50);
        assert_eq!(accuracy("abc", ""), 0);
    }

    #[test]
    fn wpm_over_ten_seconds() {
        let now = Instant::now();
        let start = now - Duration::from_secs(10);
        assert_eq!(wpm(10, elapsed_seconds(Some(start), now)), 12);
    }

    #[test]
    fn elapsed_has_a_one_second_floor() {
        let now = Instant::now();
        assert_eq!(elapsed_seconds(None, now), 1.0);
        assert_eq!(elapsed_seconds(Some(now), now), 1.0);
        assert_eq!(
            elapsed_seconds(Some(now), now + Duration::from_millis(300)),
            1.0
        );
    }

    #[test]
    fn wpm_is_zero_without_valid_chars() {
        assert_eq!(wpm(0, 1.0), 0);
        assert_eq!(wpm(0, 30.0), 0);
    }

    #[test]
    fn score_agrees_with_free_functions() {
        let now = Instant::now();
        let start = now - Duration::from_secs(10);
        for (typed, target) in [("abx", "abc"), ("", "abc"), ("hello world", "hello there")] {
            let score = Score::compute(typed, target, Some(start), now);
            assert_eq!(score.valid_chars, correct_count(typed, target));
            assert_eq!(score.accuracy, accuracy(typed, target));
        }
    }

    #[test]
    fn score_with_empty_target() {
        let now = Instant::now();
        let score = Score::compute("", "", None, now);
        assert_eq!(score.accuracy, 100);
        assert_eq!(score.wpm, 0);
    }
}
