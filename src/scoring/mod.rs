// src/scoring/mod.rs

//! Typing exam scoring.
//!
//! Pure computation from (reference paragraph, typed text, elapsed minutes)
//! to a [`ScoreCard`]. Nothing in here touches storage or the clock.

pub mod diff;
pub mod marks;

use serde::Serialize;

use self::diff::{Opcode, SequenceMatcher};
use self::marks::{MarksTier, TierRounding};

/// One word is counted as five characters.
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    pub rounding: TierRounding,
    /// Skip characters that are very frequent in long typed texts when
    /// anchoring matches.
    pub autojunk: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rounding: TierRounding::Truncate,
            autojunk: true,
        }
    }
}

/// Result of scoring one attempt, at full precision.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreCard {
    pub gross_speed_wpm: f64,
    pub final_speed_wpm: f64,
    pub mistake_count: u32,
    pub marks: MarksTier,
    /// Alignment of the compared reference (`a`) against the typed text (`b`).
    #[serde(skip)]
    pub opcodes: Vec<Opcode>,
}

/// Scores `typed` against `reference`.
///
/// Only the first `len(typed)` characters of the reference take part in the
/// comparison. Every non-equal alignment opcode counts as one mistake no
/// matter how many characters it spans.
pub fn score(reference: &str, typed: &str, elapsed_minutes: f64, config: &ScoringConfig) -> ScoreCard {
    let typed: Vec<char> = typed.chars().collect();
    let compared: Vec<char> = reference.chars().take(typed.len()).collect();

    let opcodes = SequenceMatcher::new(&compared, &typed, config.autojunk).opcodes();
    let mistake_count = opcodes.iter().filter(|op| op.is_edit()).count() as u32;

    let gross_speed_wpm = gross_speed(typed.len(), elapsed_minutes);
    let final_speed_wpm = (gross_speed_wpm - f64::from(mistake_count)).max(0.0);

    ScoreCard {
        gross_speed_wpm,
        final_speed_wpm,
        mistake_count,
        marks: MarksTier::for_speed(final_speed_wpm, config.rounding),
        opcodes,
    }
}

/// Words per minute for `chars` characters typed in `elapsed_minutes`.
/// Zero when no time has elapsed.
pub fn gross_speed(chars: usize, elapsed_minutes: f64) -> f64 {
    if elapsed_minutes > 0.0 {
        chars as f64 / CHARS_PER_WORD / elapsed_minutes
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPH: &str = "Rust is a multi-paradigm, general-purpose programming language \
        that emphasizes performance, type safety, and concurrency.";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exact_prefix_has_no_mistakes() {
        let config = ScoringConfig::default();
        for len in [0, 1, 7, 30, PARAGRAPH.len()] {
            let typed: String = PARAGRAPH.chars().take(len).collect();
            let card = score(PARAGRAPH, &typed, 1.0, &config);
            assert_eq!(card.mistake_count, 0, "prefix of length {len}");
        }
    }

    #[test]
    fn dropped_letter_example() {
        let card = score(
            "the quick brown fox",
            "the qick brown fox",
            1.0,
            &ScoringConfig::default(),
        );
        // the reference is cut to 18 chars, leaving its last "x" unmatched too
        assert_eq!(card.mistake_count, 2);
        assert!(close(card.gross_speed_wpm, 18.0 / 5.0));
        assert!(close(card.final_speed_wpm, 18.0 / 5.0 - 2.0));
        assert_eq!(card.marks, MarksTier::Disqualify);
    }

    #[test]
    fn empty_typed_text_scores_zero() {
        let card = score(PARAGRAPH, "", 3.0, &ScoringConfig::default());
        assert_eq!(card.mistake_count, 0);
        assert_eq!(card.gross_speed_wpm, 0.0);
        assert_eq!(card.final_speed_wpm, 0.0);
        assert_eq!(card.marks, MarksTier::Disqualify);
        assert!(card.opcodes.is_empty());
    }

    #[test]
    fn no_elapsed_time_means_zero_speed() {
        let config = ScoringConfig::default();
        assert_eq!(score(PARAGRAPH, "Rust", 0.0, &config).gross_speed_wpm, 0.0);
        assert_eq!(score(PARAGRAPH, "Rust", -1.0, &config).gross_speed_wpm, 0.0);
        assert_eq!(score(PARAGRAPH, "Rust", f64::NAN, &config).gross_speed_wpm, 0.0);
    }

    #[test]
    fn final_speed_is_floored_at_zero() {
        let card = score("abcdefghij", "aXcXeXgXiX", 1.0, &ScoringConfig::default());
        assert_eq!(card.mistake_count, 5);
        assert!(close(card.gross_speed_wpm, 2.0));
        assert_eq!(card.final_speed_wpm, 0.0);
    }

    #[test]
    fn final_speed_is_gross_minus_mistakes() {
        let config = ScoringConfig::default();
        let typed = "Rust is a multi-paradigm, general-purpuse programing language";
        for minutes in [0.05, 0.1, 0.25, 1.0] {
            let card = score(PARAGRAPH, typed, minutes, &config);
            let expected = (card.gross_speed_wpm - f64::from(card.mistake_count)).max(0.0);
            assert!(close(card.final_speed_wpm, expected));
            assert!(card.final_speed_wpm >= 0.0);
            assert_eq!(
                card.marks,
                MarksTier::for_speed(card.final_speed_wpm, config.rounding)
            );
        }
    }

    #[test]
    fn fast_clean_typing_earns_top_marks() {
        // 300 chars in one minute = 60 WPM
        let reference: String = "abcdefghij".repeat(30);
        let card = score(
            &reference,
            &reference,
            1.0,
            &ScoringConfig {
                autojunk: false,
                ..ScoringConfig::default()
            },
        );
        assert_eq!(card.mistake_count, 0);
        assert!(close(card.final_speed_wpm, 60.0));
        assert_eq!(card.marks, MarksTier::Marks(25));
    }

    #[test]
    fn multibyte_text_is_compared_by_character() {
        let card = score("नमस्ते दुनिया", "नमस्ते", 1.0, &ScoringConfig::default());
        assert_eq!(card.mistake_count, 0);
        assert!(close(card.gross_speed_wpm, "नमस्ते".chars().count() as f64 / 5.0));
    }
}
