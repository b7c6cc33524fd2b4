// src/models/attempt.rs

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{
    ScoreCard,
    marks::{MarksTier, TierRounding},
};

/// One completed exam attempt, as stored in the ledger.
/// Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Student identifier. Unique per ledger under the configured name matching.
    pub name: String,

    pub category: String,

    /// Words per minute before the mistake penalty.
    pub gross_speed_wpm: f64,

    /// `max(gross_speed_wpm - mistake_count, 0)`.
    pub final_speed_wpm: f64,

    pub mistake_count: u32,

    pub marks: MarksTier,

    pub created_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Builds the stored form of a score.
    ///
    /// Speeds are kept to two decimals and the timestamp to whole seconds so
    /// the record survives an export and re-import unchanged. Marks are looked
    /// up again from the stored final speed, so they always agree with it.
    pub fn from_score(
        name: impl Into<String>,
        category: impl Into<String>,
        card: &ScoreCard,
        rounding: TierRounding,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        let final_speed_wpm = round_speed(card.final_speed_wpm);
        Self {
            name: name.into(),
            category: category.into(),
            gross_speed_wpm: round_speed(card.gross_speed_wpm),
            final_speed_wpm,
            mistake_count: card.mistake_count,
            marks: MarksTier::for_speed(final_speed_wpm, rounding),
            created_at: created_at.map(|at| at.trunc_subsecs(0)),
        }
    }
}

/// Rounds a speed to two decimal places.
pub fn round_speed(wpm: f64) -> f64 {
    (wpm * 100.0).round() / 100.0
}

/// Outcome of importing a results file into the ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    /// Rows whose name was already present.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ScoringConfig, score};

    #[test]
    fn marks_follow_the_stored_speed() {
        // 150 chars in 30/29.996 minutes: final speed 29.996, stored as 30.00
        let text = "a".repeat(150);
        let config = ScoringConfig::default();
        let card = score(&text, &text, 30.0 / 29.996, &config);
        assert!(card.final_speed_wpm < 30.0);
        assert_eq!(card.marks, MarksTier::Disqualify);

        for rounding in [TierRounding::Truncate, TierRounding::Exact] {
            let record = AttemptRecord::from_score("Asha", "25 WPM", &card, rounding, None);
            assert_eq!(record.final_speed_wpm, 30.0);
            assert_eq!(record.marks, MarksTier::Marks(10));
            assert_eq!(
                record.marks,
                MarksTier::for_speed(record.final_speed_wpm, rounding)
            );
        }
    }

    #[test]
    fn timestamps_drop_subseconds() {
        let card = score("abc", "abc", 1.0, &ScoringConfig::default());
        let at = DateTime::parse_from_rfc3339("2026-03-01T09:30:00.750Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = AttemptRecord::from_score("Asha", "10 WPM", &card, TierRounding::Truncate, Some(at));
        assert_eq!(
            record.created_at.unwrap().to_rfc3339(),
            "2026-03-01T09:30:00+00:00"
        );
    }
}
