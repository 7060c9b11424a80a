//! Core types for the study scheduler.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// Lower bound on the ease factor, per SM-2.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Self-assessed review outcome.
///
/// The canonical scoring convention is the four-button Anki mapping; each
/// button corresponds to a fixed SM-2 quality (`Again=1, Hard=3, Good=4,
/// Easy=5`). A raw 0-5 quality can be folded onto the buttons with
/// [`Score::from_quality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Again,
    Hard,
    Good,
    Easy,
}

impl Score {
    /// SM-2 quality value (0-5 scale) for this score.
    pub fn quality(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 3,
            Self::Good => 4,
            Self::Easy => 5,
        }
    }

    /// Fold a raw 0-5 quality value onto the four buttons.
    ///
    /// Qualities below 3 fail per SM-2, so they all map to `Again`.
    pub fn from_quality(quality: u8) -> Self {
        match quality {
            0..=2 => Self::Again,
            3 => Self::Hard,
            4 => Self::Good,
            _ => Self::Easy,
        }
    }

    /// Whether this score counts as a successful recall (`q >= 3`).
    pub fn is_passing(self) -> bool {
        self.quality() >= 3
    }
}

/// Per-card scheduling state, one document per card per learner per chapter.
///
/// Field names serialize in camelCase so a document round-trips unchanged
/// through the review-write endpoint and the subscription contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    pub card_id: String,
    pub ease_factor: f64,
    pub repetitions: u32,
    /// Interval in days that produced the current `next_review`.
    pub last_interval: f64,
    /// Whether the card is still on the learning-step ladder.
    pub is_learning: bool,
    /// Index into the learning-step ladder; meaningful only while learning.
    pub learning_step_index: usize,
    /// Epoch milliseconds; `0` means never reviewed.
    pub next_review: i64,
}

impl CardProgress {
    /// Validate the ranges the write boundary must enforce.
    ///
    /// `repetitions` being a non-negative integer is already guaranteed by
    /// the type; the remaining checks mirror the endpoint contract.
    pub fn validate(&self) -> Result<(), ProgressError> {
        if self.card_id.trim().is_empty() {
            return Err(ProgressError::MissingCardId);
        }
        if self.ease_factor < MIN_EASE_FACTOR {
            return Err(ProgressError::EaseFactorBelowMinimum {
                min: MIN_EASE_FACTOR,
                got: self.ease_factor,
            });
        }
        if self.last_interval < 0.0 {
            return Err(ProgressError::NegativeInterval(self.last_interval));
        }
        if self.next_review < 0 {
            return Err(ProgressError::NegativeNextReview(self.next_review));
        }
        Ok(())
    }

    /// Next review moment as UTC, or `None` for a never-reviewed card.
    pub fn next_review_utc(&self) -> Option<DateTime<Utc>> {
        if self.next_review == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.next_review).single()
    }
}

/// Static card content, owned by the deck loader and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    pub id: String,
    /// Front of the card (e.g. the kanji).
    pub prompt: String,
    /// Pronunciation hint (e.g. romaji).
    pub phonetic: String,
    /// Gloss shown on the back.
    pub meaning: String,
}

/// A card's static content merged read-only with its scheduling state.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCard {
    pub content: CardContent,
    pub progress: Option<CardProgress>,
}

impl StudyCard {
    pub fn id(&self) -> &str {
        &self.content.id
    }

    /// Never reviewed: no progress document, or an initializer that was
    /// persisted without a completed review.
    pub fn is_new(&self) -> bool {
        match &self.progress {
            None => true,
            Some(p) => p.next_review == 0 && p.repetitions == 0,
        }
    }

    /// Scheduled and past due relative to `now_ms`.
    pub fn is_due(&self, now_ms: i64) -> bool {
        match &self.progress {
            Some(p) => p.next_review != 0 && p.next_review <= now_ms,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn progress(id: &str) -> CardProgress {
        CardProgress {
            card_id: id.to_string(),
            ease_factor: 2.5,
            repetitions: 0,
            last_interval: 0.0,
            is_learning: true,
            learning_step_index: 0,
            next_review: 0,
        }
    }

    #[test]
    fn score_quality_mapping() {
        assert_eq!(Score::Again.quality(), 1);
        assert_eq!(Score::Hard.quality(), 3);
        assert_eq!(Score::Good.quality(), 4);
        assert_eq!(Score::Easy.quality(), 5);
    }

    #[test]
    fn failing_qualities_fold_to_again() {
        assert_eq!(Score::from_quality(0), Score::Again);
        assert_eq!(Score::from_quality(2), Score::Again);
        assert_eq!(Score::from_quality(3), Score::Hard);
        assert_eq!(Score::from_quality(5), Score::Easy);
        assert!(!Score::Again.is_passing());
        assert!(Score::Hard.is_passing());
    }

    #[test]
    fn validate_rejects_low_ease() {
        let mut p = progress("a");
        p.ease_factor = 1.29;
        assert_eq!(
            p.validate(),
            Err(ProgressError::EaseFactorBelowMinimum { min: MIN_EASE_FACTOR, got: 1.29 })
        );
    }

    #[test]
    fn validate_rejects_blank_id_and_negative_fields() {
        let mut p = progress("  ");
        assert_eq!(p.validate(), Err(ProgressError::MissingCardId));

        p = progress("a");
        p.last_interval = -1.0;
        assert!(matches!(p.validate(), Err(ProgressError::NegativeInterval(_))));

        p = progress("a");
        p.next_review = -5;
        assert!(matches!(p.validate(), Err(ProgressError::NegativeNextReview(_))));
    }

    #[test]
    fn progress_serializes_camel_case() {
        let json = serde_json::to_value(progress("k-01")).unwrap();
        assert_eq!(json["cardId"], "k-01");
        assert_eq!(json["easeFactor"], 2.5);
        assert_eq!(json["isLearning"], true);
        assert_eq!(json["learningStepIndex"], 0);
        assert_eq!(json["nextReview"], 0);
    }

    #[test]
    fn progress_round_trips_through_document_form() {
        let doc = serde_json::json!({
            "cardId": "k-07",
            "easeFactor": 2.36,
            "repetitions": 3,
            "lastInterval": 15.0,
            "isLearning": false,
            "learningStepIndex": 0,
            "nextReview": 1_700_000_000_000_i64,
        });
        let parsed: CardProgress = serde_json::from_value(doc).unwrap();
        assert_eq!(parsed.ease_factor, 2.36);
        assert_eq!(parsed.repetitions, 3);
        assert_eq!(parsed.next_review, 1_700_000_000_000);

        let back = serde_json::to_value(&parsed).unwrap();
        let again: CardProgress = serde_json::from_value(back).unwrap();
        assert_eq!(again, parsed);
    }

    #[test]
    fn unseen_card_is_new_not_due() {
        let card = StudyCard {
            content: CardContent {
                id: "k-01".into(),
                prompt: "水".into(),
                phonetic: "mizu".into(),
                meaning: "water".into(),
            },
            progress: Some(progress("k-01")),
        };
        assert!(card.is_new());
        assert!(!card.is_due(1_700_000_000_000));
    }
}
