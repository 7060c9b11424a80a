//! Error types for kioku-core.

use thiserror::Error;

/// Field-level validation failures for a progress document.
///
/// Raised at the write boundary before a review is persisted; scheduling
/// itself cannot produce an invalid document.
#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("cardId must not be empty")]
    MissingCardId,

    #[error("easeFactor must be >= {min}, got {got}")]
    EaseFactorBelowMinimum { min: f64, got: f64 },

    #[error("lastInterval must be >= 0, got {0}")]
    NegativeInterval(f64),

    #[error("nextReview must be a non-negative timestamp, got {0}")]
    NegativeNextReview(i64),
}

/// Errors that can occur while loading static deck content.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("deck content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("deck contains no cards")]
    EmptyDeck,

    #[error("card at position {index} has a blank id")]
    BlankCardId { index: usize },

    #[error("duplicate card id {id}")]
    DuplicateCardId { id: String },
}
