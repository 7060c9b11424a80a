//! Request-body fixtures.

use serde_json::{json, Value};

/// A well-formed progress document for `card_id`.
pub fn valid_progress(card_id: &str) -> Value {
    json!({
        "cardId": card_id,
        "easeFactor": 2.5,
        "repetitions": 1,
        "lastInterval": 1.0,
        "isLearning": false,
        "learningStepIndex": 0,
        "nextReview": 1_700_000_000_000_i64,
    })
}

/// A complete review-write request body.
pub fn review_write_request(chapter_id: &str, card_id: &str, progress: Value) -> Value {
    json!({
        "chapterId": chapter_id,
        "cardId": card_id,
        "progress": progress,
    })
}
