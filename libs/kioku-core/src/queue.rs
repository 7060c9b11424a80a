//! Review-queue assembly.
//!
//! Given the merged card set for a chapter, partitions cards into due and
//! new, applies the daily new-card budget, and produces a shuffled
//! processing order. Ordering within a partition carries no priority
//! semantics beyond "due now", so both partitions and the combined queue
//! are shuffled uniformly to avoid two visible blocks.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::StudyCard;

/// Number of days a chapter is expected to take at the default limit.
pub const TARGET_DAYS: usize = 3;

/// Result of assembling a review queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePlan {
    /// Card ids in front-to-back processing order. Empty means the session
    /// is complete.
    pub order: Vec<String>,
    /// Earliest upcoming review among cards scheduled past `now`, for
    /// user-facing "come back at" messaging. `None` when nothing is
    /// scheduled ahead.
    pub next_due_at: Option<i64>,
}

/// Default daily new-card limit for a chapter: `ceil(size / TARGET_DAYS)`,
/// at least 1. Derived once per chapter from its static card count; an
/// externally supplied preference overrides it.
pub fn default_daily_limit(chapter_size: usize) -> u32 {
    chapter_size.div_ceil(TARGET_DAYS).max(1) as u32
}

/// Assemble the processing order for one session pass.
///
/// Cards that are neither due nor new (scheduled in the future) are
/// excluded. At most `daily_limit - already_served_today` new cards are
/// admitted, applied after the new partition is shuffled.
pub fn assemble<R: Rng + ?Sized>(
    cards: &[StudyCard],
    daily_limit: u32,
    already_served_today: u32,
    now_ms: i64,
    rng: &mut R,
) -> QueuePlan {
    let mut due: Vec<&str> = Vec::new();
    let mut fresh: Vec<&str> = Vec::new();

    for card in cards {
        if card.is_due(now_ms) {
            due.push(card.id());
        } else if card.is_new() {
            fresh.push(card.id());
        }
    }

    due.shuffle(rng);
    fresh.shuffle(rng);

    let budget = daily_limit.saturating_sub(already_served_today) as usize;
    fresh.truncate(budget);

    let mut order: Vec<String> = due
        .into_iter()
        .chain(fresh)
        .map(str::to_string)
        .collect();
    order.shuffle(rng);

    QueuePlan {
        order,
        next_due_at: next_due_at(cards, now_ms),
    }
}

/// Minimum `next_review` strictly in the future, across all cards.
pub fn next_due_at(cards: &[StudyCard], now_ms: i64) -> Option<i64> {
    cards
        .iter()
        .filter_map(|c| c.progress.as_ref())
        .map(|p| p.next_review)
        .filter(|&t| t > now_ms)
        .min()
}
