//! Core scheduling library shared by the study client and backend.
//!
//! Provides:
//! - Per-card progress model and review scoring types
//! - SM-2 scheduler with Anki-style learning steps
//! - Review-queue assembly with a daily new-card limit
//! - Progress validation for the write boundary
//! - Static deck (chapter content) parsing
//!
//! Everything in this crate is pure: callers supply the current time as epoch
//! milliseconds and a random source where shuffling is required.

pub mod deck;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod types;

pub use deck::{parse_catalog, parse_deck, DeckInfo};
pub use error::{DeckError, ProgressError};
pub use queue::{assemble, default_daily_limit, QueuePlan};
pub use scheduler::Scheduler;
pub use types::{CardContent, CardProgress, Score, StudyCard, MIN_EASE_FACTOR};
