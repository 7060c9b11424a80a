//! Study-session state machine.
//!
//! `StudySession` owns the merged card set, the review queue, and the
//! position/flip/submission state for one (learner, chapter) pairing. It is
//! a deterministic state container: every transition is a plain method over
//! explicit inputs (`now` included), so the whole machine unit-tests without
//! an I/O harness. The asynchronous parts — subscription, writes, the
//! periodic clock — live in [`crate::manager`].

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use kioku_core::queue;
use kioku_core::types::{CardContent, CardProgress, Score, StudyCard};
use kioku_core::Scheduler;

use crate::error::SessionError;

/// Session lifecycle states.
///
/// `Complete` is terminal for the session instance; `Failed` exits only via
/// a fresh session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Active { flipped: bool },
    Submitting,
    Complete,
    Failed,
}

impl SessionPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Active { .. } => "active",
            Self::Submitting => "submitting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// State captured by [`StudySession::begin_review`] for the duration of the
/// asynchronous write.
#[derive(Debug, Clone)]
pub struct ReviewTicket {
    pub card_id: String,
    pub score: Score,
    pub updated: CardProgress,
    /// Whether this review moved `repetitions` from 0 to positive, which is
    /// the transition that counts against the daily new-card budget.
    pub counts_as_new: bool,
}

/// One learner's study pass through one chapter.
pub struct StudySession {
    user_id: String,
    chapter_id: String,
    content: Vec<CardContent>,
    scheduler: Scheduler,

    progress: HashMap<String, CardProgress>,
    phase: SessionPhase,
    queue: Vec<String>,
    current_index: usize,
    repeat_queue: VecDeque<String>,
    new_cards_served_today: u32,
    daily_limit: u32,
    next_due_at: Option<i64>,
    now_ms: i64,
    snapshot_seen: bool,
    last_error: Option<String>,
    rng: StdRng,
}

impl StudySession {
    /// Create a session, failing fast when the chapter id, user id, or deck
    /// content is missing. Validation failures are logged and produce no
    /// session state.
    pub fn new(
        user_id: impl Into<String>,
        chapter_id: impl Into<String>,
        content: Vec<CardContent>,
        scheduler: Scheduler,
    ) -> Result<Self, SessionError> {
        let user_id = user_id.into();
        let chapter_id = chapter_id.into();

        let missing = if user_id.trim().is_empty() {
            Some("user id")
        } else if chapter_id.trim().is_empty() {
            Some("chapter id")
        } else if content.is_empty() {
            Some("deck content")
        } else {
            None
        };
        if let Some(field) = missing {
            warn!(%chapter_id, "refusing to start session: missing {field}");
            return Err(SessionError::MissingInput(field));
        }

        let daily_limit = queue::default_daily_limit(content.len());
        Ok(Self {
            user_id,
            chapter_id,
            content,
            scheduler,
            progress: HashMap::new(),
            phase: SessionPhase::Idle,
            queue: Vec::new(),
            current_index: 0,
            repeat_queue: VecDeque::new(),
            new_cards_served_today: 0,
            daily_limit,
            next_due_at: None,
            now_ms: 0,
            snapshot_seen: false,
            last_error: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Begin loading: clears per-session counters and waits for the first
    /// snapshot. Called by the manager once the subscription is established.
    pub fn start(&mut self, now_ms: i64) {
        self.phase = SessionPhase::Loading;
        self.queue.clear();
        self.current_index = 0;
        self.repeat_queue.clear();
        self.new_cards_served_today = 0;
        self.now_ms = now_ms;
        self.last_error = None;
        debug!(chapter = %self.chapter_id, "session loading");
    }

    /// Override the chapter-derived daily limit with an authoritative
    /// preference value.
    pub fn set_daily_limit(&mut self, limit: u32) {
        self.daily_limit = limit;
    }

    /// Reseed the shuffle source for reproducible queue orders.
    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn new_cards_served_today(&self) -> u32 {
        self.new_cards_served_today
    }

    /// Earliest upcoming review, surfaced for "come back at" messaging once
    /// the session completes.
    pub fn next_due_at(&self) -> Option<i64> {
        self.next_due_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_card_id(&self) -> Option<&str> {
        self.queue.get(self.current_index).map(String::as_str)
    }

    /// Current card content merged with its progress, for the UI to render.
    pub fn current_card(&self) -> Option<StudyCard> {
        let id = self.current_card_id()?;
        let content = self.content.iter().find(|c| c.id == id)?.clone();
        Some(StudyCard {
            progress: self.progress.get(id).cloned(),
            content,
        })
    }

    /// Merge one delivered snapshot.
    ///
    /// While the session has not yet activated, the first merge assembles
    /// the queue. A snapshot that lands during `Submitting` rebuilds the
    /// queue in place (the race guard in [`Self::finish_review`] re-checks
    /// the current card afterwards); snapshots during `Active` only merge,
    /// leaving the visible queue alone.
    pub fn apply_snapshot(&mut self, docs: Vec<CardProgress>, now_ms: i64) {
        self.now_ms = now_ms;
        for doc in docs {
            self.progress.insert(doc.card_id.clone(), doc);
        }
        self.snapshot_seen = true;

        match self.phase {
            SessionPhase::Loading => self.assemble(),
            SessionPhase::Submitting => self.rebuild_queue(),
            _ => {}
        }
    }

    /// Refresh the "now" reference used for due-date comparisons. Driven by
    /// the manager's periodic timer; a pending first snapshot is assembled
    /// here if it arrived before `start`.
    pub fn tick(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
        if self.phase == SessionPhase::Loading && self.snapshot_seen {
            self.assemble();
        }
    }

    /// `Active(flipped: false) -> Active(flipped: true)`; no-op otherwise.
    pub fn flip_card(&mut self) {
        if self.phase == (SessionPhase::Active { flipped: false }) {
            self.phase = SessionPhase::Active { flipped: true };
        }
    }

    /// Score the current card and enter `Submitting`.
    ///
    /// Only valid with the answer revealed; further review input is rejected
    /// until the in-flight write resolves.
    pub fn begin_review(&mut self, score: Score, now_ms: i64) -> Result<ReviewTicket, SessionError> {
        if self.phase != (SessionPhase::Active { flipped: true }) {
            return Err(SessionError::InvalidPhase {
                action: "review submission",
                phase: self.phase.name(),
            });
        }
        let card_id = self
            .current_card_id()
            .ok_or(SessionError::InvalidPhase {
                action: "review submission",
                phase: "active without a current card",
            })?
            .to_string();

        self.now_ms = now_ms;
        let current = self
            .progress
            .get(&card_id)
            .cloned()
            .unwrap_or_else(|| self.scheduler.initial_progress(&card_id));
        let updated = self.scheduler.review(&current, score, now_ms);
        let counts_as_new = current.repetitions == 0 && updated.repetitions > 0;

        self.phase = SessionPhase::Submitting;
        Ok(ReviewTicket {
            card_id,
            score,
            updated,
            counts_as_new,
        })
    }

    /// Apply an acknowledged write.
    ///
    /// Race guard: if the current card id no longer matches the one captured
    /// before the write began, a concurrent mutation altered the queue — the
    /// stale advancement is discarded and the queue fully reassembled.
    pub fn finish_review(&mut self, ticket: ReviewTicket, now_ms: i64) {
        if self.phase != SessionPhase::Submitting {
            // The session moved on (e.g. failed subscription); the write
            // result is ignored.
            debug!(card = %ticket.card_id, phase = self.phase.name(), "discarding review result");
            return;
        }
        self.now_ms = now_ms;
        self.progress
            .insert(ticket.card_id.clone(), ticket.updated.clone());
        if ticket.counts_as_new {
            self.new_cards_served_today += 1;
        }
        self.last_error = None;

        if self.current_card_id() != Some(ticket.card_id.as_str()) {
            warn!(card = %ticket.card_id, "queue changed during write; reassembling");
            self.assemble();
            return;
        }

        if ticket.score == Score::Again {
            self.push_repeat(ticket.card_id);
        }
        self.current_index += 1;
        if self.current_index >= self.queue.len() {
            self.drain_repeats();
        }

        if self.current_index >= self.queue.len() {
            self.next_due_at = queue::next_due_at(&self.study_cards(), self.now_ms);
            self.phase = SessionPhase::Complete;
            debug!(chapter = %self.chapter_id, "session complete");
        } else {
            self.phase = SessionPhase::Active { flipped: false };
        }
    }

    /// A failed write: surface the error and return to the flipped card so
    /// the learner may retry. Queue position is untouched.
    pub fn fail_review(&mut self, message: impl Into<String>) {
        if self.phase == SessionPhase::Submitting {
            self.phase = SessionPhase::Active { flipped: true };
        }
        self.last_error = Some(message.into());
    }

    /// The remote subscription died; no partial queue is shown.
    pub fn fail_subscription(&mut self, message: impl Into<String>) {
        if self.phase != SessionPhase::Complete {
            self.phase = SessionPhase::Failed;
        }
        self.last_error = Some(message.into());
    }

    fn study_cards(&self) -> Vec<StudyCard> {
        self.content
            .iter()
            .map(|c| StudyCard {
                progress: self.progress.get(&c.id).cloned(),
                content: c.clone(),
            })
            .collect()
    }

    /// Rebuild the queue from the merged card set without touching the
    /// phase.
    fn rebuild_queue(&mut self) {
        let cards = self.study_cards();
        let plan = queue::assemble(
            &cards,
            self.daily_limit,
            self.new_cards_served_today,
            self.now_ms,
            &mut self.rng,
        );
        self.next_due_at = plan.next_due_at;
        self.queue = plan.order;
        self.current_index = 0;
        // Entries already pending in the fresh queue must not repeat.
        let queue = &self.queue;
        self.repeat_queue.retain(|id| !queue.contains(id));
        if self.queue.is_empty() {
            self.drain_repeats();
        }
    }

    fn assemble(&mut self) {
        self.rebuild_queue();
        self.phase = if self.queue.is_empty() {
            SessionPhase::Complete
        } else {
            SessionPhase::Active { flipped: false }
        };
    }

    fn push_repeat(&mut self, card_id: String) {
        let pending_ahead = self.queue[self.current_index + 1..].contains(&card_id)
            || self.repeat_queue.contains(&card_id);
        if !pending_ahead {
            self.repeat_queue.push_back(card_id);
        }
    }

    /// Replay failed cards in FIFO order, bypassing the shuffle.
    fn drain_repeats(&mut self) {
        while let Some(id) = self.repeat_queue.pop_front() {
            if !self.queue[self.current_index.min(self.queue.len())..].contains(&id) {
                self.queue.push(id);
            }
        }
    }
}
