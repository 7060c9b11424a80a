//! SM-2 scheduler with Anki-style learning steps.
//!
//! New and lapsed cards climb a short ladder of fixed delays before entering
//! full spaced review:
//!
//! - `Again` restarts the ladder at step 0
//! - `Hard` repeats the current rung with an extended delay
//! - `Good` advances a rung, graduating once the ladder is exhausted
//! - `Easy` graduates immediately with a longer first interval
//!
//! Graduated cards follow SM-2: a failing score (`q < 3`) lapses the card
//! back to learning step 0; a passing score grows the interval according to
//! the ease factor and repetition count. The ease-factor update runs on
//! every review regardless of outcome.

use crate::types::{CardProgress, Score, MIN_EASE_FACTOR};

const MINUTE_MS: i64 = 60 * 1000;
const DAY_MS: i64 = 24 * 60 * MINUTE_MS;

/// SM-2 scheduler with configurable parameters.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    /// Learning-step ladder, delays in minutes.
    pub learning_steps_min: Vec<u32>,
    /// Delay multiplier when repeating a rung on `Hard`.
    pub hard_step_multiplier: f64,
    /// First interval after graduating via `Good`, in days.
    pub graduating_interval_days: f64,
    /// First interval after graduating via `Easy`, in days.
    pub easy_interval_days: f64,
    /// Interval for the second consecutive successful review, in days.
    pub second_interval_days: f64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            minimum_ease: MIN_EASE_FACTOR,
            learning_steps_min: vec![10, 60],
            hard_step_multiplier: 1.2,
            graduating_interval_days: 1.0,
            easy_interval_days: 4.0,
            second_interval_days: 6.0,
        }
    }
}

impl Scheduler {
    /// The "unseen" state a card holds before its first review.
    ///
    /// `next_review == 0` classifies the card as new, never as due.
    pub fn initial_progress(&self, card_id: impl Into<String>) -> CardProgress {
        CardProgress {
            card_id: card_id.into(),
            ease_factor: self.initial_ease,
            repetitions: 0,
            last_interval: 0.0,
            is_learning: true,
            learning_step_index: 0,
            next_review: 0,
        }
    }

    /// Compute the state after one review. Pure; never mutates the input.
    pub fn review(&self, current: &CardProgress, score: Score, now_ms: i64) -> CardProgress {
        let ease_factor = self.next_ease(current.ease_factor, score);

        if current.is_learning {
            self.review_learning(current, score, ease_factor, now_ms)
        } else {
            self.review_graduated(current, score, ease_factor, now_ms)
        }
    }

    /// SM-2 ease update: `ef + (0.1 - (5-q)(0.08 + (5-q)*0.02))`, rounded to
    /// two decimals, floored at the minimum.
    fn next_ease(&self, ease: f64, score: Score) -> f64 {
        let q = f64::from(score.quality().min(5));
        let raw = ease + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
        round2(raw).max(self.minimum_ease)
    }

    fn review_learning(
        &self,
        current: &CardProgress,
        score: Score,
        ease_factor: f64,
        now_ms: i64,
    ) -> CardProgress {
        let step = current
            .learning_step_index
            .min(self.learning_steps_min.len().saturating_sub(1));

        match score {
            Score::Again => self.at_step(current, ease_factor, 0, self.step_delay_min(0), now_ms),
            Score::Hard => {
                let delay = (f64::from(self.step_delay_min(step)) * self.hard_step_multiplier)
                    .round() as u32;
                self.at_step(current, ease_factor, step, delay, now_ms)
            }
            Score::Good => {
                let next_step = step + 1;
                if next_step < self.learning_steps_min.len() {
                    self.at_step(current, ease_factor, next_step, self.step_delay_min(next_step), now_ms)
                } else {
                    self.graduate(current, ease_factor, self.graduating_interval_days, now_ms)
                }
            }
            Score::Easy => self.graduate(current, ease_factor, self.easy_interval_days, now_ms),
        }
    }

    fn review_graduated(
        &self,
        current: &CardProgress,
        score: Score,
        ease_factor: f64,
        now_ms: i64,
    ) -> CardProgress {
        if !score.is_passing() {
            // Lapse: back onto the ladder with a bounded delay, never "now".
            return CardProgress {
                repetitions: 0,
                last_interval: 0.0,
                is_learning: true,
                ..self.at_step(current, ease_factor, 0, self.step_delay_min(0), now_ms)
            };
        }

        let repetitions = current.repetitions + 1;
        let interval_days = match repetitions {
            1 => self.graduating_interval_days,
            2 => self.second_interval_days,
            _ => (current.last_interval.max(1.0) * ease_factor).round(),
        };

        CardProgress {
            card_id: current.card_id.clone(),
            ease_factor,
            repetitions,
            last_interval: interval_days,
            is_learning: false,
            learning_step_index: 0,
            next_review: now_ms + (interval_days * DAY_MS as f64) as i64,
        }
    }

    fn step_delay_min(&self, step: usize) -> u32 {
        self.learning_steps_min.get(step).copied().unwrap_or(10)
    }

    fn at_step(
        &self,
        current: &CardProgress,
        ease_factor: f64,
        step: usize,
        delay_min: u32,
        now_ms: i64,
    ) -> CardProgress {
        CardProgress {
            card_id: current.card_id.clone(),
            ease_factor,
            repetitions: current.repetitions,
            last_interval: current.last_interval,
            is_learning: true,
            learning_step_index: step,
            next_review: now_ms + i64::from(delay_min) * MINUTE_MS,
        }
    }

    fn graduate(
        &self,
        current: &CardProgress,
        ease_factor: f64,
        interval_days: f64,
        now_ms: i64,
    ) -> CardProgress {
        CardProgress {
            card_id: current.card_id.clone(),
            ease_factor,
            repetitions: 1,
            last_interval: interval_days,
            is_learning: false,
            learning_step_index: 0,
            next_review: now_ms + (interval_days * DAY_MS as f64) as i64,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_700_000_000_000;

    fn scheduler() -> Scheduler {
        Scheduler::default()
    }

    #[test]
    fn initial_progress_is_new() {
        let p = scheduler().initial_progress("k-01");
        assert_eq!(p.ease_factor, 2.5);
        assert_eq!(p.repetitions, 0);
        assert_eq!(p.last_interval, 0.0);
        assert!(p.is_learning);
        assert_eq!(p.learning_step_index, 0);
        assert_eq!(p.next_review, 0);
    }

    #[test]
    fn ladder_again_good_good_graduates() {
        let s = scheduler();
        let p0 = s.initial_progress("k-01");

        let p1 = s.review(&p0, Score::Again, NOW);
        assert!(p1.is_learning);
        assert_eq!(p1.learning_step_index, 0);
        assert_eq!(p1.next_review, NOW + 10 * MINUTE_MS);

        let t1 = NOW + 11 * MINUTE_MS;
        let p2 = s.review(&p1, Score::Good, t1);
        assert!(p2.is_learning);
        assert_eq!(p2.learning_step_index, 1);
        assert_eq!(p2.next_review, t1 + 60 * MINUTE_MS);

        let t2 = t1 + 61 * MINUTE_MS;
        let p3 = s.review(&p2, Score::Good, t2);
        assert!(!p3.is_learning);
        assert_eq!(p3.repetitions, 1);
        assert_eq!(p3.last_interval, 1.0);
        assert_eq!(p3.next_review, t2 + DAY_MS);
    }

    #[test]
    fn easy_graduates_immediately() {
        let s = scheduler();
        let p = s.review(&s.initial_progress("k-01"), Score::Easy, NOW);
        assert!(!p.is_learning);
        assert_eq!(p.repetitions, 1);
        assert_eq!(p.last_interval, 4.0);
        assert_eq!(p.next_review, NOW + 4 * DAY_MS);
    }

    #[test]
    fn hard_repeats_rung_with_multiplier() {
        let s = scheduler();
        let p = s.review(&s.initial_progress("k-01"), Score::Hard, NOW);
        assert!(p.is_learning);
        assert_eq!(p.learning_step_index, 0);
        // 10 minutes * 1.2
        assert_eq!(p.next_review, NOW + 12 * MINUTE_MS);
    }

    #[test]
    fn graduated_good_grows_by_ease() {
        let s = scheduler();
        let current = CardProgress {
            card_id: "k-01".into(),
            ease_factor: 2.5,
            repetitions: 2,
            last_interval: 6.0,
            is_learning: false,
            learning_step_index: 0,
            next_review: NOW - DAY_MS,
        };
        let p = s.review(&current, Score::Good, NOW);
        // q=4: ef' = 2.5 + (0.1 - 1*(0.08 + 0.02)) = 2.5
        assert_eq!(p.ease_factor, 2.5);
        assert_eq!(p.repetitions, 3);
        assert_eq!(p.last_interval, 15.0);
        assert_eq!(p.next_review, NOW + 15 * DAY_MS);
    }

    #[test]
    fn graduated_failure_lapses_to_ladder() {
        let s = scheduler();
        let current = CardProgress {
            card_id: "k-01".into(),
            ease_factor: 2.5,
            repetitions: 4,
            last_interval: 20.0,
            is_learning: false,
            learning_step_index: 0,
            next_review: NOW - DAY_MS,
        };
        let p = s.review(&current, Score::Again, NOW);
        assert!(p.is_learning);
        assert_eq!(p.repetitions, 0);
        assert_eq!(p.last_interval, 0.0);
        assert_eq!(p.learning_step_index, 0);
        // Bounded requeue delay, never immediate.
        assert_eq!(p.next_review, NOW + 10 * MINUTE_MS);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        let s = scheduler();
        let mut p = s.initial_progress("k-01");
        for _ in 0..20 {
            p = s.review(&p, Score::Again, NOW);
            assert!(p.ease_factor >= MIN_EASE_FACTOR);
        }
        assert_eq!(p.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn ease_update_rounds_to_two_decimals() {
        let s = scheduler();
        // q=3: ef' = 2.5 + (0.1 - 2*(0.08 + 2*0.02)) = 2.36
        let p = s.review(&s.initial_progress("k-01"), Score::Hard, NOW);
        assert_eq!(p.ease_factor, 2.36);
    }

    #[test]
    fn passing_intervals_are_non_decreasing() {
        let s = scheduler();
        let mut p = s.review(&s.review(&s.initial_progress("k-01"), Score::Good, NOW), Score::Good, NOW);
        assert!(!p.is_learning);

        let mut previous = p.last_interval;
        for _ in 0..12 {
            p = s.review(&p, Score::Good, p.next_review);
            assert!(p.ease_factor >= 1.0);
            assert!(p.last_interval >= previous);
            previous = p.last_interval;
        }
    }

    #[test]
    fn zero_interval_treated_as_one_day_on_tail_case() {
        let s = scheduler();
        // A graduated card whose stored interval is 0 (e.g. merged from an
        // older document) must not reschedule to "now".
        let current = CardProgress {
            card_id: "k-01".into(),
            ease_factor: 2.5,
            repetitions: 2,
            last_interval: 0.0,
            is_learning: false,
            learning_step_index: 0,
            next_review: NOW - DAY_MS,
        };
        let p = s.review(&current, Score::Easy, NOW);
        assert!(p.last_interval >= 1.0);
        assert!(p.next_review > NOW);
    }
}
