//! Simplified SM-2 scheduling.
//!
//! Every rating maps to one row of [`TRANSITIONS`]; the row is applied the
//! same way whatever state the card is currently in.

use super::SpacedRepetitionAlgorithm;
use crate::types::{CardState, CardStatus, Rating, MINIMUM_EASE};
use chrono::{DateTime, Duration, Utc};

/// Longest interval a card can reach, about a hundred years.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// How the next interval is derived from the current one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalRule {
    /// Interval drops to zero.
    Reset,
    /// `max(floor, round(interval * factor))`.
    Scale { factor: f64, floor: u32 },
    /// `first` when the interval is zero, else `round(interval * ease + bonus)`.
    Grow { first: u32, bonus: f64 },
}

impl IntervalRule {
    /// Next interval, never above [`MAX_INTERVAL_DAYS`].
    pub fn apply(&self, interval: u32, ease: f64) -> u32 {
        let days = match *self {
            Self::Reset => 0,
            Self::Scale { factor, floor } => round_days(interval as f64 * factor).max(floor),
            Self::Grow { first, bonus } => {
                if interval == 0 {
                    first
                } else {
                    round_days(interval as f64 * ease + bonus)
                }
            }
        };
        days.min(MAX_INTERVAL_DAYS)
    }
}

/// When the card comes due again, relative to the review instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueRule {
    Minutes(i64),
    Days(i64),
    /// Due after the freshly computed interval.
    Interval,
}

impl DueRule {
    pub fn offset(&self, interval: u32) -> Duration {
        match *self {
            Self::Minutes(m) => Duration::minutes(m),
            Self::Days(d) => Duration::days(d),
            Self::Interval => Duration::days(i64::from(interval.min(MAX_INTERVAL_DAYS))),
        }
    }

    /// `now` plus the offset, saturating at the latest representable instant.
    pub fn due_from(&self, now: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
        now.checked_add_signed(self.offset(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// One row of the rating table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub ease_delta: f64,
    pub interval: IntervalRule,
    pub next_status: CardStatus,
    pub due: DueRule,
    pub counts_lapse: bool,
}

/// Rating table, indexed by [`Rating::to_value`].
pub const TRANSITIONS: [Transition; 4] = [
    // Again
    Transition {
        ease_delta: -0.3,
        interval: IntervalRule::Reset,
        next_status: CardStatus::Relearning,
        due: DueRule::Minutes(10),
        counts_lapse: true,
    },
    // Hard
    Transition {
        ease_delta: -0.2,
        interval: IntervalRule::Scale {
            factor: 0.5,
            floor: 1,
        },
        next_status: CardStatus::Learning,
        due: DueRule::Days(1),
        counts_lapse: false,
    },
    // Good
    Transition {
        ease_delta: 0.0,
        interval: IntervalRule::Grow {
            first: 1,
            bonus: 0.0,
        },
        next_status: CardStatus::Review,
        due: DueRule::Interval,
        counts_lapse: false,
    },
    // Easy
    Transition {
        ease_delta: 0.1,
        interval: IntervalRule::Grow {
            first: 2,
            bonus: 1.0,
        },
        next_status: CardStatus::Review,
        due: DueRule::Interval,
        counts_lapse: false,
    },
];

fn round_days(value: f64) -> u32 {
    // Intervals never go negative; clamp before the cast.
    value.round().max(0.0) as u32
}

/// SM-2 variant driven by a rating table.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub table: [Transition; 4],
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: crate::types::INITIAL_EASE,
            minimum_ease: MINIMUM_EASE,
            table: TRANSITIONS,
        }
    }
}

impl Sm2 {
    /// Table row for a rating.
    pub fn transition(&self, rating: Rating) -> &Transition {
        &self.table[rating.to_value() as usize]
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self) -> CardState {
        CardState {
            ease_factor: self.initial_ease,
            ..Default::default()
        }
    }

    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> CardState {
        let row = self.transition(rating);

        let ease_factor = (state.ease_factor + row.ease_delta).max(self.minimum_ease);
        let interval_days = row.interval.apply(state.interval_days, ease_factor);

        CardState {
            status: row.next_status,
            interval_days,
            ease_factor,
            reps: state.reps.saturating_add(1),
            lapses: state.lapses.saturating_add(u32::from(row.counts_lapse)),
            due_at: Some(row.due.due_from(now, interval_days)),
            introduced_on: state.introduced_on,
            last_reviewed_at: Some(now),
            last_rating: Some(rating),
        }
    }
}
