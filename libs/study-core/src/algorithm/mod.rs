//! Spaced repetition scheduling.

pub mod sm2;

use crate::types::{CardState, Rating};
use chrono::{DateTime, Utc};

pub use sm2::{DueRule, IntervalRule, Sm2, Transition, MAX_INTERVAL_DAYS, TRANSITIONS};

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate next review state after a review. The returned state's
    /// `due_at` is always set.
    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> CardState;

    /// Initial state for a new card.
    fn initial_state(&self) -> CardState;
}
