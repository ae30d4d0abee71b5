//! Core scheduling library for the study engine.
//!
//! Provides:
//! - The SM-2 rating table and scheduler
//! - Daily budget arithmetic (goal, new-card allowance)
//! - Duplicate keys for card content
//! - Day keys and shared types (CardState, Rating, DailyProgress, etc.)

pub mod algorithm;
pub mod budget;
pub mod dates;
pub mod dedup;
pub mod error;
pub mod types;

pub use algorithm::{Sm2, SpacedRepetitionAlgorithm, MAX_INTERVAL_DAYS};
pub use budget::{
    NewAllowance, QueueBudget, DEFAULT_DAILY_GOAL, DEFAULT_NEW_LIMIT, MAX_GOAL_OVERRIDE, SOFT_NEW_CAP,
};
pub use error::{Result, ValidationError};
pub use types::{
    CardState, CardStatus, Counter, DailyProgress, Eligibility, Rating, SkipReason, StudySettings,
};
