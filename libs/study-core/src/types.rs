//! Core types for the study engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lower bound for a card's ease factor.
pub const MINIMUM_EASE: f64 = 1.3;

/// Ease factor assigned to freshly created cards.
pub const INITIAL_EASE: f64 = 2.5;

/// Card scheduling status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

impl CardStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// Parse from the storage representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "review" => Some(Self::Review),
            "relearning" => Some(Self::Relearning),
            _ => None,
        }
    }
}

/// Rating given for a review, on the 0-3 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// Numeric value (0-3).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }

    /// Create from numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Again),
            1 => Some(Self::Hard),
            2 => Some(Self::Good),
            3 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Validate an untrusted rating coming from a caller.
    pub fn parse(value: i64) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .and_then(Self::from_value)
            .ok_or(ValidationError::RatingOutOfRange(value))
    }
}

/// Scheduling state of a single card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub status: CardStatus,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub reps: u32,
    pub lapses: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduced_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_rating: Option<Rating>,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            status: CardStatus::New,
            interval_days: 0,
            ease_factor: INITIAL_EASE,
            reps: 0,
            lapses: 0,
            due_at: None,
            introduced_on: None,
            last_reviewed_at: None,
            last_rating: None,
        }
    }
}

impl CardState {
    /// Derive queue eligibility. Both the queue builder and the new-card
    /// promoter go through this so they cannot disagree.
    pub fn eligibility(&self, deleted: bool, now: DateTime<Utc>) -> Eligibility {
        if deleted {
            return Eligibility::Ineligible;
        }
        match self.due_at {
            Some(due) if due <= now => Eligibility::DueCandidate,
            _ if self.is_new_candidate(false) => Eligibility::NewCandidate,
            _ => Eligibility::Ineligible,
        }
    }

    /// Never reviewed and never introduced; does not depend on the clock.
    pub fn is_new_candidate(&self, deleted: bool) -> bool {
        !deleted
            && self.status == CardStatus::New
            && self.introduced_on.is_none()
            && self.due_at.is_none()
    }
}

/// Which queue, if any, a card may appear in right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    NewCandidate,
    DueCandidate,
    Ineligible,
}

/// Per-user study settings as stored by the settings provider.
///
/// Unset fields fall back to the built-in defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_limit: Option<u32>,
}

/// Per-day progress counters for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date_key: NaiveDate,
    pub reviews_done: u32,
    pub new_introduced: u32,
    pub goal_override: Option<u32>,
}

impl DailyProgress {
    /// A fresh row for `date_key` with both counters at zero.
    pub fn empty(date_key: NaiveDate) -> Self {
        Self {
            date_key,
            reviews_done: 0,
            new_introduced: 0,
            goal_override: None,
        }
    }

    pub fn counter(&self, counter: Counter) -> u32 {
        match counter {
            Counter::ReviewsDone => self.reviews_done,
            Counter::NewIntroduced => self.new_introduced,
        }
    }

    pub fn set_counter(&mut self, counter: Counter, value: u32) {
        match counter {
            Counter::ReviewsDone => self.reviews_done = value,
            Counter::NewIntroduced => self.new_introduced = value,
        }
    }
}

/// The two monotonic counters on a progress row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    ReviewsDone,
    NewIntroduced,
}

impl Counter {
    /// Column name in storage.
    pub fn column(&self) -> &'static str {
        match self {
            Self::ReviewsDone => "reviews_done",
            Self::NewIntroduced => "new_introduced",
        }
    }
}

/// Why a batch item was not saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Duplicate,
}
