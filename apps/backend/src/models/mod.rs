//! Storage records and operation snapshots

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from study-core
pub use study_core::types::{
    CardState, CardStatus, Counter, DailyProgress, Eligibility, Rating, SkipReason, StudySettings,
};

/// Opaque card identifier.
pub type CardId = Uuid;

/// Authenticated user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a card's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Manual,
    Ai,
    Batch,
}

impl Default for Provenance {
    fn default() -> Self {
        Self::Manual
    }
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Ai => "ai",
            Self::Batch => "batch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "ai" => Some(Self::Ai),
            "batch" => Some(Self::Batch),
            _ => None,
        }
    }
}

// === Card Records ===

/// A card as held by a card store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub user_id: UserId,
    pub front: String,
    pub back: String,
    pub provenance: Provenance,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Row version, bumped on every write; the compare-and-swap guard.
    pub version: i64,
    pub state: CardState,
}

impl CardRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn eligibility(&self, now: DateTime<Utc>) -> Eligibility {
        self.state.eligibility(self.is_deleted(), now)
    }

    pub fn to_queue_item(&self) -> QueueItem {
        QueueItem {
            id: self.id,
            front: self.front.clone(),
            back: Some(self.back.clone()),
            state: self.state.status,
            due_at: self.state.due_at,
        }
    }

    pub fn to_snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            id: self.id,
            front: self.front.clone(),
            back: self.back.clone(),
            provenance: self.provenance,
            created_at: self.created_at,
            state: self.state.clone(),
        }
    }
}

/// Card content waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub id: CardId,
    pub front: String,
    pub back: String,
    pub provenance: Provenance,
    pub content_hash: String,
}

/// Card row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub front: String,
    pub back: String,
    pub provenance: String,
    pub content_hash: String,
    pub status: String,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub reps: i32,
    pub lapses: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub introduced_on: Option<NaiveDate>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub last_rating: Option<i16>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DbCard {
    /// Convert to the store-neutral record
    pub fn to_record(&self) -> CardRecord {
        CardRecord {
            id: self.id,
            user_id: UserId(self.user_id),
            front: self.front.clone(),
            back: self.back.clone(),
            provenance: Provenance::from_str(&self.provenance).unwrap_or_default(),
            content_hash: self.content_hash.clone(),
            created_at: self.created_at,
            deleted_at: self.deleted_at,
            version: self.version,
            state: CardState {
                status: CardStatus::from_str(&self.status).unwrap_or_default(),
                interval_days: self.interval_days.max(0) as u32,
                ease_factor: self.ease_factor,
                reps: self.reps.max(0) as u32,
                lapses: self.lapses.max(0) as u32,
                due_at: self.due_at,
                introduced_on: self.introduced_on,
                last_reviewed_at: self.last_reviewed_at,
                last_rating: self
                    .last_rating
                    .and_then(|r| u8::try_from(r).ok())
                    .and_then(Rating::from_value),
            },
        }
    }
}

/// Progress row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbDailyProgress {
    pub date_key: NaiveDate,
    pub reviews_done: i32,
    pub new_introduced: i32,
    pub goal_override: Option<i32>,
}

impl DbDailyProgress {
    pub fn to_core(&self) -> DailyProgress {
        DailyProgress {
            date_key: self.date_key,
            reviews_done: self.reviews_done.max(0) as u32,
            new_introduced: self.new_introduced.max(0) as u32,
            goal_override: self.goal_override.map(|g| g.max(0) as u32),
        }
    }
}

/// Settings row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbStudySettings {
    pub daily_goal: Option<i32>,
    pub new_limit: Option<i32>,
}

impl DbStudySettings {
    pub fn to_core(&self) -> StudySettings {
        StudySettings {
            daily_goal: self.daily_goal.map(|g| g.max(0) as u32),
            new_limit: self.new_limit.map(|n| n.max(0) as u32),
        }
    }
}

// === Operation Snapshots ===

/// One card in a study queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: CardId,
    pub front: String,
    pub back: Option<String>,
    pub state: CardStatus,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMeta {
    pub due_count: usize,
    pub new_selected: usize,
    pub daily_goal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyQueue {
    pub due: Vec<QueueItem>,
    pub new: Vec<QueueItem>,
    pub meta: QueueMeta,
}

/// Card as returned after a review or create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: CardId,
    pub front: String,
    pub back: String,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: CardState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoteOutcome {
    pub promoted: Vec<CardId>,
    pub remaining_allowance: u32,
}

/// Progress for one day, with the budget derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub date_key: NaiveDate,
    pub reviews_done: u32,
    pub new_introduced: u32,
    pub goal_override: Option<u32>,
    pub daily_goal: u32,
    pub remaining_for_today: u32,
    pub new_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub provenance: Provenance,
}

// Batch save types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCard {
    pub id: CardId,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub front: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSaveResult {
    pub saved: Vec<SavedCard>,
    pub skipped: Vec<SkippedItem>,
}
