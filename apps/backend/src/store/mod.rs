//! Record stores consumed by the engine.
//!
//! Every write that can race is expressed as a compare-and-swap or as an
//! atomic upsert; no store method holds a lock across calls.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{CardId, CardRecord, Counter, DailyProgress, NewCard, UserId};

pub use memory::MemoryStore;

/// Per-card scheduling state.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Card owned by `user`, deleted or not.
    async fn get_card(&self, user: UserId, id: CardId) -> Result<Option<CardRecord>>;

    /// Non-deleted cards with `due_at <= now`, oldest due first.
    async fn due_cards(&self, user: UserId, now: DateTime<Utc>, limit: u32)
        -> Result<Vec<CardRecord>>;

    /// Never-introduced new cards, oldest first.
    async fn new_candidates(&self, user: UserId, limit: u32) -> Result<Vec<CardRecord>>;

    /// Replace the card's scheduling state if its version is still
    /// `expected_version`. Returns the stored record, or `None` if another
    /// writer got there first.
    async fn compare_and_swap(
        &self,
        expected_version: i64,
        card: &CardRecord,
    ) -> Result<Option<CardRecord>>;

    /// Set `introduced_on` on the given cards that are still new candidates,
    /// in one write. Returns the ids actually marked.
    async fn mark_introduced(
        &self,
        user: UserId,
        ids: &[CardId],
        day: NaiveDate,
    ) -> Result<Vec<CardId>>;

    /// Insert all drafts in one write, silently dropping any whose content
    /// hash already exists for the user. Returns the inserted records.
    async fn insert_ignoring_duplicates(
        &self,
        user: UserId,
        drafts: &[NewCard],
        now: DateTime<Utc>,
    ) -> Result<Vec<CardRecord>>;
}

/// One progress row per (user, day).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read without creating.
    async fn get_progress(&self, user: UserId, day: NaiveDate) -> Result<Option<DailyProgress>>;

    /// Read, creating a zeroed row if none exists.
    async fn ensure_progress(&self, user: UserId, day: NaiveDate) -> Result<DailyProgress>;

    /// Set `counter` to `next` only if it still equals `expected`.
    async fn compare_and_set(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        expected: u32,
        next: u32,
    ) -> Result<bool>;

    /// Atomically add `delta` to whatever the counter currently holds.
    async fn add_to_counter(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        delta: u32,
    ) -> Result<DailyProgress>;

    async fn set_goal_override(
        &self,
        user: UserId,
        day: NaiveDate,
        value: Option<u32>,
    ) -> Result<DailyProgress>;
}

/// Stored results of idempotent requests, as serialized JSON.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get_result(&self, user: UserId, key: &str) -> Result<Option<String>>;

    /// Store a result. Returns `false` if the key already had one; the
    /// existing result is kept.
    async fn put_result(&self, user: UserId, key: &str, body: &str) -> Result<bool>;
}
