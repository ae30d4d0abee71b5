//! In-process store for tests and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{CardStore, IdempotencyStore, ProgressStore};
use crate::error::{Result, StudyError};
use crate::models::{
    CardId, CardRecord, CardState, Counter, DailyProgress, Eligibility, NewCard, StudySettings,
    UserId,
};
use crate::services::settings::SettingsProvider;

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order doubles as creation order for equal timestamps.
    cards: Vec<CardRecord>,
    progress: HashMap<(UserId, NaiveDate), DailyProgress>,
    idempotency: HashMap<(UserId, String), String>,
    settings: HashMap<UserId, StudySettings>,
}

/// All engine stores behind one mutex. The lock is never held across an
/// `.await`, so every method is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StudyError::Internal("memory store lock poisoned".to_string()))
    }

    /// Put a card in the store as-is.
    pub fn insert_card(&self, card: CardRecord) -> Result<()> {
        self.lock()?.cards.push(card);
        Ok(())
    }

    /// Look a card up by id regardless of owner.
    pub fn card(&self, id: CardId) -> Option<CardRecord> {
        self.lock()
            .ok()?
            .cards
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Every card owned by `user`, in creation order.
    pub fn cards_for(&self, user: UserId) -> Vec<CardRecord> {
        self.lock()
            .map(|inner| {
                inner
                    .cards
                    .iter()
                    .filter(|c| c.user_id == user)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn soft_delete(&self, id: CardId, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.deleted_at = Some(at);
                card.version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_settings(&self, user: UserId, settings: StudySettings) -> Result<()> {
        self.lock()?.settings.insert(user, settings);
        Ok(())
    }

    pub fn put_progress(&self, user: UserId, progress: DailyProgress) -> Result<()> {
        self.lock()?
            .progress
            .insert((user, progress.date_key), progress);
        Ok(())
    }
}

fn duplicate_exists(cards: &[CardRecord], user: UserId, hash: &str) -> bool {
    cards
        .iter()
        .any(|c| c.user_id == user && !c.is_deleted() && c.content_hash == hash)
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get_card(&self, user: UserId, id: CardId) -> Result<Option<CardRecord>> {
        Ok(self
            .lock()?
            .cards
            .iter()
            .find(|c| c.id == id && c.user_id == user)
            .cloned())
    }

    async fn due_cards(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CardRecord>> {
        let inner = self.lock()?;
        let mut due: Vec<CardRecord> = inner
            .cards
            .iter()
            .filter(|c| c.user_id == user && c.eligibility(now) == Eligibility::DueCandidate)
            .cloned()
            .collect();
        due.sort_by_key(|c| c.state.due_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn new_candidates(&self, user: UserId, limit: u32) -> Result<Vec<CardRecord>> {
        let inner = self.lock()?;
        let mut fresh: Vec<CardRecord> = inner
            .cards
            .iter()
            .filter(|c| c.user_id == user && c.state.is_new_candidate(c.is_deleted()))
            .cloned()
            .collect();
        fresh.sort_by_key(|c| c.created_at);
        fresh.truncate(limit as usize);
        Ok(fresh)
    }

    async fn compare_and_swap(
        &self,
        expected_version: i64,
        card: &CardRecord,
    ) -> Result<Option<CardRecord>> {
        let mut inner = self.lock()?;
        let Some(stored) = inner
            .cards
            .iter_mut()
            .find(|c| c.id == card.id && c.user_id == card.user_id)
        else {
            return Ok(None);
        };
        if stored.version != expected_version || stored.is_deleted() {
            return Ok(None);
        }
        stored.state = card.state.clone();
        stored.version += 1;
        Ok(Some(stored.clone()))
    }

    async fn mark_introduced(
        &self,
        user: UserId,
        ids: &[CardId],
        day: NaiveDate,
    ) -> Result<Vec<CardId>> {
        let wanted: HashSet<&CardId> = ids.iter().collect();
        let mut inner = self.lock()?;
        let mut marked = Vec::new();
        for card in inner.cards.iter_mut() {
            if card.user_id == user
                && wanted.contains(&card.id)
                && card.state.is_new_candidate(card.is_deleted())
            {
                card.state.introduced_on = Some(day);
                card.version += 1;
                marked.push(card.id);
            }
        }
        Ok(marked)
    }

    async fn insert_ignoring_duplicates(
        &self,
        user: UserId,
        drafts: &[NewCard],
        now: DateTime<Utc>,
    ) -> Result<Vec<CardRecord>> {
        let mut inner = self.lock()?;
        let mut inserted = Vec::new();
        for draft in drafts {
            if duplicate_exists(&inner.cards, user, &draft.content_hash) {
                continue;
            }
            let record = CardRecord {
                id: draft.id,
                user_id: user,
                front: draft.front.clone(),
                back: draft.back.clone(),
                provenance: draft.provenance,
                content_hash: draft.content_hash.clone(),
                created_at: now,
                deleted_at: None,
                version: 1,
                state: CardState::default(),
            };
            inner.cards.push(record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_progress(&self, user: UserId, day: NaiveDate) -> Result<Option<DailyProgress>> {
        Ok(self.lock()?.progress.get(&(user, day)).cloned())
    }

    async fn ensure_progress(&self, user: UserId, day: NaiveDate) -> Result<DailyProgress> {
        Ok(self
            .lock()?
            .progress
            .entry((user, day))
            .or_insert_with(|| DailyProgress::empty(day))
            .clone())
    }

    async fn compare_and_set(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        expected: u32,
        next: u32,
    ) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.progress.get_mut(&(user, day)) {
            Some(row) if row.counter(counter) == expected => {
                row.set_counter(counter, next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_to_counter(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        delta: u32,
    ) -> Result<DailyProgress> {
        let mut inner = self.lock()?;
        let row = inner
            .progress
            .entry((user, day))
            .or_insert_with(|| DailyProgress::empty(day));
        let value = row.counter(counter).saturating_add(delta);
        row.set_counter(counter, value);
        Ok(row.clone())
    }

    async fn set_goal_override(
        &self,
        user: UserId,
        day: NaiveDate,
        value: Option<u32>,
    ) -> Result<DailyProgress> {
        let mut inner = self.lock()?;
        let row = inner
            .progress
            .entry((user, day))
            .or_insert_with(|| DailyProgress::empty(day));
        row.goal_override = value;
        Ok(row.clone())
    }
}

#[async_trait]
impl IdempotencyStore for MemoryStore {
    async fn get_result(&self, user: UserId, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .idempotency
            .get(&(user, key.to_string()))
            .cloned())
    }

    async fn put_result(&self, user: UserId, key: &str, body: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        let slot = (user, key.to_string());
        if inner.idempotency.contains_key(&slot) {
            return Ok(false);
        }
        inner.idempotency.insert(slot, body.to_string());
        Ok(true)
    }
}

#[async_trait]
impl SettingsProvider for MemoryStore {
    async fn get_settings(&self, user: UserId) -> Result<Option<StudySettings>> {
        Ok(self.lock()?.settings.get(&user).copied())
    }
}
