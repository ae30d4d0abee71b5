//! Common test utilities and fixtures for integration tests.
//!
//! `TestContext` wires a `StudyEngine` to an in-memory store, a manual clock
//! and an in-memory audit log, and seeds cards for one test user.

#![allow(dead_code)]

pub mod doubles;
pub mod fixtures;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use study_backend::models::{CardRecord, DailyProgress, StudySettings, UserId};
use study_backend::services::audit::MemoryAuditLog;
use study_backend::services::clock::{Clock, ManualClock};
use study_backend::store::{MemoryStore, ProgressStore};
use study_backend::{RequestContext, StudyEngine};

/// Fixed starting instant for every test.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub audit: Arc<MemoryAuditLog>,
    pub engine: StudyEngine,
    pub user: UserId,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let audit = Arc::new(MemoryAuditLog::new());
        let engine = StudyEngine::with_memory_store(store.clone())
            .with_clock(clock.clone())
            .with_audit(audit.clone());

        Self {
            store,
            clock,
            audit,
            engine,
            user: UserId::new(),
        }
    }

    /// Request context for the test user.
    pub fn ctx(&self) -> RequestContext {
        RequestContext::for_user(self.user)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today_key()
    }

    pub fn set_settings(&self, daily_goal: Option<u32>, new_limit: Option<u32>) {
        self.store
            .set_settings(self.user, StudySettings { daily_goal, new_limit })
            .unwrap();
    }

    /// Store today's progress row as given.
    pub fn set_progress(&self, reviews_done: u32, new_introduced: u32, goal_override: Option<u32>) {
        self.store
            .put_progress(
                self.user,
                DailyProgress {
                    date_key: self.today(),
                    reviews_done,
                    new_introduced,
                    goal_override,
                },
            )
            .unwrap();
    }

    /// Today's progress row, zeroed if it does not exist.
    pub async fn progress(&self) -> DailyProgress {
        self.store
            .get_progress(self.user, self.today())
            .await
            .unwrap()
            .unwrap_or_else(|| DailyProgress::empty(self.today()))
    }

    /// Seed `count` never-introduced cards, oldest first.
    pub fn seed_new_cards(&self, count: usize) -> Vec<CardRecord> {
        (0..count)
            .map(|i| {
                let created_at = self.now() - Duration::days(30) + Duration::minutes(i as i64);
                let card = fixtures::new_card(
                    self.user,
                    &format!("New question {i}"),
                    &format!("New answer {i}"),
                    created_at,
                );
                self.store.insert_card(card.clone()).unwrap();
                card
            })
            .collect()
    }

    /// Seed `count` review cards that fell due in the past, most overdue first.
    pub fn seed_due_cards(&self, count: usize) -> Vec<CardRecord> {
        (0..count)
            .map(|i| {
                let due_at = self.now() - Duration::hours((count - i) as i64);
                let card = fixtures::due_card(
                    self.user,
                    &format!("Due question {i}"),
                    &format!("Due answer {i}"),
                    due_at,
                );
                self.store.insert_card(card.clone()).unwrap();
                card
            })
            .collect()
    }
}
