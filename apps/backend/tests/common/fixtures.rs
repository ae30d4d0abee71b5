//! Test fixtures and factory functions for creating test data.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use study_backend::models::{
    BatchItem, CardRecord, CardState, CardStatus, Provenance, UserId,
};
use study_backend::services::cards::hash_content;
use study_core::dedup::{dedup_key, normalize_whitespace};

/// Content hash the engine would compute for this front/back.
pub fn content_hash(front: &str, back: &str) -> String {
    hash_content(&dedup_key(
        &normalize_whitespace(front),
        &normalize_whitespace(back),
    ))
}

/// A never-introduced card.
pub fn new_card(user: UserId, front: &str, back: &str, created_at: DateTime<Utc>) -> CardRecord {
    CardRecord {
        id: Uuid::new_v4(),
        user_id: user,
        front: front.to_string(),
        back: back.to_string(),
        provenance: Provenance::Manual,
        content_hash: content_hash(front, back),
        created_at,
        deleted_at: None,
        version: 1,
        state: CardState::default(),
    }
}

/// A card in review that falls due at `due_at`.
pub fn due_card(user: UserId, front: &str, back: &str, due_at: DateTime<Utc>) -> CardRecord {
    let mut card = new_card(user, front, back, due_at - chrono::Duration::days(10));
    card.state = CardState {
        status: CardStatus::Review,
        interval_days: 3,
        reps: 2,
        due_at: Some(due_at),
        introduced_on: Some(card.created_at.date_naive()),
        last_reviewed_at: Some(due_at - chrono::Duration::days(3)),
        ..CardState::default()
    };
    card
}

pub fn batch_item(front: &str, back: &str) -> BatchItem {
    BatchItem {
        front: front.to_string(),
        back: back.to_string(),
        provenance: Provenance::Ai,
    }
}
