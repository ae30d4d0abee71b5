//! PostgreSQL database operations

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::services::audit::{AuditEntry, AuditLog};
use crate::services::settings::SettingsProvider;
use crate::store::{CardStore, IdempotencyStore, ProgressStore};

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === Settings Repository ===

    /// Store settings for a user. Settings are edited elsewhere; this exists
    /// for seeding and tests.
    pub async fn upsert_settings(&self, user: UserId, settings: &StudySettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO study_settings (user_id, daily_goal, new_limit)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                daily_goal = EXCLUDED.daily_goal,
                new_limit = EXCLUDED.new_limit,
                updated_at = NOW()
            "#,
        )
        .bind(user.0)
        .bind(settings.daily_goal.map(to_i32))
        .bind(settings.new_limit.map(to_i32))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft delete a card
    pub async fn soft_delete_card(&self, user: UserId, card_id: CardId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cards
            SET deleted_at = NOW(), version = version + 1, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(card_id)
        .bind(user.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// === Card Repository ===

#[async_trait]
impl CardStore for Database {
    async fn get_card(&self, user: UserId, id: CardId) -> Result<Option<CardRecord>> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, user_id, front, back, provenance, content_hash, status, interval_days,
                   ease_factor, reps, lapses, due_at, introduced_on, last_reviewed_at,
                   last_rating, version, created_at, deleted_at
            FROM cards
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card.map(|c| c.to_record()))
    }

    async fn due_cards(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CardRecord>> {
        let cards = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, user_id, front, back, provenance, content_hash, status, interval_days,
                   ease_factor, reps, lapses, due_at, introduced_on, last_reviewed_at,
                   last_rating, version, created_at, deleted_at
            FROM cards
            WHERE user_id = $1 AND deleted_at IS NULL
              AND due_at IS NOT NULL AND due_at <= $2
            ORDER BY due_at, seq
            LIMIT $3
            "#,
        )
        .bind(user.0)
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(cards.iter().map(DbCard::to_record).collect())
    }

    async fn new_candidates(&self, user: UserId, limit: u32) -> Result<Vec<CardRecord>> {
        let cards = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, user_id, front, back, provenance, content_hash, status, interval_days,
                   ease_factor, reps, lapses, due_at, introduced_on, last_reviewed_at,
                   last_rating, version, created_at, deleted_at
            FROM cards
            WHERE user_id = $1 AND deleted_at IS NULL
              AND status = 'new' AND introduced_on IS NULL AND due_at IS NULL
            ORDER BY created_at, seq
            LIMIT $2
            "#,
        )
        .bind(user.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(cards.iter().map(DbCard::to_record).collect())
    }

    async fn compare_and_swap(
        &self,
        expected_version: i64,
        card: &CardRecord,
    ) -> Result<Option<CardRecord>> {
        let state = &card.state;
        let stored = sqlx::query_as::<_, DbCard>(
            r#"
            UPDATE cards SET
                status = $3,
                interval_days = $4,
                ease_factor = $5,
                reps = $6,
                lapses = $7,
                due_at = $8,
                introduced_on = $9,
                last_reviewed_at = $10,
                last_rating = $11,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $12 AND version = $2 AND deleted_at IS NULL
            RETURNING id, user_id, front, back, provenance, content_hash, status, interval_days,
                      ease_factor, reps, lapses, due_at, introduced_on, last_reviewed_at,
                      last_rating, version, created_at, deleted_at
            "#,
        )
        .bind(card.id)
        .bind(expected_version)
        .bind(state.status.as_str())
        .bind(to_i32(state.interval_days))
        .bind(state.ease_factor)
        .bind(to_i32(state.reps))
        .bind(to_i32(state.lapses))
        .bind(state.due_at)
        .bind(state.introduced_on)
        .bind(state.last_reviewed_at)
        .bind(state.last_rating.map(|r| i16::from(r.to_value())))
        .bind(card.user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored.map(|c| c.to_record()))
    }

    async fn mark_introduced(
        &self,
        user: UserId,
        ids: &[CardId],
        day: NaiveDate,
    ) -> Result<Vec<CardId>> {
        let marked = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE cards
            SET introduced_on = $3, version = version + 1, updated_at = NOW()
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
              AND status = 'new' AND introduced_on IS NULL AND due_at IS NULL
            RETURNING id
            "#,
        )
        .bind(user.0)
        .bind(ids)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(marked)
    }

    async fn insert_ignoring_duplicates(
        &self,
        user: UserId,
        drafts: &[NewCard],
        now: DateTime<Utc>,
    ) -> Result<Vec<CardRecord>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = drafts.iter().map(|d| d.id).collect();
        let fronts: Vec<String> = drafts.iter().map(|d| d.front.clone()).collect();
        let backs: Vec<String> = drafts.iter().map(|d| d.back.clone()).collect();
        let provenances: Vec<String> = drafts
            .iter()
            .map(|d| d.provenance.as_str().to_string())
            .collect();
        let hashes: Vec<String> = drafts.iter().map(|d| d.content_hash.clone()).collect();

        let inserted = sqlx::query_as::<_, DbCard>(
            r#"
            INSERT INTO cards (id, user_id, front, back, provenance, content_hash, created_at)
            SELECT d.id, $1, d.front, d.back, d.provenance, d.content_hash, $7
            FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::text[], $6::text[])
                 WITH ORDINALITY AS d(id, front, back, provenance, content_hash, ord)
            ORDER BY d.ord
            ON CONFLICT (user_id, content_hash) WHERE deleted_at IS NULL DO NOTHING
            RETURNING id, user_id, front, back, provenance, content_hash, status, interval_days,
                      ease_factor, reps, lapses, due_at, introduced_on, last_reviewed_at,
                      last_rating, version, created_at, deleted_at
            "#,
        )
        .bind(user.0)
        .bind(&ids)
        .bind(&fronts)
        .bind(&backs)
        .bind(&provenances)
        .bind(&hashes)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(inserted.iter().map(DbCard::to_record).collect())
    }
}

// === Progress Repository ===

#[async_trait]
impl ProgressStore for Database {
    async fn get_progress(&self, user: UserId, day: NaiveDate) -> Result<Option<DailyProgress>> {
        let row = sqlx::query_as::<_, DbDailyProgress>(
            r#"
            SELECT date_key, reviews_done, new_introduced, goal_override
            FROM daily_progress
            WHERE user_id = $1 AND date_key = $2
            "#,
        )
        .bind(user.0)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.to_core()))
    }

    async fn ensure_progress(&self, user: UserId, day: NaiveDate) -> Result<DailyProgress> {
        sqlx::query(
            r#"
            INSERT INTO daily_progress (user_id, date_key)
            VALUES ($1, $2)
            ON CONFLICT (user_id, date_key) DO NOTHING
            "#,
        )
        .bind(user.0)
        .bind(day)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, DbDailyProgress>(
            r#"
            SELECT date_key, reviews_done, new_introduced, goal_override
            FROM daily_progress
            WHERE user_id = $1 AND date_key = $2
            "#,
        )
        .bind(user.0)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.to_core())
    }

    async fn compare_and_set(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        expected: u32,
        next: u32,
    ) -> Result<bool> {
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "UPDATE daily_progress SET {col} = $4, updated_at = NOW() \
             WHERE user_id = $1 AND date_key = $2 AND {col} = $3",
            col = counter.column()
        );
        let result = sqlx::query(&sql)
            .bind(user.0)
            .bind(day)
            .bind(to_i32(expected))
            .bind(to_i32(next))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_to_counter(
        &self,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        delta: u32,
    ) -> Result<DailyProgress> {
        let sql = format!(
            "INSERT INTO daily_progress (user_id, date_key, {col}) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, date_key) DO UPDATE SET \
                 {col} = daily_progress.{col} + EXCLUDED.{col}, updated_at = NOW() \
             RETURNING date_key, reviews_done, new_introduced, goal_override",
            col = counter.column()
        );
        let row = sqlx::query_as::<_, DbDailyProgress>(&sql)
            .bind(user.0)
            .bind(day)
            .bind(to_i32(delta))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.to_core())
    }

    async fn set_goal_override(
        &self,
        user: UserId,
        day: NaiveDate,
        value: Option<u32>,
    ) -> Result<DailyProgress> {
        let row = sqlx::query_as::<_, DbDailyProgress>(
            r#"
            INSERT INTO daily_progress (user_id, date_key, goal_override)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, date_key) DO UPDATE SET
                goal_override = EXCLUDED.goal_override,
                updated_at = NOW()
            RETURNING date_key, reviews_done, new_introduced, goal_override
            "#,
        )
        .bind(user.0)
        .bind(day)
        .bind(value.map(to_i32))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.to_core())
    }
}

// === Idempotency Repository ===

#[async_trait]
impl IdempotencyStore for Database {
    async fn get_result(&self, user: UserId, key: &str) -> Result<Option<String>> {
        let body = sqlx::query_scalar::<_, String>(
            r#"
            SELECT response FROM idempotency_records
            WHERE user_id = $1 AND idempotency_key = $2
            "#,
        )
        .bind(user.0)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(body)
    }

    async fn put_result(&self, user: UserId, key: &str, body: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_records (user_id, idempotency_key, response)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(user.0)
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl SettingsProvider for Database {
    async fn get_settings(&self, user: UserId) -> Result<Option<StudySettings>> {
        let row = sqlx::query_as::<_, DbStudySettings>(
            r#"
            SELECT daily_goal, new_limit
            FROM study_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.to_core()))
    }
}

#[async_trait]
impl AuditLog for Database {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.event)?;
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor, action, card_id, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.actor.0)
        .bind(entry.event.action())
        .bind(entry.event.card_id())
        .bind(payload)
        .bind(entry.at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
