//! Daily progress counters and goal overrides.
//!
//! Every counter change goes through [`increment_counter`]: a
//! compare-and-set on the observed value, one re-read and retry, and then an
//! atomic add that cannot lose an increment.

use chrono::NaiveDate;
use study_core::dates::parse_day_key;
use study_core::{NewAllowance, QueueBudget, ValidationError, MAX_GOAL_OVERRIDE};

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::Result;
use crate::models::{Counter, DailyProgress, ProgressSnapshot, StudySettings, UserId};
use crate::store::ProgressStore;

/// Compare-and-set attempts before falling back to the atomic add.
const CAS_ATTEMPTS: u8 = 2;

/// How an increment landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementPath {
    /// Nothing to add.
    Noop,
    /// Compare-and-set won on the given attempt.
    Swapped { attempt: u8 },
    /// Both compare-and-set attempts lost; the atomic add was used.
    Upserted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// Counter value right after this increment.
    pub value: u32,
    pub path: IncrementPath,
}

/// Add `delta` to one counter of the (user, day) row, creating the row if
/// needed. Never loses an increment under concurrency.
pub async fn increment_counter(
    store: &dyn ProgressStore,
    ctx: &RequestContext,
    user: UserId,
    day: NaiveDate,
    counter: Counter,
    delta: u32,
) -> Result<IncrementOutcome> {
    if delta == 0 {
        let row = ctx
            .bounded("progress.ensure", store.ensure_progress(user, day))
            .await?;
        return Ok(IncrementOutcome {
            value: row.counter(counter),
            path: IncrementPath::Noop,
        });
    }

    for attempt in 1..=CAS_ATTEMPTS {
        let row = ctx
            .bounded("progress.ensure", store.ensure_progress(user, day))
            .await?;
        let observed = row.counter(counter);
        let next = observed.saturating_add(delta);

        let swapped = ctx
            .bounded(
                "progress.compare_and_set",
                store.compare_and_set(user, day, counter, observed, next),
            )
            .await?;
        if swapped {
            return Ok(IncrementOutcome {
                value: next,
                path: IncrementPath::Swapped { attempt },
            });
        }
        tracing::debug!(%user, %day, counter = counter.column(), attempt, "progress counter changed underneath");
    }

    let row = ctx
        .bounded(
            "progress.add_to_counter",
            store.add_to_counter(user, day, counter, delta),
        )
        .await?;
    tracing::info!(%user, %day, counter = counter.column(), delta, "progress counter fell back to atomic add");

    Ok(IncrementOutcome {
        value: row.counter(counter),
        path: IncrementPath::Upserted,
    })
}

fn snapshot(progress: &DailyProgress, settings: &StudySettings) -> ProgressSnapshot {
    let budget = QueueBudget::resolve(Some(progress), settings, None);
    let allowance = NewAllowance::resolve(Some(progress), settings);
    ProgressSnapshot {
        date_key: progress.date_key,
        reviews_done: progress.reviews_done,
        new_introduced: progress.new_introduced,
        goal_override: progress.goal_override,
        daily_goal: budget.daily_goal,
        remaining_for_today: budget.remaining_for_today,
        new_remaining: allowance.remaining,
    }
}

impl StudyEngine {
    /// Resolve a caller-supplied day key, defaulting to today.
    fn resolve_day(&self, day: Option<&str>) -> Result<NaiveDate> {
        match day {
            Some(day) => Ok(parse_day_key(day)?),
            None => Ok(self.clock.today_key()),
        }
    }

    pub(crate) async fn increment(
        &self,
        ctx: &RequestContext,
        user: UserId,
        day: NaiveDate,
        counter: Counter,
        delta: u32,
    ) -> Result<IncrementOutcome> {
        increment_counter(self.progress.as_ref(), ctx, user, day, counter, delta).await
    }

    /// Count one completed review for `day`.
    pub async fn increment_reviews_done(
        &self,
        ctx: &RequestContext,
        day: NaiveDate,
    ) -> Result<IncrementOutcome> {
        let user = self.current_user(ctx)?;
        self.increment(ctx, user, day, Counter::ReviewsDone, 1).await
    }

    /// Count `count` newly introduced cards for `day`.
    pub async fn increment_new_introduced(
        &self,
        ctx: &RequestContext,
        day: NaiveDate,
        count: u32,
    ) -> Result<IncrementOutcome> {
        let user = self.current_user(ctx)?;
        self.increment(ctx, user, day, Counter::NewIntroduced, count).await
    }

    /// Set or clear the goal override for a day (today by default).
    #[tracing::instrument(skip(self, ctx))]
    pub async fn upsert_goal_override(
        &self,
        ctx: &RequestContext,
        day: Option<&str>,
        value: Option<i64>,
    ) -> Result<ProgressSnapshot> {
        let user = self.current_user(ctx)?;
        let value = match value {
            Some(v) if v < 0 => return Err(ValidationError::NegativeGoal(v).into()),
            Some(v) if v > MAX_GOAL_OVERRIDE => {
                return Err(ValidationError::GoalTooLarge {
                    value: v,
                    max: MAX_GOAL_OVERRIDE,
                }
                .into())
            }
            // 0..=i32::MAX fits in u32.
            Some(v) => Some(v as u32),
            None => None,
        };
        let day = self.resolve_day(day)?;
        ctx.ensure_active("upsert_goal_override")?;

        let row = ctx
            .bounded(
                "progress.set_goal_override",
                self.progress.set_goal_override(user, day, value),
            )
            .await?;
        let settings = self.settings_for(ctx, user).await?;
        tracing::debug!(%user, %day, goal_override = ?value, "goal override stored");

        Ok(snapshot(&row, &settings))
    }

    /// Progress for a day (today by default). Never creates the row.
    pub async fn read_progress(
        &self,
        ctx: &RequestContext,
        day: Option<&str>,
    ) -> Result<ProgressSnapshot> {
        let user = self.current_user(ctx)?;
        let day = self.resolve_day(day)?;

        let row = ctx
            .bounded("progress.get", self.progress.get_progress(user, day))
            .await?
            .unwrap_or_else(|| DailyProgress::empty(day));
        let settings = self.settings_for(ctx, user).await?;

        Ok(snapshot(&row, &settings))
    }
}
