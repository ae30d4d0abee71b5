//! Study queue assembly.

use study_core::QueueBudget;

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::Result;
use crate::models::{CardRecord, Eligibility, QueueItem, QueueMeta, StudyQueue};

impl StudyEngine {
    /// Build today's queue: due cards first, then new cards to fill the rest
    /// of the budget. Read-only.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn build_queue(
        &self,
        ctx: &RequestContext,
        goal_hint: Option<u32>,
    ) -> Result<StudyQueue> {
        let user = self.current_user(ctx)?;
        ctx.ensure_active("build_queue")?;

        let now = self.clock.now();
        let today = self.clock.day_of(now);

        let settings = self.settings_for(ctx, user).await?;
        let progress = ctx
            .bounded("progress.get", self.progress.get_progress(user, today))
            .await?;
        let budget = QueueBudget::resolve(progress.as_ref(), &settings, goal_hint);

        let due_limit = budget.due_limit();
        let mut due = if due_limit > 0 {
            ctx.bounded("cards.due", self.cards.due_cards(user, now, due_limit))
                .await?
        } else {
            Vec::new()
        };
        // Eligibility is decided once, from this read.
        due.retain(|card| card.eligibility(now) == Eligibility::DueCandidate);
        due.truncate(due_limit as usize);

        let new_limit = budget.new_limit_after(due.len());
        let mut fresh = if new_limit > 0 {
            ctx.bounded("cards.new", self.cards.new_candidates(user, new_limit))
                .await?
        } else {
            Vec::new()
        };
        fresh.retain(|card| card.eligibility(now) == Eligibility::NewCandidate);
        fresh.truncate(new_limit as usize);

        tracing::debug!(
            %user,
            daily_goal = budget.daily_goal,
            remaining = budget.remaining_for_today,
            due = due.len(),
            new = fresh.len(),
            "queue built"
        );

        Ok(StudyQueue {
            meta: QueueMeta {
                due_count: due.len(),
                new_selected: fresh.len(),
                daily_goal: budget.daily_goal,
            },
            due: due.iter().map(CardRecord::to_queue_item).collect::<Vec<QueueItem>>(),
            new: fresh.iter().map(CardRecord::to_queue_item).collect(),
        })
    }
}
