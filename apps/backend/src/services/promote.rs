//! Introducing new cards ahead of their first review.

use std::collections::HashSet;

use study_core::{NewAllowance, ValidationError};

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::Result;
use crate::models::{CardId, Counter, Eligibility, PromoteOutcome};
use crate::services::audit::AuditEvent;

impl StudyEngine {
    /// Mark up to `requested` new cards (all remaining allowance when `None`)
    /// as introduced today, oldest first.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn promote_new(
        &self,
        ctx: &RequestContext,
        requested: Option<i64>,
    ) -> Result<PromoteOutcome> {
        let user = self.current_user(ctx)?;
        let requested = match requested {
            Some(n) if n < 0 => return Err(ValidationError::NegativeCount(n).into()),
            Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
            None => None,
        };
        ctx.ensure_active("promote_new")?;

        let now = self.clock.now();
        let today = self.clock.day_of(now);

        let settings = self.settings_for(ctx, user).await?;
        let progress = ctx
            .bounded("progress.get", self.progress.get_progress(user, today))
            .await?;
        let allowance = NewAllowance::resolve(progress.as_ref(), &settings);
        let wanted = allowance.to_promote(requested);

        if wanted == 0 {
            return Ok(PromoteOutcome {
                promoted: Vec::new(),
                remaining_allowance: allowance.remaining,
            });
        }

        let mut candidates = ctx
            .bounded("cards.new", self.cards.new_candidates(user, wanted))
            .await?;
        candidates.retain(|card| card.eligibility(now) == Eligibility::NewCandidate);
        candidates.truncate(wanted as usize);
        let ids: Vec<CardId> = candidates.iter().map(|card| card.id).collect();

        if ids.is_empty() {
            return Ok(PromoteOutcome {
                promoted: Vec::new(),
                remaining_allowance: allowance.remaining,
            });
        }

        ctx.ensure_active("promote_new.mark")?;
        let marked: HashSet<CardId> = ctx
            .bounded(
                "cards.mark_introduced",
                self.cards.mark_introduced(user, &ids, today),
            )
            .await?
            .into_iter()
            .collect();
        // Keep candidate order; drop cards another request got to first.
        let promoted: Vec<CardId> = ids.into_iter().filter(|id| marked.contains(id)).collect();
        let count = u32::try_from(promoted.len()).unwrap_or(u32::MAX);

        if count > 0 {
            if let Err(err) = self
                .increment(ctx, user, today, Counter::NewIntroduced, count)
                .await
            {
                tracing::error!(error = %err, count, "cards promoted but new_introduced not counted");
            }

            tracing::info!(%user, count, "new cards promoted");
            self.record_audit(
                ctx,
                user,
                AuditEvent::PromoteNew {
                    count: promoted.len(),
                    card_ids: promoted.clone(),
                },
            )
            .await;
        }

        Ok(PromoteOutcome {
            remaining_allowance: allowance.after(count),
            promoted,
        })
    }
}
