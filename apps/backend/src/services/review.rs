//! Recording a review.

use chrono::{DateTime, NaiveDate, Utc};

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::{Result, StudyError};
use crate::models::{CardId, CardRecord, CardSnapshot, Counter, Rating, UserId};
use crate::services::audit::AuditEvent;

/// A stale version is re-read and retried once before giving up.
const CARD_CAS_ATTEMPTS: u8 = 2;

impl StudyEngine {
    /// Load a live card owned by `user`.
    pub(crate) async fn owned_card(
        &self,
        ctx: &RequestContext,
        user: UserId,
        card_id: CardId,
    ) -> Result<CardRecord> {
        match ctx
            .bounded("cards.get", self.cards.get_card(user, card_id))
            .await?
        {
            Some(card) if !card.is_deleted() => Ok(card),
            _ => Err(StudyError::NotFound(format!("card {card_id}"))),
        }
    }

    fn reviewed(
        &self,
        card: &CardRecord,
        rating: Rating,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> CardRecord {
        let mut next = card.clone();
        next.state = self.algorithm.schedule(&card.state, rating, now);
        // The first review of a never-promoted card introduces it.
        next.state.introduced_on.get_or_insert(today);
        next
    }

    /// Apply a rating to a card and persist the new schedule.
    ///
    /// The card is written with compare-and-swap on its version. A lost race
    /// re-reads and recomputes once; a second loss is a `Conflict`.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn review_card(
        &self,
        ctx: &RequestContext,
        card_id: CardId,
        rating: i64,
    ) -> Result<CardSnapshot> {
        let user = self.current_user(ctx)?;
        let rating = Rating::parse(rating)?;
        ctx.ensure_active("review_card")?;

        let now = self.clock.now();
        let today = self.clock.day_of(now);

        let mut card = self.owned_card(ctx, user, card_id).await?;
        let mut attempt = 0;
        let stored = loop {
            attempt += 1;
            let next = self.reviewed(&card, rating, now, today);
            let swapped = ctx
                .bounded(
                    "cards.compare_and_swap",
                    self.cards.compare_and_swap(card.version, &next),
                )
                .await?;
            match swapped {
                Some(stored) => break stored,
                None if attempt < CARD_CAS_ATTEMPTS => {
                    tracing::debug!(%card_id, attempt, "card changed during review, re-reading");
                    card = self.owned_card(ctx, user, card_id).await?;
                }
                None => {
                    tracing::warn!(%card_id, "card review lost the race twice");
                    return Err(StudyError::Conflict(format!(
                        "card {card_id} was modified concurrently"
                    )));
                }
            }
        };

        // The card is already written; a counter failure must not turn the
        // review into an error the caller would retry.
        if let Err(err) = self
            .increment(ctx, user, today, Counter::ReviewsDone, 1)
            .await
        {
            tracing::error!(error = %err, %card_id, "review stored but reviews_done not counted");
        }

        tracing::info!(
            %user,
            %card_id,
            rating = rating.to_value(),
            algorithm = self.algorithm.name(),
            status = stored.state.status.as_str(),
            interval_days = stored.state.interval_days,
            "card reviewed"
        );

        self.record_audit(
            ctx,
            user,
            AuditEvent::Review {
                card_id,
                rating: rating.to_value(),
                new_state: stored.state.status,
                due_at: stored.state.due_at,
            },
        )
        .await;

        Ok(stored.to_snapshot())
    }
}
