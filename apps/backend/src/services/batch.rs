//! Idempotent bulk card creation.

use std::collections::HashSet;

use study_core::ValidationError;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::engine::StudyEngine;
use crate::error::Result;
use crate::models::{
    BatchItem, BatchSaveResult, CardId, NewCard, SavedCard, SkipReason, SkippedItem,
};
use crate::services::audit::AuditEvent;
use crate::services::cards::{hash_content, require_text};

fn validate_batch(items: &[BatchItem], max: usize) -> Result<()> {
    if items.is_empty() {
        return Err(ValidationError::EmptyBatch.into());
    }
    if items.len() > max {
        return Err(ValidationError::BatchTooLarge {
            size: items.len(),
            max,
        }
        .into());
    }
    for (index, item) in items.iter().enumerate() {
        require_text(&item.front, &item.back, index)?;
    }
    Ok(())
}

fn skipped(front: String) -> SkippedItem {
    SkippedItem {
        front,
        reason: SkipReason::Duplicate,
    }
}

impl StudyEngine {
    /// Save a batch of cards, skipping duplicates.
    ///
    /// With an idempotency key, the first completed result is stored and
    /// returned verbatim for every later call with the same key.
    #[tracing::instrument(skip(self, ctx, items), fields(items = items.len()))]
    pub async fn batch_save(
        &self,
        ctx: &RequestContext,
        items: Vec<BatchItem>,
        idempotency_key: Option<&str>,
    ) -> Result<BatchSaveResult> {
        let user = self.current_user(ctx)?;
        let key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());

        if let Some(key) = key {
            let stored = ctx
                .bounded("idempotency.get", self.idempotency.get_result(user, key))
                .await?;
            if let Some(body) = stored {
                tracing::info!(%user, key, "replaying stored batch result");
                return Ok(serde_json::from_str(&body)?);
            }
        }

        validate_batch(&items, self.max_batch_size)?;

        // Canonicalize everything before writing anything.
        let mut seen = HashSet::new();
        let mut drafts = Vec::with_capacity(items.len());
        let mut skipped_items = Vec::new();
        for item in items {
            ctx.ensure_active("batch_save.canonicalize")?;
            let content_key = self.content_key(ctx, &item.front, &item.back).await?;
            if !seen.insert(content_key.clone()) {
                skipped_items.push(skipped(item.front));
                continue;
            }
            drafts.push(NewCard {
                id: Uuid::new_v4(),
                front: item.front,
                back: item.back,
                provenance: item.provenance,
                content_hash: hash_content(&content_key),
            });
        }

        ctx.ensure_active("batch_save.insert")?;
        let now = self.clock.now();
        let inserted: HashSet<CardId> = if drafts.is_empty() {
            HashSet::new()
        } else {
            ctx.bounded(
                "cards.insert",
                self.cards.insert_ignoring_duplicates(user, &drafts, now),
            )
            .await?
            .into_iter()
            .map(|card| card.id)
            .collect()
        };

        let mut saved = Vec::with_capacity(inserted.len());
        for draft in drafts {
            if inserted.contains(&draft.id) {
                saved.push(SavedCard {
                    id: draft.id,
                    provenance: draft.provenance,
                });
            } else {
                skipped_items.push(skipped(draft.front));
            }
        }
        let result = BatchSaveResult {
            saved,
            skipped: skipped_items,
        };

        if let Some(key) = key {
            let body = serde_json::to_string(&result)?;
            match ctx
                .bounded("idempotency.put", self.idempotency.put_result(user, key, &body))
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(%user, key, "idempotency key was stored by a concurrent request")
                }
                Err(err) => {
                    tracing::error!(error = %err, %user, key, "batch saved but result not stored for replay")
                }
            }
        }

        tracing::info!(
            %user,
            saved = result.saved.len(),
            skipped = result.skipped.len(),
            "batch saved"
        );
        self.record_audit(
            ctx,
            user,
            AuditEvent::BatchSave {
                idempotency_key: key.map(str::to_string),
                saved: result.saved.len(),
                skipped: result.skipped.len(),
            },
        )
        .await;

        Ok(result)
    }
}
