//! Text canonicalization for duplicate detection.

use async_trait::async_trait;
use study_core::dedup::normalize_whitespace;

use crate::error::Result;

/// Deterministic normalization of card text. Must be free of side effects.
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    async fn canonicalize(&self, text: &str) -> Result<String>;
}

/// Trims and collapses whitespace. Case is folded later by the dedup key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizingCanonicalizer;

#[async_trait]
impl Canonicalizer for NormalizingCanonicalizer {
    async fn canonicalize(&self, text: &str) -> Result<String> {
        Ok(normalize_whitespace(text))
    }
}
