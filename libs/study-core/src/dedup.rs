//! Duplicate detection keys for card content.

/// Collapse runs of whitespace and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the duplicate key from already-canonicalized front and back.
///
/// Two cards are the same content when their keys are equal.
pub fn dedup_key(canonical_front: &str, canonical_back: &str) -> String {
    format!(
        "{}|{}",
        canonical_front.to_lowercase(),
        canonical_back.to_lowercase()
    )
}
