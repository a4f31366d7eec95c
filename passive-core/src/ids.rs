//! Identifier generation
//!
//! Message ids and instance ids come from an [`IdSource`] so tests can
//! substitute a deterministic sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces globally-unique string identifiers on demand
pub trait IdSource: Send + Sync {
    /// Generate a fresh identifier
    fn generate(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Prefixed monotonically increasing ids (`prefix-0`, `prefix-1`, ...)
#[derive(Debug)]
pub struct SequentialIdSource {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdSource for SequentialIdSource {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uuid_source_generates_distinct_ids() {
        let source = UuidIdSource;
        let ids: HashSet<String> = (0..100).map(|_| source.generate()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn uuid_source_generates_parseable_uuids() {
        let id = UuidIdSource.generate();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn sequential_source_counts_up() {
        let source = SequentialIdSource::new("msg");
        assert_eq!(source.generate(), "msg-0");
        assert_eq!(source.generate(), "msg-1");
        assert_eq!(source.generate(), "msg-2");
    }
}
