//! Processed-fingerprint cache.
//!
//! Tracks which comment occurrences have already been dispatched so an
//! unchanged marker doesn't re-fire on every file save. An explicit store
//! object rather than process-global state: tests and multiple wrapper
//! instances get independent caches. In-memory only and unbounded: the
//! cache lives exactly as long as the wrapping process, and an interactive
//! session holds at most thousands of entries.

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of fingerprints whose prompts have been dispatched.
#[derive(Debug, Default)]
pub struct ProcessedCache {
    inner: Mutex<HashSet<String>>,
}

impl ProcessedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this fingerprint has already been dispatched.
    pub fn is_processed(&self, fingerprint: &str) -> bool {
        self.inner.lock().unwrap().contains(fingerprint)
    }

    /// Record a fingerprint as dispatched.
    pub fn mark_processed(&self, fingerprint: &str) {
        self.inner.lock().unwrap().insert(fingerprint.to_string());
    }

    /// Atomically mark a fingerprint, returning true if it was new.
    ///
    /// Single check-and-set so two racing dispatchers can't both claim the
    /// same comment between a `is_processed` and a `mark_processed`.
    pub fn check_and_mark(&self, fingerprint: &str) -> bool {
        self.inner.lock().unwrap().insert(fingerprint.to_string())
    }

    /// Forget a fingerprint (used when a dispatch fails after claiming it).
    pub fn unmark(&self, fingerprint: &str) {
        self.inner.lock().unwrap().remove(fingerprint);
    }

    /// Drop all entries (operator/test reset).
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Number of fingerprints tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_cache_has_nothing() {
        let cache = ProcessedCache::new();
        assert!(!cache.is_processed("abc123"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mark_then_seen() {
        let cache = ProcessedCache::new();
        cache.mark_processed("abc123");
        assert!(cache.is_processed("abc123"));
        assert!(!cache.is_processed("def456"));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let cache = ProcessedCache::new();
        cache.mark_processed("abc123");
        cache.clear();
        assert!(!cache.is_processed("abc123"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_check_and_mark_claims_once() {
        let cache = ProcessedCache::new();
        assert!(cache.check_and_mark("abc123"));
        assert!(!cache.check_and_mark("abc123"));
        assert!(cache.is_processed("abc123"));
    }

    #[test]
    fn test_unmark_releases_claim() {
        let cache = ProcessedCache::new();
        assert!(cache.check_and_mark("abc123"));
        cache.unmark("abc123");
        assert!(cache.check_and_mark("abc123"));
    }

    #[test]
    fn test_independent_instances() {
        let a = ProcessedCache::new();
        let b = ProcessedCache::new();
        a.mark_processed("abc123");
        assert!(!b.is_processed("abc123"));
    }

    #[test]
    fn test_concurrent_claims_are_exclusive() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(ProcessedCache::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || cache.check_and_mark("contested") as usize));
        }
        let claims: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(claims, 1);
    }
}
