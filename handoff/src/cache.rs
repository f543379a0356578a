//! Cached application views that go stale when verification data lands.

use std::collections::HashSet;
use std::sync::Mutex;

/// Anything that caches application views keyed by application id.
pub trait ViewCache: Send + Sync {
    /// Drop every cached view of `application_id` so the next read refetches.
    fn invalidate(&self, application_id: &str);
}

/// In-process cache index. Only tracks which applications are cached; the
/// views themselves live with whoever renders them.
#[derive(Default)]
pub struct MemoryViewCache {
    cached: Mutex<HashSet<String>>,
    invalidations: Mutex<Vec<String>>,
}

impl MemoryViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_cached(&self, application_id: &str) {
        self.cached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(application_id.to_string());
    }

    pub fn is_cached(&self, application_id: &str) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(application_id)
    }

    /// Application ids invalidated so far, oldest first.
    pub fn invalidations(&self) -> Vec<String> {
        self.invalidations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ViewCache for MemoryViewCache {
    fn invalidate(&self, application_id: &str) {
        self.cached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(application_id);
        self.invalidations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(application_id.to_string());
        tracing::debug!(application_id, "application views invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_drops_the_entry_and_records_it() {
        let cache = MemoryViewCache::new();
        cache.mark_cached("app-1");
        cache.mark_cached("app-2");
        cache.invalidate("app-1");
        assert!(!cache.is_cached("app-1"));
        assert!(cache.is_cached("app-2"));
        assert_eq!(cache.invalidations(), vec!["app-1".to_string()]);
    }
}
