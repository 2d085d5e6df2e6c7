use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use lru::LruCache;
use metacat_core::TableRef;
use thiserror::Error;
use tracing::debug;

/// Why a cached plan could not be dropped. Never fatal to the caller.
#[derive(Debug, Error)]
pub enum UncacheError {
    /// Nothing is known about the table; it may already be gone.
    #[error("no cached plan or metadata for table {0}")]
    NotFound(TableRef),
    #[error("failed to uncache {table}: {reason}")]
    Failed { table: TableRef, reason: String },
}

/// Drops cached query plans before a table's metadata changes under them.
pub trait CacheInvalidator: Send + Sync {
    fn try_uncache(&self, table: &TableRef) -> Result<(), UncacheError>;
}

/// Cached plan entry.
#[derive(Debug, Clone)]
pub struct CachedPlan {
    pub plan: String,
    pub cached_at: DateTime<Utc>,
}

/// LRU cache of planned queries, one per table.
pub struct PlanCache {
    plans: Mutex<LruCache<TableRef, CachedPlan>>,
}

impl PlanCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            plans: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn plans(&self) -> MutexGuard<'_, LruCache<TableRef, CachedPlan>> {
        self.plans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache_plan(&self, table: TableRef, plan: impl Into<String>) {
        debug!("Caching plan for {}", table);
        self.plans().put(
            table,
            CachedPlan {
                plan: plan.into(),
                cached_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, table: &TableRef) -> Option<CachedPlan> {
        self.plans().get(table).cloned()
    }

    pub fn contains(&self, table: &TableRef) -> bool {
        self.plans().contains(table)
    }

    pub fn len(&self) -> usize {
        self.plans().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans().is_empty()
    }
}

impl CacheInvalidator for PlanCache {
    fn try_uncache(&self, table: &TableRef) -> Result<(), UncacheError> {
        match self.plans().pop(table) {
            Some(_) => {
                debug!("Uncached plan for {}", table);
                Ok(())
            }
            None => Err(UncacheError::NotFound(table.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> TableRef {
        TableRef::new("c", "d", name)
    }

    #[test]
    fn uncache_removes_entry_once() {
        let cache = PlanCache::new(4);
        cache.cache_plan(t("a"), "scan c.d.a");
        assert!(cache.contains(&t("a")));
        assert_eq!(cache.get(&t("a")).map(|p| p.plan), Some("scan c.d.a".to_string()));

        cache.try_uncache(&t("a")).unwrap();
        assert!(cache.is_empty());
        assert!(matches!(
            cache.try_uncache(&t("a")).unwrap_err(),
            UncacheError::NotFound(_)
        ));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PlanCache::new(2);
        cache.cache_plan(t("a"), "a");
        cache.cache_plan(t("b"), "b");
        cache.get(&t("a"));
        cache.cache_plan(t("c"), "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&t("a")));
        assert!(!cache.contains(&t("b")));
    }

    #[test]
    fn zero_capacity_still_holds_one_plan() {
        let cache = PlanCache::new(0);
        cache.cache_plan(t("a"), "a");
        assert_eq!(cache.len(), 1);
    }
}
