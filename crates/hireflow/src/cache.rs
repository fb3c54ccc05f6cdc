//! Memoized record fetches.
//!
//! Entries are keyed by the JSON signature of the [`ApplicationFilter`] that
//! produced them. Any mutation of application records invalidates the whole
//! cache, since a single status change can move a record in or out of any
//! cached listing.
//!
//! A fetch that started before an invalidation must not repopulate the
//! cache with the rows it read. Callers take a [`QueryCache::generation`]
//! before fetching and hand it back to [`QueryCache::insert_if_current`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::application::{ApplicationFilter, ApplicationRecord};

/// TTL cache of record listings.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<String, Arc<Vec<ApplicationRecord>>>,
    generation: Arc<AtomicU64>,
}

impl QueryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            entries,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter bumped by every [`invalidate_all`](Self::invalidate_all).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cache key for a filter. Two filters with equal fields share a key.
    pub fn signature(filter: &ApplicationFilter) -> String {
        // Serialising a plain struct of options cannot fail, but fall back
        // to the debug form rather than panic.
        serde_json::to_string(filter).unwrap_or_else(|_| format!("{:?}", filter))
    }

    pub fn get(&self, filter: &ApplicationFilter) -> Option<Arc<Vec<ApplicationRecord>>> {
        let hit = self.entries.get(&Self::signature(filter));
        tracing::trace!(hit = hit.is_some(), "Query cache lookup");
        hit
    }

    pub fn insert(
        &self,
        filter: &ApplicationFilter,
        records: Vec<ApplicationRecord>,
    ) -> Arc<Vec<ApplicationRecord>> {
        let records = Arc::new(records);
        self.entries.insert(Self::signature(filter), Arc::clone(&records));
        records
    }

    /// Caches `records` unless the cache was invalidated since `generation`
    /// was read. The records are returned either way.
    pub fn insert_if_current(
        &self,
        filter: &ApplicationFilter,
        records: Vec<ApplicationRecord>,
        generation: u64,
    ) -> Arc<Vec<ApplicationRecord>> {
        let records = Arc::new(records);
        if self.generation() != generation {
            tracing::debug!("Skipping cache fill from a superseded fetch");
            return records;
        }

        let key = Self::signature(filter);
        self.entries.insert(key.clone(), Arc::clone(&records));
        // An invalidation may have slipped in between the check and the insert.
        if self.generation() != generation {
            self.entries.invalidate(&key);
        }
        records
    }

    /// Drops every cached listing.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
        tracing::debug!("Query cache invalidated");
    }
}
