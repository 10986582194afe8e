//! Read cache shared by every resource of a client
//!
//! Entries are keyed by resource and query. Invalidation never drops data:
//! it marks entries stale so the next read goes back to the server while
//! callers holding the old value keep it.

use crate::core::resource::RecordId;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// What a cached read covers within its resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    /// A single record
    One(RecordId),
    /// A list, keyed by its serialized query string
    List(String),
    /// Several records fetched by id
    Many(Vec<RecordId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub scope: QueryScope,
}

impl QueryKey {
    pub fn one(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::One(id.to_string()),
        }
    }

    pub fn list(resource: &str, query: &str) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::List(query.to_string()),
        }
    }

    pub fn many(resource: &str, ids: &[RecordId]) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::Many(ids.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    /// Bumped on every invalidation of a resource
    generations: HashMap<String, u64>,
}

/// Shared query cache
///
/// Cheap to clone; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    state: Arc<RwLock<CacheState>>,
    stale_time: Option<Duration>,
}

impl QueryCache {
    /// Entries stay fresh until invalidated
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries also go stale `stale_time` after they were fetched
    pub fn with_stale_time(stale_time: Option<Duration>) -> Self {
        Self {
            state: Arc::default(),
            stale_time,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        if entry.stale {
            return false;
        }
        match self.stale_time.map(TimeDelta::from_std) {
            None => true,
            Some(Ok(max_age)) => Utc::now() - entry.fetched_at < max_age,
            Some(Err(_)) => true,
        }
    }

    /// Cached data, only if still fresh
    pub fn get_fresh(&self, key: &QueryKey) -> Option<Value> {
        self.read()
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.data.clone())
    }

    /// Cached entry, fresh or not
    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.read().entries.get(key).cloned()
    }

    /// `Some(true)` when the entry exists and must be refetched
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.read()
            .entries
            .get(key)
            .map(|entry| !self.is_fresh(entry))
    }

    /// Invalidation generation of `resource`
    ///
    /// Capture it before sending a read and hand it to
    /// [`insert_fetched`](Self::insert_fetched) once the response arrives.
    pub fn generation(&self, resource: &str) -> u64 {
        self.read().generations.get(resource).copied().unwrap_or(0)
    }

    /// Store fresh data
    pub fn insert(&self, key: QueryKey, data: Value) {
        self.write().entries.insert(
            key,
            CacheEntry {
                data,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Store data read while the resource was at `generation`
    ///
    /// When the resource was invalidated in the meantime the data predates
    /// that write, so it is stored already stale. Returns whether the entry
    /// is fresh.
    pub fn insert_fetched(&self, key: QueryKey, data: Value, generation: u64) -> bool {
        let mut state = self.write();
        let current = state.generations.get(&key.resource).copied().unwrap_or(0);
        let fresh = current == generation;

        state.entries.insert(
            key,
            CacheEntry {
                data,
                fetched_at: Utc::now(),
                stale: !fresh,
            },
        );
        fresh
    }

    /// Mark every entry of `resource` stale, returning how many were marked
    pub fn invalidate_resource(&self, resource: &str) -> usize {
        self.invalidate_resources([resource])
    }

    /// Mark every entry of the given resources stale in one pass
    ///
    /// Reads of these resources still in flight will be stored stale.
    pub fn invalidate_resources<'a>(&self, resources: impl IntoIterator<Item = &'a str>) -> usize {
        let resources: Vec<&str> = resources.into_iter().collect();
        let mut state = self.write();

        for resource in &resources {
            let generation = state.generations.entry(resource.to_string()).or_insert(0);
            *generation = generation.wrapping_add(1);
        }

        let mut marked = 0;
        for (key, entry) in state.entries.iter_mut() {
            if resources.contains(&key.resource.as_str()) {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().entries.clear();
    }
}
