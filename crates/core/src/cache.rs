//! Accessor cache
//!
//! Maps a request's identity to its compiled accessor. At most one accessor
//! is observable per distinct key: compilation runs outside the map lock and
//! publication is insert-if-absent, so a thread that loses a compile race
//! drops its own result and returns the accessor that won.
//!
//! Entries are [`CacheStrategy::Temporary`] by default. A temporary entry
//! stays cached until memory pressure is signalled, either by an explicit
//! [`AccessorCache::purge`] or by the cache growing past its soft limit; only
//! then are the entries no caller still holds reclaimed.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::ReflectResult;

type Erased = dyn Any + Send + Sync;

/// Whether a cache entry can be reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Reclaimable under memory pressure once no caller holds the accessor
    #[default]
    Temporary,
    /// Held for the lifetime of the cache
    Permanent,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    /// Compiled accessors discarded because another thread published first
    pub rejected: u64,
    /// Temporary entries reclaimed by purges
    pub reclaimed: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    rejected: AtomicU64,
    reclaimed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Identity key → compiled accessor.
pub struct AccessorCache<K> {
    entries: DashMap<K, Arc<Erased>>,
    strategy: CacheStrategy,
    soft_limit: Option<usize>,
    counters: Counters,
}

impl<K> AccessorCache<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new(strategy: CacheStrategy) -> Self {
        Self::with_soft_limit(strategy, None)
    }

    /// Cache that purges itself whenever a publication takes it past
    /// `soft_limit` entries. The limit is ignored for permanent caches.
    pub fn with_soft_limit(strategy: CacheStrategy, soft_limit: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            strategy,
            soft_limit,
            counters: Counters::default(),
        }
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    pub fn soft_limit(&self) -> Option<usize> {
        self.soft_limit
    }

    /// Returns the accessor published for `key`, compiling it on a miss.
    ///
    /// `compile` receives a working copy of the key that it may annotate
    /// (resolution results). The cache stores the key as requested.
    pub fn get_or_compile<A, F>(&self, key: &K, compile: F) -> ReflectResult<Arc<A>>
    where
        A: Any + Send + Sync,
        F: FnOnce(&mut K) -> ReflectResult<A>,
    {
        if let Some(found) = self.lookup::<A>(key) {
            Counters::bump(&self.counters.hits);
            trace!("Accessor cache hit for {:?}", key);
            return Ok(found);
        }
        Counters::bump(&self.counters.misses);

        let mut working = key.clone();
        let compiled = Arc::new(compile(&mut working)?);
        Counters::bump(&self.counters.compilations);
        debug!("Compiled accessor for {:?}", key);

        let erased: Arc<Erased> = compiled.clone();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                if let Ok(live) = Arc::clone(occupied.get()).downcast::<A>() {
                    Counters::bump(&self.counters.rejected);
                    trace!("Discarding duplicate accessor for {:?}", key);
                    return Ok(live);
                }
                warn!("Not replacing accessor of another type cached for {:?}", key);
                return Ok(compiled);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(erased);
            }
        }

        if self.over_soft_limit() {
            let reclaimed = self.purge();
            debug!(
                "Accessor cache passed its soft limit, reclaimed {} entries",
                reclaimed
            );
        }
        Ok(compiled)
    }

    fn lookup<A: Any + Send + Sync>(&self, key: &K) -> Option<Arc<A>> {
        let erased = Arc::clone(self.entries.get(key)?.value());
        match erased.downcast::<A>() {
            Ok(accessor) => Some(accessor),
            Err(_) => {
                warn!("Cached accessor for {:?} has an unexpected type", key);
                None
            }
        }
    }

    fn over_soft_limit(&self) -> bool {
        self.strategy == CacheStrategy::Temporary
            && self.soft_limit.is_some_and(|limit| self.entries.len() > limit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signals memory pressure: reclaims temporary entries whose accessor
    /// is held by no caller. Returns the number of entries removed.
    ///
    /// Permanent caches are left untouched.
    pub fn purge(&self) -> usize {
        if self.strategy == CacheStrategy::Permanent {
            return 0;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, accessor| Arc::strong_count(accessor) > 1);
        let reclaimed = before.saturating_sub(self.entries.len());
        self.counters
            .reclaimed
            .fetch_add(reclaimed as u64, Ordering::Relaxed);
        reclaimed
    }

    /// Drops every entry. Accessors already handed out stay valid.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            compilations: c.compilations.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            reclaimed: c.reclaimed.load(Ordering::Relaxed),
        }
    }
}

impl<K: Eq + Hash> fmt::Debug for AccessorCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorCache")
            .field("strategy", &self.strategy)
            .field("soft_limit", &self.soft_limit)
            .field("entries", &self.entries.len())
            .finish()
    }
}
