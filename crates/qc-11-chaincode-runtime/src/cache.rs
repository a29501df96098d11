//! # Business Network Definition Cache
//!
//! Parsing an archive is expensive and archives are content-addressed, so
//! parsed definitions are kept by hash and shared between every context that
//! references the same deployed network.
//!
//! ## Concurrency
//!
//! One cache is shared by all concurrent contexts (`Arc<DefinitionCache>`).
//! Entries are immutable, so two contexts racing to `put` the same hash both
//! store an equivalent definition; the later write wins and nothing else is
//! affected.

use crate::domain::network::BusinessNetworkDefinition;
use crate::domain::value_objects::NetworkHash;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Number of definitions kept when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Capacity-bounded LRU cache of parsed business networks.
///
/// ## Invariant
///
/// `len() <= capacity()` (enforced via LRU eviction)
pub struct DefinitionCache {
    entries: Mutex<LruCache<NetworkHash, Arc<BusinessNetworkDefinition>>>,
}

impl DefinitionCache {
    /// Creates a cache holding [`DEFAULT_CACHE_CAPACITY`] definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding `capacity` definitions (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up a definition, marking it most recently used.
    #[must_use]
    pub fn get(&self, hash: &NetworkHash) -> Option<Arc<BusinessNetworkDefinition>> {
        self.entries.lock().get(hash).cloned()
    }

    /// Stores a definition, returning the hash evicted to make room.
    pub fn put(
        &self,
        hash: NetworkHash,
        definition: Arc<BusinessNetworkDefinition>,
    ) -> Option<NetworkHash> {
        let evicted = self
            .entries
            .lock()
            .push(hash.clone(), definition)
            .map(|(old, _)| old)
            .filter(|old| *old != hash);
        if let Some(old) = &evicted {
            debug!(evicted = %old, inserted = %hash, "Evicted business network from cache");
        }
        evicted
    }

    /// Whether `hash` is cached. Does not affect recency.
    #[must_use]
    pub fn contains(&self, hash: &NetworkHash) -> bool {
        self.entries.lock().contains(hash)
    }

    /// Number of cached definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of cached definitions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl Default for DefinitionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefinitionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("DefinitionCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
