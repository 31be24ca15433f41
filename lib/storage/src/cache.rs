use dashmap::DashMap;
use rdf_entity_model::{EntityTypeId, GraphId, ReconstructedEntity};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cache tier that outlives the process-local tier (e.g., a shared key-value store).
///
/// Values are opaque bytes. Implementations must apply each call atomically per key.
pub trait CacheBackend: Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&self, key: &str, value: Vec<u8>);

    fn delete(&self, keys: &[String]);

    /// Removes all entries.
    fn clear(&self);
}

/// A [CacheBackend] that keeps all entries in memory.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, Vec<u8>, BuildHasherDefault<FxHasher>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|value| value.clone())
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.entries.insert(key.to_owned(), value);
    }

    fn delete(&self, keys: &[String]) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// What the cache knows about an entity in a single graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CacheEntry {
    /// The entity exists in the graph with these values.
    Present(ReconstructedEntity),
    /// The entity has no triples in the graph.
    Absent,
}

/// The answer of [EntityCache::lookup].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    /// The cache proves that this entity wins the priority cascade.
    Found(ReconstructedEntity),
    /// The cache proves that the entity exists in none of the graphs.
    NotFound,
    /// The cache cannot decide the cascade.
    Miss,
}

/// Identifies the cache state a load started from. Loads only populate the cache if no
/// invalidation happened in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

type CacheKey = (EntityTypeId, String);

/// The cached entries of an entity, keyed by graph.
type CachedGraphs = BTreeMap<GraphId, CacheEntry>;

/// Caches reconstructed entities per `(entity, graph)`.
///
/// Lookups consult the static (process-local) tier first and the persistent tier second. Writes
/// to the cache and invalidations of an entity are serialized by the lock of its slot, hence a
/// lookup never observes a partially invalidated entity. Only entities with cached entries own a
/// slot.
#[derive(Debug)]
pub struct EntityCache {
    /// Bumped by every invalidation and by [EntityCache::clear].
    generation: AtomicU64,
    slots: DashMap<CacheKey, CachedGraphs, BuildHasherDefault<FxHasher>>,
    static_tier: bool,
    persistent: Option<Arc<dyn CacheBackend>>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl EntityCache {
    /// Creates a new cache. Without a static tier and a persistent backend, nothing is cached.
    pub fn new(static_tier: bool, persistent: Option<Arc<dyn CacheBackend>>) -> Self {
        Self {
            generation: AtomicU64::new(0),
            slots: DashMap::with_hasher(BuildHasherDefault::default()),
            static_tier,
            persistent,
        }
    }

    /// Captures the generation before the store is read.
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Returns the number of entities with entries in the static tier.
    pub fn cached_entities(&self) -> usize {
        self.slots.len()
    }

    /// Resolves the priority cascade of `id` from cached entries.
    pub fn lookup(&self, entity_type: &EntityTypeId, id: &str, priority: &[GraphId]) -> CacheLookup {
        let generation = self.generation();
        let key = (entity_type.clone(), id.to_owned());
        for graph in priority {
            let cached = self
                .slots
                .get(&key)
                .and_then(|graphs| graphs.get(graph).cloned());
            let entry = match cached {
                Some(entry) => Some(entry),
                None => self
                    .read_persistent(entity_type, graph, id)
                    .inspect(|entry| self.promote(&key, generation, graph, entry)),
            };
            match entry {
                Some(CacheEntry::Present(entity)) => {
                    tracing::debug!("Cache hit for entity {id} in graph {graph}");
                    return CacheLookup::Found(entity);
                }
                Some(CacheEntry::Absent) => {}
                None => {
                    tracing::debug!("Cache miss for entity {id} in graph {graph}");
                    return CacheLookup::Miss;
                }
            }
        }
        CacheLookup::NotFound
    }

    /// Records the outcome of loading `id` from the store with the given `priority`.
    ///
    /// Every graph before the winning graph is recorded as absent. Graphs after it are unknown. If
    /// the cache was invalidated after `generation` was captured, nothing is recorded.
    pub fn populate(
        &self,
        entity_type: &EntityTypeId,
        id: &str,
        generation: Generation,
        priority: &[GraphId],
        entity: Option<&ReconstructedEntity>,
    ) {
        let key = (entity_type.clone(), id.to_owned());
        let mut slot = self.slots.entry(key.clone()).or_default();
        if self.generation() == generation {
            for graph in priority {
                let entry = match entity {
                    Some(entity) if entity.graph == *graph => CacheEntry::Present(entity.clone()),
                    _ => CacheEntry::Absent,
                };
                let is_present = matches!(entry, CacheEntry::Present(_));
                self.write_persistent(entity_type, graph, id, &entry);
                if self.static_tier {
                    slot.insert(graph.clone(), entry);
                }
                if is_present {
                    break;
                }
            }
        } else {
            tracing::debug!("Entity {id} changed while it was loaded, not caching it");
        }
        drop(slot);
        self.slots.remove_if(&key, |_, graphs| graphs.is_empty());
    }

    /// Drops all entries of `id` in `graphs`, which must be all graphs of the entity type.
    ///
    /// Loads that started before the invalidation do not populate the cache.
    pub fn invalidate<'g>(
        &self,
        entity_type: &EntityTypeId,
        id: &str,
        graphs: impl IntoIterator<Item = &'g GraphId>,
    ) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        // Waits for a concurrent population of this entity to finish.
        self.slots.remove(&(entity_type.clone(), id.to_owned()));
        if let Some(persistent) = &self.persistent {
            let keys = graphs
                .into_iter()
                .map(|graph| persistent_key(entity_type, graph, id))
                .collect::<Vec<_>>();
            persistent.delete(&keys);
        }
        tracing::debug!("Invalidated cached entity {id}");
    }

    /// Drops all entries of all entities.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.slots.clear();
        if let Some(persistent) = &self.persistent {
            persistent.clear();
        }
        tracing::debug!("Cleared the entity cache");
    }

    /// Copies an entry of the persistent tier into the static tier.
    fn promote(&self, key: &CacheKey, generation: Generation, graph: &GraphId, entry: &CacheEntry) {
        if !self.static_tier {
            return;
        }
        let mut slot = self.slots.entry(key.clone()).or_default();
        if self.generation() == generation {
            slot.insert(graph.clone(), entry.clone());
        }
        drop(slot);
        self.slots.remove_if(key, |_, graphs| graphs.is_empty());
    }

    fn read_persistent(
        &self,
        entity_type: &EntityTypeId,
        graph: &GraphId,
        id: &str,
    ) -> Option<CacheEntry> {
        let bytes = self
            .persistent
            .as_ref()?
            .get(&persistent_key(entity_type, graph, id))?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!("Ignoring unreadable cache entry of {id} in graph {graph}: {error}");
                None
            }
        }
    }

    fn write_persistent(
        &self,
        entity_type: &EntityTypeId,
        graph: &GraphId,
        id: &str,
        entry: &CacheEntry,
    ) {
        let Some(persistent) = &self.persistent else {
            return;
        };
        match serde_json::to_vec(entry) {
            Ok(bytes) => persistent.set(&persistent_key(entity_type, graph, id), bytes),
            Err(error) => tracing::warn!("Cannot cache entity {id}: {error}"),
        }
    }
}

fn persistent_key(entity_type: &EntityTypeId, graph: &GraphId, id: &str) -> String {
    format!("{entity_type}:{graph}:{id}")
}
