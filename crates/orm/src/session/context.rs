//! Persistence Context - Per-session registry of managed entities and proxies
//!
//! Entities are held strongly and answer first-level-cache lookups by
//! [`EntityKey`]. Proxies are held weakly: the context records which
//! initializers belong to its session without keeping any proxy alive.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::entity::{EntityKey, EntityRecord};
use crate::proxy::LazyInitializer;

/// Registry of currently-managed entity instances and proxies
#[derive(Debug, Default)]
pub struct PersistenceContext {
    entities: DashMap<EntityKey, Arc<EntityRecord>>,
    proxies: DashMap<EntityKey, Weak<LazyInitializer>>,
}

impl PersistenceContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            proxies: DashMap::new(),
        }
    }

    /// Register a loaded entity under its key
    pub fn add_entity(&self, key: EntityKey, record: Arc<EntityRecord>) {
        self.entities.insert(key, record);
    }

    /// First-level-cache lookup by key
    pub fn get_entity(&self, key: &EntityKey) -> Option<Arc<EntityRecord>> {
        self.entities.get(key).map(|entry| entry.value().clone())
    }

    /// Whether an entity is resident under the given key
    pub fn contains_entity(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Register a proxy's initializer under its key
    pub fn register_proxy(&self, key: EntityKey, initializer: &Arc<LazyInitializer>) {
        self.proxies.insert(key, Arc::downgrade(initializer));
    }

    /// Look up a live proxy initializer by key, pruning dead entries
    pub fn proxy_for(&self, key: &EntityKey) -> Option<Arc<LazyInitializer>> {
        let upgraded = self.proxies.get(key).and_then(|entry| entry.value().upgrade());
        if upgraded.is_none() {
            self.proxies.remove(key);
        }
        upgraded
    }

    /// Whether this exact initializer is registered under the given key
    pub fn contains_proxy(&self, key: &EntityKey, initializer: &LazyInitializer) -> bool {
        self.proxies
            .get(key)
            .map_or(false, |entry| std::ptr::eq(entry.value().as_ptr(), initializer))
    }

    /// Drop both the entity and any proxy registered under the key
    pub fn evict(&self, key: &EntityKey) {
        self.entities.remove(key);
        self.proxies.remove(key);
    }

    /// Drop everything this context manages
    pub fn clear(&self) {
        self.entities.clear();
        self.proxies.clear();
    }

    /// Number of resident entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of registered proxy slots, dead or alive
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}
