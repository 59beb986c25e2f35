//! Audit Reader - Point-in-time entity lookup with a per-reader cache
//!
//! The reader answers "what did this entity look like at revision N" from
//! the audit store, caching resolved snapshots per (entity, id, revision) so
//! repeated traversals of one historical graph hit the store once. The cache
//! is the reader's own; historical state is never placed in a live session's
//! persistence context.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use veil_orm::{EntityId, EntityRecord, OrmResult};

use crate::revision::RevisionNumber;
use crate::store::AuditStore;

/// Read access to historical entity state
pub struct AuditReader {
    store: Arc<dyn AuditStore>,
    cache: DashMap<(String, EntityId, RevisionNumber), Arc<EntityRecord>>,
}

impl AuditReader {
    /// Create a reader over the given trail store
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    /// Underlying trail store
    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Resolve the entity state at the given revision
    ///
    /// `include_deleted` widens the accepted change kinds to removals, for
    /// traversals of graphs that themselves contain deleted entities; a
    /// removal still resolves to `None` since it carries no snapshot.
    pub async fn find(
        &self,
        entity_name: &str,
        id: &EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        let key = (entity_name.to_string(), id.clone(), revision);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Some(hit.value().clone()));
        }

        let entry = self
            .store
            .entry_at(entity_name, id, revision, include_deleted)
            .await?;
        match entry.and_then(|entry| entry.snapshot) {
            Some(snapshot) => {
                debug!("Resolved {}#{} at {}", entity_name, id, revision);
                let record = Arc::new(snapshot);
                self.cache.insert(key, record.clone());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Number of cached snapshots
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::store::{MemoryAuditStore, RevisionEntry};

    use super::*;

    struct CountingAuditStore {
        inner: MemoryAuditStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AuditStore for CountingAuditStore {
        async fn entry_at(
            &self,
            entity_name: &str,
            id: &EntityId,
            revision: RevisionNumber,
            include_deleted: bool,
        ) -> OrmResult<Option<RevisionEntry>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.entry_at(entity_name, id, revision, include_deleted).await
        }

        fn head(&self) -> RevisionNumber {
            self.inner.head()
        }
    }

    #[tokio::test]
    async fn test_repeated_finds_hit_cache() {
        let inner = MemoryAuditStore::new();
        let revision = inner.record_add(
            EntityRecord::new("Order", EntityId::from(1)).with_field("id", serde_json::json!(1)),
        );
        let store = Arc::new(CountingAuditStore {
            inner,
            lookups: AtomicUsize::new(0),
        });
        let reader = AuditReader::new(store.clone());

        let first = reader.find("Order", &EntityId::from(1), revision, false).await.unwrap().unwrap();
        let second = reader.find("Order", &EntityId::from(1), revision, false).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(reader.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_absent_state_is_not_cached() {
        let store = Arc::new(MemoryAuditStore::new());
        let reader = AuditReader::new(store);

        let missing = reader
            .find("Order", &EntityId::from(9), RevisionNumber(5), false)
            .await
            .unwrap();
        assert!(missing.is_none());
        assert_eq!(reader.cached_len(), 0);
    }
}
