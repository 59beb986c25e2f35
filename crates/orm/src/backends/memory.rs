//! In-Memory Store - Reference backend for tests and embedders that manage rows themselves

use async_trait::async_trait;
use dashmap::DashMap;

use crate::entity::{EntityId, EntityRecord};
use crate::error::OrmResult;

use super::EntityStore;

/// Process-local row store keyed by entity type and identifier
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, DashMap<EntityId, EntityRecord>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Insert or replace a row; the record's own entity type names the table
    pub fn insert(&self, record: EntityRecord) {
        self.tables
            .entry(record.entity_name().to_string())
            .or_insert_with(DashMap::new)
            .insert(record.id().clone(), record);
    }

    /// Remove a row, returning it if present
    pub fn remove(&self, entity_name: &str, id: &EntityId) -> Option<EntityRecord> {
        self.tables
            .get(entity_name)?
            .remove(id)
            .map(|(_, record)| record)
    }

    /// Number of rows held for one entity type
    pub fn len(&self, entity_name: &str) -> usize {
        self.tables.get(entity_name).map_or(0, |table| table.len())
    }

    /// Whether the store holds no rows at all
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(|table| table.is_empty())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, entity_name: &str, id: &EntityId) -> OrmResult<Option<EntityRecord>> {
        Ok(self
            .tables
            .get(entity_name)
            .and_then(|table| table.get(id).map(|entry| entry.value().clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: i64, name: &str) -> EntityRecord {
        EntityRecord::new("Customer", EntityId::from(id))
            .with_field("id", serde_json::json!(id))
            .with_field("name", serde_json::json!(name))
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let store = MemoryStore::new();
        store.insert(customer(1, "Ada"));

        let fetched = store.fetch("Customer", &EntityId::from(1)).await.unwrap();
        assert_eq!(fetched.unwrap().get("name"), Some(&serde_json::json!("Ada")));
    }

    #[tokio::test]
    async fn test_absent_row_is_none() {
        let store = MemoryStore::new();
        assert!(store.fetch("Customer", &EntityId::from(404)).await.unwrap().is_none());
        assert!(store.fetch("Ghost", &EntityId::from(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::new();
        store.insert(customer(1, "Ada"));
        assert!(store.remove("Customer", &EntityId::from(1)).is_some());
        assert!(store.fetch("Customer", &EntityId::from(1)).await.unwrap().is_none());
        assert_eq!(store.len("Customer"), 0);
    }
}
