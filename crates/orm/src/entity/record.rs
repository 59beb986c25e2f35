//! Entity Records - Dynamic in-memory representation of a single row
//!
//! A record carries the entity type, the identifier, and a field map of JSON
//! values. Typed entities materialize from records through the [`Entity`]
//! trait; the session machinery itself only ever moves records around.
//!
//! [`Entity`]: crate::entity::Entity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::EntityId;
use super::key::{EntityKey, EntityMode};

/// Dynamic entity instance: entity type, identifier, and field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    entity_name: String,
    id: EntityId,
    fields: Map<String, Value>,
}

impl EntityRecord {
    /// Create an empty record for the given entity type and identifier
    pub fn new(entity_name: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity_name: entity_name.into(),
            id,
            fields: Map::new(),
        }
    }

    /// Create a record from an already-assembled field map
    pub fn from_fields(
        entity_name: impl Into<String>,
        id: EntityId,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            id,
            fields,
        }
    }

    /// Entity type this record belongs to
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Identifier of the row this record mirrors
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Read a single field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Write a single field value
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Builder-style field assignment
    pub fn with_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set(field, value);
        self
    }

    /// Full field map
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Identity key of this record under the given representation mode
    pub fn key(&self, mode: EntityMode) -> EntityKey {
        EntityKey::new(self.entity_name.clone(), self.id.clone(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access() {
        let mut record = EntityRecord::new("Customer", EntityId::from(1))
            .with_field("id", serde_json::json!(1))
            .with_field("name", serde_json::json!("Ada"));
        assert_eq!(record.get("name"), Some(&serde_json::json!("Ada")));
        assert_eq!(record.get("missing"), None);

        record.set("name", serde_json::json!("Grace"));
        assert_eq!(record.get("name"), Some(&serde_json::json!("Grace")));
    }

    #[test]
    fn test_key_reflects_identity() {
        let record = EntityRecord::new("Customer", EntityId::from(9));
        let key = record.key(EntityMode::Typed);
        assert_eq!(key.entity_name(), "Customer");
        assert_eq!(key.id(), &EntityId::from(9));
    }
}
