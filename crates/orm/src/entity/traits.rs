//! Entity Trait - Typed materialization over dynamic records
//!
//! Application structs opt into the mapper by implementing [`Entity`]. The
//! serde-backed default methods convert between the struct and its record
//! form; the session machinery never needs to know the concrete type.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{OrmError, OrmResult};

use super::id::EntityId;
use super::metadata::EntityMetadata;
use super::record::EntityRecord;

/// Core trait for typed persistent entities
pub trait Entity: Serialize + DeserializeOwned + Debug + Send + Sync {
    /// Entity type name, unique within one factory
    fn entity_name() -> &'static str;

    /// Field holding the identifier in record form
    fn id_field() -> &'static str {
        "id"
    }

    /// Identifier value of this instance
    fn identifier(&self) -> EntityId;

    /// Convert this instance into its record form
    fn to_record(&self) -> OrmResult<EntityRecord> {
        let value = serde_json::to_value(self)?;
        let fields = match value {
            Value::Object(map) => map,
            other => {
                return Err(OrmError::Serialization(format!(
                    "entity '{}' must serialize to an object, got {}",
                    Self::entity_name(),
                    other
                )))
            }
        };
        Ok(EntityRecord::from_fields(
            Self::entity_name(),
            self.identifier(),
            fields,
        ))
    }

    /// Materialize an instance from a record, checking the entity type
    fn from_record(record: &EntityRecord) -> OrmResult<Self>
    where
        Self: Sized,
    {
        if record.entity_name() != Self::entity_name() {
            return Err(OrmError::WrongType {
                expected: Self::entity_name().to_string(),
                actual: record.entity_name().to_string(),
            });
        }
        let value = Value::Object(record.fields().clone());
        Ok(serde_json::from_value(value)?)
    }

    /// Default metadata descriptor for this type
    fn metadata() -> EntityMetadata {
        EntityMetadata::new(Self::entity_name()).with_id_field(Self::id_field())
    }
}
