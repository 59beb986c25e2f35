//! Entity Identifiers - Opaque identifier values for persistent entities
//!
//! Identifiers are hashable, ordered value types so they can address entries
//! in the persistence context and be carried by uninitialized proxies without
//! touching the underlying row.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier value for a persistent entity
///
/// Composite identifiers nest; the components keep their own ordering, so a
/// composite key is comparable as long as its shape is stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric surrogate key
    Int(i64),
    /// UUID surrogate key
    Uuid(Uuid),
    /// Natural string key
    Text(String),
    /// Composite key made of ordered components
    Composite(Vec<EntityId>),
}

impl EntityId {
    /// Render the identifier as a plain JSON value for field-level access
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            EntityId::Int(value) => serde_json::Value::from(*value),
            EntityId::Uuid(value) => serde_json::Value::String(value.to_string()),
            EntityId::Text(value) => serde_json::Value::String(value.clone()),
            EntityId::Composite(parts) => {
                serde_json::Value::Array(parts.iter().map(EntityId::as_json).collect())
            }
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(value) => write!(f, "{}", value),
            EntityId::Uuid(value) => write!(f, "{}", value),
            EntityId::Text(value) => write!(f, "{}", value),
            EntityId::Composite(parts) => {
                write!(f, "[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Int(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        EntityId::Int(i64::from(value))
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        EntityId::Uuid(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Text(value)
    }
}

impl From<Vec<EntityId>> for EntityId {
    fn from(parts: Vec<EntityId>) -> Self {
        EntityId::Composite(parts)
    }
}
