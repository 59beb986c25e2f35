//! Entity Keys - Unique identity of a managed entity within one persistence context
//!
//! A key combines identifier, entity type, and representation mode. It is the
//! sole address for answering "is this entity already resident in this
//! context", independent of whether the resident copy is a proxy or a fully
//! loaded record.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// Representation mode of a managed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityMode {
    /// Backed by a typed application struct
    Typed,
    /// Backed only by a dynamic field map
    Dynamic,
}

/// Unique identity of an entity instance within one persistence context
///
/// Two keys are equal iff identifier, entity type, and mode are all equal.
/// Keys are immutable once constructed and are discarded with the owning
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    entity_name: String,
    id: EntityId,
    mode: EntityMode,
}

impl EntityKey {
    /// Create a key from its three identity components
    pub fn new(entity_name: impl Into<String>, id: EntityId, mode: EntityMode) -> Self {
        Self {
            entity_name: entity_name.into(),
            id,
            mode,
        }
    }

    /// Entity type this key addresses
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Identifier component
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Representation mode component
    pub fn mode(&self) -> EntityMode {
        self.mode
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_name, self.id)
    }
}
