//! Entity Metadata - Per-type descriptors and the runtime registry
//!
//! Metadata is registered once at factory build time and consulted by the
//! session and proxy machinery for identifier field names, representation
//! mode, proxy support, and audit participation. Whether a type supports
//! proxying is an injected flag here, never re-derived by the core.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};

use super::key::EntityMode;

/// Descriptor for one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity type name, unique within one factory
    pub name: String,

    /// Field holding the identifier in record form
    pub id_field: String,

    /// Representation mode instances of this type are managed under
    pub mode: EntityMode,

    /// Whether lazy proxies may stand in for instances of this type
    pub proxyable: bool,

    /// Whether this type participates in revision auditing
    pub audited: bool,
}

impl EntityMetadata {
    /// Create a descriptor with the default field layout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            mode: EntityMode::Typed,
            proxyable: true,
            audited: false,
        }
    }

    /// Override the identifier field name
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Override the representation mode
    pub fn with_mode(mut self, mode: EntityMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mark this type as unsuitable for proxying; it will always load eagerly
    pub fn without_proxying(mut self) -> Self {
        self.proxyable = false;
        self
    }

    /// Enroll this type in revision auditing
    pub fn with_audit(mut self) -> Self {
        self.audited = true;
        self
    }

    /// Validate the descriptor before registration
    pub fn validate(&self) -> OrmResult<()> {
        if self.name.is_empty() {
            return Err(OrmError::Metadata("entity name must not be empty".to_string()));
        }
        if self.id_field.is_empty() {
            return Err(OrmError::Metadata(format!(
                "entity '{}' must name an identifier field",
                self.name
            )));
        }
        Ok(())
    }
}

/// Thread-safe registry of entity descriptors keyed by entity name
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: Arc<DashMap<String, Arc<EntityMetadata>>>,
}

impl MetadataRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entities: Arc::new(DashMap::new()),
        }
    }

    /// Register a descriptor, replacing any previous one for the same name
    pub fn register(&self, metadata: EntityMetadata) -> OrmResult<()> {
        metadata.validate()?;
        self.entities.insert(metadata.name.clone(), Arc::new(metadata));
        Ok(())
    }

    /// Look up a descriptor by entity name
    pub fn get(&self, entity_name: &str) -> Option<Arc<EntityMetadata>> {
        self.entities.get(entity_name).map(|entry| entry.value().clone())
    }

    /// Look up a descriptor, failing for unregistered names
    pub fn require(&self, entity_name: &str) -> OrmResult<Arc<EntityMetadata>> {
        self.get(entity_name).ok_or_else(|| {
            OrmError::Metadata(format!("unknown entity type '{}'", entity_name))
        })
    }

    /// Snapshot of every registered descriptor
    pub fn all(&self) -> Vec<Arc<EntityMetadata>> {
        self.entities.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of registered entity types
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
