//! Proxy Factory - Per-entity-type construction of lazy proxies
//!
//! A factory is configured exactly once per entity type and then stamps out
//! proxy handles bound to fresh initializers. It never caches: deduplication
//! against the persistence context is the session's job.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::entity::{EntityId, EntityMetadata, EntityMode};
use crate::error::{OrmError, OrmResult};
use crate::session::SessionImplementor;

use super::handle::EntityProxy;
use super::initializer::LazyInitializer;

/// One-time configuration for proxies of a single entity type
///
/// Recording the identifier field name here is what lets proxy handles
/// answer identifier reads without forcing initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// Entity type the proxies stand in for
    pub entity_name: String,
    /// Field holding the identifier in record form
    pub id_field: String,
    /// Representation mode of the proxied type
    pub mode: EntityMode,
}

impl From<&EntityMetadata> for ProxyConfig {
    fn from(metadata: &EntityMetadata) -> Self {
        Self {
            entity_name: metadata.name.clone(),
            id_field: metadata.id_field.clone(),
            mode: metadata.mode,
        }
    }
}

/// Builds proxy instances for one entity type
pub trait ProxyFactory: Send + Sync {
    /// One-time setup; calling twice is a configuration error
    fn post_instantiate(&self, config: ProxyConfig) -> OrmResult<()>;

    /// Produce a new proxy bound to a fresh initializer
    ///
    /// Safe to call repeatedly for the same identifier; every call yields an
    /// independent proxy.
    fn get_proxy(
        &self,
        id: EntityId,
        session: &Arc<dyn SessionImplementor>,
    ) -> OrmResult<EntityProxy>;
}

/// Default factory producing record-backed proxy handles
#[derive(Debug, Default)]
pub struct RecordProxyFactory {
    config: OnceCell<ProxyConfig>,
}

impl RecordProxyFactory {
    /// Create an unconfigured factory
    pub fn new() -> Self {
        Self {
            config: OnceCell::new(),
        }
    }
}

impl ProxyFactory for RecordProxyFactory {
    fn post_instantiate(&self, config: ProxyConfig) -> OrmResult<()> {
        let entity_name = config.entity_name.clone();
        self.config.set(config).map_err(|_| {
            OrmError::ProxyInstantiation(format!(
                "proxy factory for entity '{}' configured twice",
                entity_name
            ))
        })
    }

    fn get_proxy(
        &self,
        id: EntityId,
        session: &Arc<dyn SessionImplementor>,
    ) -> OrmResult<EntityProxy> {
        let config = self.config.get().ok_or_else(|| {
            OrmError::ProxyInstantiation(
                "proxy factory used before post_instantiate".to_string(),
            )
        })?;
        let initializer = LazyInitializer::new(config.entity_name.clone(), id, session);
        Ok(EntityProxy::from_parts(initializer, config.id_field.clone()))
    }
}
