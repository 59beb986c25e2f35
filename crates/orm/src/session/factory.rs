//! Session Factory - Shared configuration from which sessions are opened
//!
//! The factory owns the metadata registry, the backend store, the
//! entity-not-found policy, and one configured proxy factory per entity
//! type. All of these are injected at build time; nothing here is global.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::backends::EntityStore;
use crate::entity::{EntityId, EntityMetadata, MetadataRegistry};
use crate::error::{OrmError, OrmResult};
use crate::proxy::{ProxyConfig, ProxyFactory, RecordProxyFactory};

/// Policy deciding how to react when a referenced row is absent
///
/// Strict policies return an error carrying the exact entity/identifier
/// pair; lenient policies tolerate the absence and let the caller see `None`.
pub trait EntityNotFoundDelegate: Send + Sync {
    /// React to a missing row for the given identity
    fn handle(&self, entity_name: &str, id: &EntityId) -> OrmResult<()>;
}

/// Default policy: a missing row is an error
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictNotFoundDelegate;

impl EntityNotFoundDelegate for StrictNotFoundDelegate {
    fn handle(&self, entity_name: &str, id: &EntityId) -> OrmResult<()> {
        Err(OrmError::EntityNotFound {
            entity_name: entity_name.to_string(),
            id: id.clone(),
        })
    }
}

/// Lenient policy: a missing row is tolerated and surfaces as `None`
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreNotFoundDelegate;

impl EntityNotFoundDelegate for IgnoreNotFoundDelegate {
    fn handle(&self, _entity_name: &str, _id: &EntityId) -> OrmResult<()> {
        Ok(())
    }
}

/// Shared, immutable configuration behind every session
pub struct SessionFactory {
    metadata: MetadataRegistry,
    store: Arc<dyn EntityStore>,
    not_found: Arc<dyn EntityNotFoundDelegate>,
    proxy_factories: DashMap<String, Arc<dyn ProxyFactory>>,
}

impl SessionFactory {
    /// Start building a factory
    pub fn builder() -> SessionFactoryBuilder {
        SessionFactoryBuilder::new()
    }

    /// Entity descriptor registry
    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// Backend row source shared by all sessions
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Apply the configured not-found policy for the given identity
    pub fn entity_not_found(&self, entity_name: &str, id: &EntityId) -> OrmResult<()> {
        self.not_found.handle(entity_name, id)
    }

    /// Configured proxy factory for one entity type
    pub fn proxy_factory(&self, entity_name: &str) -> OrmResult<Arc<dyn ProxyFactory>> {
        self.proxy_factories
            .get(entity_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                OrmError::ProxyInstantiation(format!(
                    "no proxy factory configured for entity '{}'",
                    entity_name
                ))
            })
    }

}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("entities", &self.metadata.len())
            .finish()
    }
}

/// Builder for [`SessionFactory`]
pub struct SessionFactoryBuilder {
    metadata: MetadataRegistry,
    store: Option<Arc<dyn EntityStore>>,
    not_found: Arc<dyn EntityNotFoundDelegate>,
}

impl SessionFactoryBuilder {
    /// Create a builder with the strict not-found policy
    pub fn new() -> Self {
        Self {
            metadata: MetadataRegistry::new(),
            store: None,
            not_found: Arc::new(StrictNotFoundDelegate),
        }
    }

    /// Register one entity type
    pub fn entity(self, metadata: EntityMetadata) -> OrmResult<Self> {
        self.metadata.register(metadata)?;
        Ok(self)
    }

    /// Set the backend row source
    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the entity-not-found policy
    pub fn entity_not_found_delegate(mut self, delegate: Arc<dyn EntityNotFoundDelegate>) -> Self {
        self.not_found = delegate;
        self
    }

    /// Finish the factory, configuring one proxy factory per entity type
    pub fn build(self) -> OrmResult<Arc<SessionFactory>> {
        let store = self.store.ok_or_else(|| {
            OrmError::Configuration("session factory requires a backend store".to_string())
        })?;

        let proxy_factories: DashMap<String, Arc<dyn ProxyFactory>> = DashMap::new();
        for metadata in self.metadata.all() {
            let factory = RecordProxyFactory::new();
            factory.post_instantiate(ProxyConfig::from(metadata.as_ref()))?;
            proxy_factories.insert(metadata.name.clone(), Arc::new(factory) as Arc<dyn ProxyFactory>);
        }

        debug!("Built session factory with {} entity types", self.metadata.len());
        Ok(Arc::new(SessionFactory {
            metadata: self.metadata,
            store,
            not_found: self.not_found,
            proxy_factories,
        }))
    }
}

impl Default for SessionFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
