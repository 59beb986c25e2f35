//! Proxy Handles - Explicit dereferencing over lazy entity references
//!
//! Rust has no transparent method interception, so consumption points go
//! through an explicit handle: identifier reads answer from the initializer
//! without loading, while any other access forces initialization first. The
//! handle is cheap to clone; clones share one initializer.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::entity::{Entity, EntityId, EntityRecord};
use crate::error::OrmResult;
use crate::session::SessionImplementor;

use super::initializer::LazyInitializer;

/// Stand-in for an entity that defers loading until first accessed
#[derive(Clone)]
pub struct EntityProxy {
    initializer: Arc<LazyInitializer>,
    id_field: String,
    retained_session: Option<Arc<dyn SessionImplementor>>,
}

impl EntityProxy {
    /// Assemble a handle over an existing initializer
    pub fn from_parts(initializer: Arc<LazyInitializer>, id_field: String) -> Self {
        Self {
            initializer,
            id_field,
            retained_session: None,
        }
    }

    /// The lazy-loading state behind this handle
    pub fn lazy_initializer(&self) -> &Arc<LazyInitializer> {
        &self.initializer
    }

    /// Entity type this proxy stands in for
    pub fn entity_name(&self) -> &str {
        self.initializer.entity_name()
    }

    /// Identifier of the referenced row; never triggers a load
    pub fn identifier(&self) -> EntityId {
        self.initializer.identifier()
    }

    /// Whether the target has not been loaded yet
    pub fn is_uninitialized(&self) -> bool {
        self.initializer.is_uninitialized()
    }

    /// Keep a session decorator alive for as long as this handle lives
    ///
    /// The initializer itself only ever holds a weak session reference;
    /// loaders that bind proxies to a wrapper session park the wrapper here
    /// so it survives until the proxy is dropped.
    pub fn retain_session(&mut self, session: Arc<dyn SessionImplementor>) {
        self.retained_session = Some(session);
    }

    /// The retained session decorator, if any
    pub fn retained_session(&self) -> Option<&Arc<dyn SessionImplementor>> {
        self.retained_session.as_ref()
    }

    /// Read one field of the referenced entity
    ///
    /// The identifier field answers from the initializer without loading;
    /// every other field forces initialization first.
    pub async fn field(&self, name: &str) -> OrmResult<Option<Value>> {
        if name == self.id_field {
            return Ok(Some(self.identifier().as_json()));
        }
        match self.initializer.implementation().await? {
            Some(record) => Ok(record.get(name).cloned()),
            None => Ok(None),
        }
    }

    /// Dereference to the full target record, loading if necessary
    pub async fn record(&self) -> OrmResult<Option<Arc<EntityRecord>>> {
        self.initializer.implementation().await
    }

    /// Dereference and materialize as a typed entity
    pub async fn materialize<T: Entity>(&self) -> OrmResult<Option<T>> {
        match self.record().await? {
            Some(record) => Ok(Some(T::from_record(&record)?)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("entity_name", &self.entity_name())
            .field("id", &self.identifier())
            .field("uninitialized", &self.is_uninitialized())
            .finish()
    }
}

/// Reference to an entity as produced by a session or association loader
///
/// Call sites decide explicitly how to consume each variant instead of
/// relying on transparent substitution.
#[derive(Debug)]
pub enum EntityRef {
    /// A fully loaded, managed record
    Managed(Arc<EntityRecord>),
    /// A lazy proxy; dereference through the handle
    Proxy(EntityProxy),
    /// The row is absent and the configured policy tolerated that
    Absent,
}

impl EntityRef {
    /// Whether this reference is a lazy proxy
    pub fn is_proxy(&self) -> bool {
        matches!(self, EntityRef::Proxy(_))
    }

    /// Whether this reference points at nothing
    pub fn is_absent(&self) -> bool {
        matches!(self, EntityRef::Absent)
    }

    /// Identifier of the referenced entity, if any
    pub fn identifier(&self) -> Option<EntityId> {
        match self {
            EntityRef::Managed(record) => Some(record.id().clone()),
            EntityRef::Proxy(proxy) => Some(proxy.identifier()),
            EntityRef::Absent => None,
        }
    }

    /// Resolve to a record, initializing a proxy if needed
    pub async fn record(&self) -> OrmResult<Option<Arc<EntityRecord>>> {
        match self {
            EntityRef::Managed(record) => Ok(Some(record.clone())),
            EntityRef::Proxy(proxy) => proxy.record().await,
            EntityRef::Absent => Ok(None),
        }
    }
}
