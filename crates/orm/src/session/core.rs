//! Session - Unit of work owning one persistence context
//!
//! A session is opened from a factory, drives all loading for one logical
//! conversation, and is not safe to share across concurrent callers. Closing
//! it clears the context; proxies created against it fail with lifecycle
//! errors once it is gone.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::debug;

use crate::entity::{EntityId, EntityKey, EntityRecord};
use crate::error::{OrmError, OrmResult};
use crate::proxy::{EntityProxy, EntityRef};

use super::context::PersistenceContext;
use super::factory::SessionFactory;
use super::traits::SessionImplementor;

/// A single unit of work against the backend store
pub struct Session {
    factory: Arc<SessionFactory>,
    context: PersistenceContext,
    open: AtomicBool,
    connected: AtomicBool,
    // Self-handle so proxies can be bound to this session from &self
    handle: Weak<Session>,
}

impl Session {
    /// Open a session against the given factory
    pub fn open(factory: Arc<SessionFactory>) -> Arc<Self> {
        debug!("Opening session");
        Arc::new_cyclic(|handle| Self {
            factory,
            context: PersistenceContext::new(),
            open: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            handle: handle.clone(),
        })
    }

    /// Close the session, discarding its persistence context
    pub fn close(&self) {
        debug!("Closing session ({} managed entities)", self.context.entity_count());
        self.open.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        self.context.clear();
    }

    /// Release the connection while keeping the session open
    pub fn disconnect(&self) {
        debug!("Disconnecting session");
        self.connected.store(false, Ordering::Release);
    }

    /// Reacquire the connection for an open session
    pub fn reconnect(&self) -> OrmResult<()> {
        if !self.is_open() {
            return Err(OrmError::SessionClosed(
                "cannot reconnect a closed session".to_string(),
            ));
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Load an entity, returning `None` when the row is absent
    ///
    /// Answers from the persistence context when the entity is already
    /// resident; otherwise loads immediately through the backend.
    pub async fn get(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        let metadata = self.factory.metadata().require(entity_name)?;
        let key = EntityKey::new(entity_name, id.clone(), metadata.mode);
        if let Some(record) = self.context.get_entity(&key) {
            return Ok(Some(record));
        }
        self.immediate_load(entity_name, id).await
    }

    /// Obtain a reference to an entity without necessarily hitting the store
    ///
    /// Resolution order: resident entity, live registered proxy, fresh proxy.
    /// Types that do not support proxying load immediately, with the
    /// configured not-found policy applied to absent rows.
    pub async fn load(&self, entity_name: &str, id: &EntityId) -> OrmResult<EntityRef> {
        if !self.is_open() {
            return Err(OrmError::SessionClosed(
                "cannot load from a closed session".to_string(),
            ));
        }
        let metadata = self.factory.metadata().require(entity_name)?;
        let key = EntityKey::new(entity_name, id.clone(), metadata.mode);

        if let Some(record) = self.context.get_entity(&key) {
            return Ok(EntityRef::Managed(record));
        }
        if let Some(initializer) = self.context.proxy_for(&key) {
            return Ok(EntityRef::Proxy(EntityProxy::from_parts(
                initializer,
                metadata.id_field.clone(),
            )));
        }

        if !metadata.proxyable {
            return match self.immediate_load(entity_name, id).await? {
                Some(record) => Ok(EntityRef::Managed(record)),
                None => {
                    self.factory.entity_not_found(entity_name, id)?;
                    Ok(EntityRef::Absent)
                }
            };
        }

        let proxy_factory = self.factory.proxy_factory(entity_name)?;
        let this: Arc<dyn SessionImplementor> = match self.handle.upgrade() {
            Some(session) => session,
            None => {
                return Err(OrmError::SessionClosed(
                    "cannot bind a proxy to a dropped session".to_string(),
                ))
            }
        };
        let proxy = proxy_factory.get_proxy(id.clone(), &this)?;
        self.context.register_proxy(key, proxy.lazy_initializer());
        debug!("Created proxy for {}#{}", entity_name, id);
        Ok(EntityRef::Proxy(proxy))
    }

    /// Whether an entity is resident under the given identity
    pub fn contains(&self, entity_name: &str, id: &EntityId) -> OrmResult<bool> {
        let metadata = self.factory.metadata().require(entity_name)?;
        let key = EntityKey::new(entity_name, id.clone(), metadata.mode);
        Ok(self.context.contains_entity(&key))
    }

    /// Drop one entity (and any proxy) from the persistence context
    pub fn evict(&self, entity_name: &str, id: &EntityId) -> OrmResult<()> {
        let metadata = self.factory.metadata().require(entity_name)?;
        let key = EntityKey::new(entity_name, id.clone(), metadata.mode);
        self.context.evict(&key);
        Ok(())
    }

    /// Drop everything from the persistence context
    pub fn clear(&self) {
        self.context.clear();
    }
}

#[async_trait]
impl SessionImplementor for Session {
    async fn immediate_load(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        if !self.is_open() {
            return Err(OrmError::SessionClosed(
                "cannot load from a closed session".to_string(),
            ));
        }
        let metadata = self.factory.metadata().require(entity_name)?;

        debug!("Immediate load of {}#{}", entity_name, id);
        match self.factory.store().fetch(entity_name, id).await? {
            Some(record) => {
                let record = Arc::new(record);
                let key = EntityKey::new(entity_name, id.clone(), metadata.mode);
                self.context.add_entity(key, record.clone());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }

    fn persistence_context(&self) -> &PersistenceContext {
        &self.context
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.is_open())
            .field("connected", &self.is_connected())
            .field("entities", &self.context.entity_count())
            .finish()
    }
}
