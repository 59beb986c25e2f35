//! Lazy Initializer - The uninitialized-to-initialized state machine behind every proxy
//!
//! One initializer owns the lazy-loading state of exactly one entity
//! reference: its entity type, its identifier, the session it is bound to,
//! and - once loaded - the target record. Identifier access never triggers a
//! load. The session reference is weak: sessions own their proxies, never
//! the other way around.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::entity::{EntityId, EntityKey, EntityRecord};
use crate::error::{OrmError, OrmResult};
use crate::session::SessionImplementor;

/// Lazy-loading state of one proxy instance
pub struct LazyInitializer {
    entity_name: String,
    id: RwLock<EntityId>,
    target: RwLock<Option<Arc<EntityRecord>>>,
    initialized: AtomicBool,
    session: RwLock<Option<Weak<dyn SessionImplementor>>>,
    unwrap: AtomicBool,
}

impl LazyInitializer {
    /// Create an uninitialized initializer bound to the given session
    pub fn new(
        entity_name: impl Into<String>,
        id: EntityId,
        session: &Arc<dyn SessionImplementor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            entity_name: entity_name.into(),
            id: RwLock::new(id),
            target: RwLock::new(None),
            initialized: AtomicBool::new(false),
            session: RwLock::new(Some(Arc::downgrade(session))),
            unwrap: AtomicBool::new(false),
        })
    }

    /// Entity type this reference points at
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Identifier of the referenced row; never triggers a load
    pub fn identifier(&self) -> EntityId {
        self.id.read().clone()
    }

    /// Reassign the identifier; never triggers a load
    pub fn set_identifier(&self, id: EntityId) {
        *self.id.write() = id;
    }

    /// Whether the target has not been loaded yet
    pub fn is_uninitialized(&self) -> bool {
        !self.initialized.load(Ordering::Acquire)
    }

    /// Whether a missing row is tolerated silently
    pub fn is_unwrap(&self) -> bool {
        self.unwrap.load(Ordering::Acquire)
    }

    /// Control whether a missing row is tolerated silently
    pub fn set_unwrap(&self, unwrap: bool) {
        self.unwrap.store(unwrap, Ordering::Release);
    }

    /// The bound session, if it is still alive
    pub fn session(&self) -> Option<Arc<dyn SessionImplementor>> {
        self.session.read().as_ref().and_then(Weak::upgrade)
    }

    /// Drop the session association, detaching this reference
    pub fn unset_session(&self) {
        *self.session.write() = None;
    }

    /// Bind this reference to another session
    ///
    /// Fails if the current session is open and still carries this
    /// initializer in its persistence context: a proxy belongs to at most
    /// one open session at a time. Detached or orphaned references rebind
    /// freely.
    pub fn set_session(&self, new_session: &Arc<dyn SessionImplementor>) -> OrmResult<()> {
        let same = {
            let guard = self.session.read();
            guard.as_ref().map_or(false, |weak| {
                std::ptr::eq(weak.as_ptr() as *const (), Arc::as_ptr(new_session) as *const ())
            })
        };
        if same {
            return Ok(());
        }
        if self.is_connected_to_session() {
            warn!(
                "Rejecting rebind of proxy {}#{} still owned by an open session",
                self.entity_name,
                self.identifier()
            );
            return Err(OrmError::SessionOwnership(
                "illegally attempted to associate a proxy with two open sessions".to_string(),
            ));
        }
        *self.session.write() = Some(Arc::downgrade(new_session));
        Ok(())
    }

    /// Whether the bound session is open and still registers this initializer
    pub fn is_connected_to_session(&self) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        if !session.is_open() {
            return false;
        }
        match self.entity_key(session.as_ref()) {
            Some(key) => session.persistence_context().contains_proxy(&key, self),
            None => false,
        }
    }

    /// Identity key of this reference as seen by the given session
    pub fn entity_key(&self, session: &dyn SessionImplementor) -> Option<EntityKey> {
        let metadata = session.factory().metadata().get(&self.entity_name)?;
        Some(EntityKey::new(
            self.entity_name.clone(),
            self.identifier(),
            metadata.mode,
        ))
    }

    /// Force the uninitialized-to-initialized transition
    ///
    /// Fails when no session is bound, when the bound session is closed, or
    /// when it is disconnected - three distinct usage errors. Otherwise the
    /// row is loaded through the session and the not-found policy is applied
    /// to an absent result. Once initialized, calling this again only
    /// re-runs the not-found check.
    pub async fn initialize(&self) -> OrmResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            return self.check_target_state(None);
        }

        let session = {
            let guard = self.session.read();
            guard.as_ref().and_then(Weak::upgrade)
        };
        let session = session.ok_or_else(|| {
            OrmError::LazyInitialization(format!(
                "could not initialize proxy {}#{} - no session",
                self.entity_name,
                self.identifier()
            ))
        })?;
        if !session.is_open() {
            return Err(OrmError::SessionClosed(format!(
                "could not initialize proxy {}#{} - the owning session was closed",
                self.entity_name,
                self.identifier()
            )));
        }
        if !session.is_connected() {
            return Err(OrmError::SessionDisconnected(format!(
                "could not initialize proxy {}#{} - the owning session is disconnected",
                self.entity_name,
                self.identifier()
            )));
        }

        let id = self.identifier();
        debug!("Initializing proxy {}#{}", self.entity_name, id);
        let loaded = session.immediate_load(&self.entity_name, &id).await?;
        *self.target.write() = loaded;
        self.initialized.store(true, Ordering::Release);

        self.check_target_state(Some(&session))
    }

    /// Apply the not-found policy to the current target
    ///
    /// Skipped entirely when absence is tolerated (`unwrap`). Without an
    /// explicit session the policy is resolved through the weak reference;
    /// with neither, there is no factory to consult and the check is a
    /// no-op.
    fn check_target_state(&self, session: Option<&Arc<dyn SessionImplementor>>) -> OrmResult<()> {
        if self.is_unwrap() {
            return Ok(());
        }
        if self.target.read().is_some() {
            return Ok(());
        }
        let resolved;
        let session = match session {
            Some(session) => session,
            None => match self.session() {
                Some(upgraded) => {
                    resolved = upgraded;
                    &resolved
                }
                None => return Ok(()),
            },
        };
        session
            .factory()
            .entity_not_found(&self.entity_name, &self.identifier())
    }

    /// Initialize if needed, then hand back the target record
    pub async fn implementation(&self) -> OrmResult<Option<Arc<EntityRecord>>> {
        self.initialize().await?;
        Ok(self.target.read().clone())
    }

    /// Look the entity up in the given session's context without loading
    ///
    /// Does not mutate this initializer's state; absent entries yield `None`.
    pub fn implementation_in(&self, session: &dyn SessionImplementor) -> Option<Arc<EntityRecord>> {
        let key = self.entity_key(session)?;
        session.persistence_context().get_entity(&key)
    }

    /// Inject an already-available target, bypassing any load
    pub fn set_implementation(&self, target: Option<Arc<EntityRecord>>) {
        *self.target.write() = target;
        self.initialized.store(true, Ordering::Release);
    }

    /// Target record, if initialization has produced one
    pub fn target(&self) -> Option<Arc<EntityRecord>> {
        self.target.read().clone()
    }
}

impl fmt::Debug for LazyInitializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInitializer")
            .field("entity_name", &self.entity_name)
            .field("id", &self.identifier())
            .field("initialized", &!self.is_uninitialized())
            .field("unwrap", &self.is_unwrap())
            .finish()
    }
}
