//! Delegate Sessions - Redirecting the load channel without re-deriving the session surface
//!
//! A delegate session wraps a real session and forwards every operation
//! verbatim except `immediate_load`, which is supplied by a pluggable seam.
//! Lazy proxies bound to such a wrapper initialize through the overridden
//! channel while flush behavior, liveness, factory access, and the
//! persistence context all remain the wrapped session's.

use std::sync::Arc;

use async_trait::async_trait;

use veil_orm::{
    EntityId, EntityRecord, OrmResult, PersistenceContext, SessionFactory, SessionImplementor,
};

use crate::reader::AuditReader;
use crate::revision::RevisionNumber;

/// The one seam a delegate session overrides
#[async_trait]
pub trait LoadOverride: Send + Sync {
    /// Replacement for the wrapped session's `immediate_load`
    async fn immediate_load(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>>;
}

/// Session decorator forwarding everything except the load channel
pub struct DelegateSession<L: LoadOverride> {
    delegate: Arc<dyn SessionImplementor>,
    load: L,
}

impl<L: LoadOverride> DelegateSession<L> {
    /// Wrap a session with the given load seam
    pub fn new(delegate: Arc<dyn SessionImplementor>, load: L) -> Self {
        Self { delegate, load }
    }

    /// The wrapped session
    pub fn delegate(&self) -> &Arc<dyn SessionImplementor> {
        &self.delegate
    }
}

#[async_trait]
impl<L: LoadOverride> SessionImplementor for DelegateSession<L> {
    async fn immediate_load(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        self.load.immediate_load(entity_name, id).await
    }

    fn is_open(&self) -> bool {
        self.delegate.is_open()
    }

    fn is_connected(&self) -> bool {
        self.delegate.is_connected()
    }

    fn factory(&self) -> &Arc<SessionFactory> {
        self.delegate.factory()
    }

    fn persistence_context(&self) -> &PersistenceContext {
        self.delegate.persistence_context()
    }
}

/// Load seam resolving to-one targets at a fixed revision
pub struct AuditedToOneLoad {
    reader: Arc<AuditReader>,
    revision: RevisionNumber,
    include_deleted: bool,
}

#[async_trait]
impl LoadOverride for AuditedToOneLoad {
    async fn immediate_load(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        self.reader
            .find(entity_name, id, self.revision, self.include_deleted)
            .await
    }
}

/// Delegate session driving to-one proxies from the audit trail
pub type ToOneDelegateSession = DelegateSession<AuditedToOneLoad>;

impl ToOneDelegateSession {
    /// Wrap a live session so loads resolve at the given revision
    pub fn at_revision(
        delegate: Arc<dyn SessionImplementor>,
        reader: Arc<AuditReader>,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> Arc<Self> {
        Arc::new(DelegateSession::new(
            delegate,
            AuditedToOneLoad {
                reader,
                revision,
                include_deleted,
            },
        ))
    }
}
