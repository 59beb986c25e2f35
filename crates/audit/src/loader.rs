//! To-One Loader - Proxy-or-immediate policy for historical associations
//!
//! Decides, per to-one association materialized from a historical graph,
//! whether to hand back a lazy proxy pinned to the requested revision or a
//! fully loaded snapshot. Proxy support is a property of the target entity
//! type, so a given association either always proxies or never does.

use std::sync::Arc;

use tracing::debug;

use veil_orm::{EntityId, EntityProxy, EntityRecord, EntityRef, OrmResult, SessionImplementor};

use crate::reader::AuditReader;
use crate::revision::RevisionNumber;
use crate::session::ToOneDelegateSession;

/// Materializes to-one association targets from a historical graph
pub struct ToOneEntityLoader {
    reader: Arc<AuditReader>,
}

impl ToOneEntityLoader {
    /// Create a loader resolving through the given reader
    pub fn new(reader: Arc<AuditReader>) -> Self {
        Self { reader }
    }

    /// Load the association target eagerly
    ///
    /// Targets outside the audit trail load through the live session; there
    /// is no history to traverse for them. Audited targets resolve at the
    /// requested revision, with `include_deleted` widening the accepted
    /// change kinds when the surrounding graph contains removals.
    pub async fn load_immediate(
        &self,
        session: &Arc<dyn SessionImplementor>,
        entity_name: &str,
        id: &EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<Option<Arc<EntityRecord>>> {
        let metadata = session.factory().metadata().require(entity_name)?;
        if !metadata.audited {
            return session.immediate_load(entity_name, id).await;
        }
        self.reader
            .find(entity_name, id, revision, include_deleted)
            .await
    }

    /// Build a lazy proxy pinned to the requested revision
    ///
    /// Returns `None` when the target type does not support proxying. The
    /// proxy's initializer is bound to a delegate session carrying the
    /// revision, and the proxy handle retains that wrapper for its lifetime.
    pub fn create_proxy(
        &self,
        session: &Arc<dyn SessionImplementor>,
        entity_name: &str,
        id: EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<Option<EntityProxy>> {
        let metadata = session.factory().metadata().require(entity_name)?;
        if !metadata.proxyable {
            return Ok(None);
        }

        let channel: Arc<dyn SessionImplementor> = if metadata.audited {
            ToOneDelegateSession::at_revision(
                session.clone(),
                self.reader.clone(),
                revision,
                include_deleted,
            )
        } else {
            session.clone()
        };

        let proxy_factory = session.factory().proxy_factory(entity_name)?;
        let mut proxy = proxy_factory.get_proxy(id, &channel)?;
        proxy.retain_session(channel);
        debug!("Created to-one proxy for {} at {}", entity_name, revision);
        Ok(Some(proxy))
    }

    /// Prefer a proxy, falling back to an eager load for types without one
    ///
    /// Never yields a proxy for a non-proxyable target type; such targets
    /// resolve to a loaded snapshot or to an absent reference.
    pub async fn create_proxy_or_load_immediate(
        &self,
        session: &Arc<dyn SessionImplementor>,
        entity_name: &str,
        id: &EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<EntityRef> {
        if let Some(proxy) =
            self.create_proxy(session, entity_name, id.clone(), revision, include_deleted)?
        {
            return Ok(EntityRef::Proxy(proxy));
        }
        match self
            .load_immediate(session, entity_name, id, revision, include_deleted)
            .await?
        {
            Some(record) => Ok(EntityRef::Managed(record)),
            None => Ok(EntityRef::Absent),
        }
    }
}
