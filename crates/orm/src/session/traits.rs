//! Session Contract - The surface consumed by the proxy machinery
//!
//! Everything a lazy initializer needs from its session goes through this
//! trait: the load channel, liveness checks, the owning factory, and the
//! persistence context. Decorators that redirect loading (the audit layer's
//! delegate sessions) implement the same trait and forward the rest.

use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{EntityId, EntityRecord};
use crate::error::OrmResult;

use super::context::PersistenceContext;
use super::factory::SessionFactory;

/// Session operations consumed by proxies and loaders
#[async_trait]
pub trait SessionImplementor: Send + Sync {
    /// Load one row right now, bypassing any proxy; absent rows yield `None`
    async fn immediate_load(
        &self,
        entity_name: &str,
        id: &EntityId,
    ) -> OrmResult<Option<Arc<EntityRecord>>>;

    /// Whether the session has not been closed
    fn is_open(&self) -> bool;

    /// Whether the session currently holds its connection
    fn is_connected(&self) -> bool;

    /// Factory this session was opened from
    fn factory(&self) -> &Arc<SessionFactory>;

    /// Registry of entities and proxies managed by this session
    fn persistence_context(&self) -> &PersistenceContext;
}
