//! Store Backends - The seam to whatever actually holds the rows
//!
//! The mapping core only ever asks a backend to fetch one row by identity;
//! SQL generation, drivers, and pooling live behind this trait and are not
//! part of the core.

use async_trait::async_trait;

use crate::entity::{EntityId, EntityRecord};
use crate::error::{OrmError, OrmResult};

pub mod memory;

pub use memory::MemoryStore;

/// Row source consumed by sessions
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch one row by entity type and identifier; absent rows yield `None`
    async fn fetch(&self, entity_name: &str, id: &EntityId) -> OrmResult<Option<EntityRecord>>;
}

/// Backend error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Row fetch failed: {0}")]
    FetchFailed(String),

    #[error("Store has no table for entity '{0}'")]
    UnknownTable(String),

    #[error("Store is unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<StoreError> for OrmError {
    fn from(err: StoreError) -> Self {
        OrmError::Store(err.to_string())
    }
}
