//! Audit Store - Append-only trail of entity snapshots by revision
//!
//! Every tracked change appends one entry carrying the revision number, the
//! change kind, and (except for removals) a snapshot of the entity state.
//! Reads resolve "the state at revision N" as the latest entry at or before
//! N, with removals suppressed unless the caller asked to see them.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use veil_orm::{EntityId, EntityRecord, OrmResult};

use crate::revision::{RevisionNumber, RevisionType};

/// One entry in an entity's audit trail
#[derive(Debug, Clone)]
pub struct RevisionEntry {
    /// Revision this entry was written at
    pub revision: RevisionNumber,
    /// Kind of change recorded
    pub revision_type: RevisionType,
    /// Wall-clock time the entry was written
    pub timestamp: DateTime<Utc>,
    /// Entity state after the change; removals carry none
    pub snapshot: Option<EntityRecord>,
}

/// Source of historical entity state
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Latest entry at or before the given revision
    ///
    /// Removal entries are reported only when `include_deleted` widens the
    /// accepted change kinds to include deletions.
    async fn entry_at(
        &self,
        entity_name: &str,
        id: &EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<Option<RevisionEntry>>;

    /// Highest revision handed out so far
    fn head(&self) -> RevisionNumber;
}

/// Process-local audit trail keyed by entity identity
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    trails: DashMap<(String, EntityId), Vec<RevisionEntry>>,
    counter: AtomicU64,
}

impl MemoryAuditStore {
    /// Create an empty trail store
    pub fn new() -> Self {
        Self {
            trails: DashMap::new(),
            counter: AtomicU64::new(0),
        }
    }

    /// Record an entity coming into existence
    pub fn record_add(&self, record: EntityRecord) -> RevisionNumber {
        self.append(RevisionType::Add, record.entity_name().to_string(), record.id().clone(), Some(record))
    }

    /// Record a state change
    pub fn record_mod(&self, record: EntityRecord) -> RevisionNumber {
        self.append(RevisionType::Mod, record.entity_name().to_string(), record.id().clone(), Some(record))
    }

    /// Record a removal
    pub fn record_del(&self, entity_name: &str, id: EntityId) -> RevisionNumber {
        self.append(RevisionType::Del, entity_name.to_string(), id, None)
    }

    fn append(
        &self,
        revision_type: RevisionType,
        entity_name: String,
        id: EntityId,
        snapshot: Option<EntityRecord>,
    ) -> RevisionNumber {
        let revision = RevisionNumber(self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        debug!("Recording {} for {}#{} at {}", revision_type.as_str(), entity_name, id, revision);
        self.trails
            .entry((entity_name, id))
            .or_insert_with(Vec::new)
            .push(RevisionEntry {
                revision,
                revision_type,
                timestamp: Utc::now(),
                snapshot,
            });
        revision
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn entry_at(
        &self,
        entity_name: &str,
        id: &EntityId,
        revision: RevisionNumber,
        include_deleted: bool,
    ) -> OrmResult<Option<RevisionEntry>> {
        let key = (entity_name.to_string(), id.clone());
        let Some(trail) = self.trails.get(&key) else {
            return Ok(None);
        };
        // Entries are appended in revision order; scan from the latest
        let entry = trail
            .iter()
            .rev()
            .find(|entry| entry.revision <= revision)
            .cloned();
        match entry {
            Some(entry) if entry.revision_type.is_deletion() && !include_deleted => Ok(None),
            other => Ok(other),
        }
    }

    fn head(&self) -> RevisionNumber {
        RevisionNumber(self.counter.load(Ordering::SeqCst))
    }
}
