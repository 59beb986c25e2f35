//! Revision Model - Monotonic revision numbers and change kinds

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonically increasing revision number assigned by the audit store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RevisionNumber(pub u64);

impl RevisionNumber {
    /// The first revision any store hands out
    pub const FIRST: RevisionNumber = RevisionNumber(1);

    /// The revision following this one
    pub fn next(self) -> Self {
        RevisionNumber(self.0 + 1)
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Kind of change a revision entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionType {
    /// Entity came into existence at this revision
    Add,
    /// Entity state changed at this revision
    Mod,
    /// Entity was removed at this revision
    Del,
}

impl RevisionType {
    /// Whether this entry records a removal
    pub fn is_deletion(self) -> bool {
        matches!(self, RevisionType::Del)
    }

    /// Short tag used in trails and diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            RevisionType::Add => "ADD",
            RevisionType::Mod => "MOD",
            RevisionType::Del => "DEL",
        }
    }
}
