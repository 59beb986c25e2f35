//! Error types for the mapping core
//!
//! Provides error handling for session lifecycle violations, lazy
//! initialization, identity lookups, and backend access.

use std::fmt;

use crate::entity::EntityId;

/// Result type alias for mapping operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping operations
#[derive(Debug, Clone, PartialEq)]
pub enum OrmError {
    /// Lazy initialization attempted without a usable session
    LazyInitialization(String),
    /// Session has been closed
    SessionClosed(String),
    /// Session is open but its connection has been released
    SessionDisconnected(String),
    /// Proxy association with more than one open session
    SessionOwnership(String),
    /// Referenced row is absent and the configured policy is strict
    EntityNotFound {
        /// Entity type whose row is missing
        entity_name: String,
        /// Identifier that failed to resolve
        id: EntityId,
    },
    /// Record materialized as a different entity type than it carries
    WrongType {
        /// Entity type requested by the caller
        expected: String,
        /// Entity type the record actually belongs to
        actual: String,
    },
    /// Entity type is not registered
    Metadata(String),
    /// Factory or session configuration error
    Configuration(String),
    /// Proxy construction failed
    ProxyInstantiation(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Backend store error
    Store(String),
    /// Revision/audit layer error
    Audit(String),
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::LazyInitialization(msg) => write!(f, "Lazy initialization error: {}", msg),
            OrmError::SessionClosed(msg) => write!(f, "Session is closed: {}", msg),
            OrmError::SessionDisconnected(msg) => write!(f, "Session is disconnected: {}", msg),
            OrmError::SessionOwnership(msg) => write!(f, "Session ownership error: {}", msg),
            OrmError::EntityNotFound { entity_name, id } => {
                write!(f, "No row with the given identifier exists: {}#{}", entity_name, id)
            }
            OrmError::WrongType { expected, actual } => {
                write!(f, "Record belongs to entity type '{}', not '{}'", actual, expected)
            }
            OrmError::Metadata(msg) => write!(f, "Metadata error: {}", msg),
            OrmError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            OrmError::ProxyInstantiation(msg) => write!(f, "Proxy instantiation error: {}", msg),
            OrmError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            OrmError::Store(msg) => write!(f, "Store error: {}", msg),
            OrmError::Audit(msg) => write!(f, "Audit error: {}", msg),
        }
    }
}

impl std::error::Error for OrmError {}

// Convert from serde_json errors
impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for OrmError {
    fn from(err: anyhow::Error) -> Self {
        OrmError::Store(err.to_string())
    }
}
