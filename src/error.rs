//! Error types for the versioner and its graph store.

use crate::types::{NodeId, RelId};
use thiserror::Error;

/// Main error type for graph and versioning operations.
#[derive(Debug, Error)]
pub enum VersionerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(RelId),

    #[error("Can't find any current State node for entity {0}")]
    NoCurrentState(NodeId),

    #[error("State {state} is not linked to entity {entity}")]
    StateNotLinked { entity: NodeId, state: NodeId },

    #[error("State {state} belongs to entity {owner}, not to entity {entity}")]
    StateOwnedByOtherEntity {
        entity: NodeId,
        state: NodeId,
        owner: NodeId,
    },

    #[error("Invalid property {key:?}: {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Graph is locked by another process")]
    Locked,

    #[error("Graph not initialized")]
    NotInitialized,

    #[error("Invalid graph format: {0}")]
    InvalidFormat(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl VersionerError {
    /// Whether the error is a violated precondition of a transition rather
    /// than a storage failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            VersionerError::NoCurrentState(_)
                | VersionerError::StateNotLinked { .. }
                | VersionerError::StateOwnedByOtherEntity { .. }
        )
    }
}

impl From<rmp_serde::encode::Error> for VersionerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        VersionerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for VersionerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        VersionerError::Deserialization(e.to_string())
    }
}

impl From<serde_json::Error> for VersionerError {
    fn from(e: serde_json::Error) -> Self {
        VersionerError::Deserialization(e.to_string())
    }
}

/// Result type for graph and versioning operations.
pub type Result<T> = std::result::Result<T, VersionerError>;
