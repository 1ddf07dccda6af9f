// /src/errors.rs
//! Error taxonomy for the reconciler. Handlers turn every variant into a no-op;
//! the engine methods return them so callers can tell what was skipped.
use crate::types::{ContainerId, NodeHandle, SchemaId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("node {0} is not in the registry")]
    UnknownNode(NodeHandle),

    #[error("node {0} has no removal callback")]
    NoRemover(NodeHandle),

    #[error("data of node {0} is no longer in its parent collection")]
    NotFound(NodeHandle),

    #[error("container {} expects '{}', node {} is '{}'", .container, .expected, .node, display_schema(.actual))]
    SchemaMismatch {
        container: ContainerId,
        node: NodeHandle,
        expected: SchemaId,
        actual: Option<SchemaId>,
    },

    #[error("node {node} was detached from its source and rejected by container {container}")]
    Detached { container: ContainerId, node: NodeHandle },

    #[error("owner of container {container} has no collection '{property}'")]
    MissingCollection { container: ContainerId, property: String },

    #[error("property '{property}' holds a value, not a collection")]
    NotACollection { property: String },

    #[error("index {index} is out of bounds for a collection of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("node {node} cannot be dropped into container {container} it owns")]
    WouldNest { container: ContainerId, node: NodeHandle },

    #[error("data object is already borrowed")]
    DataBorrowed,

    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ReconcileError {
    /// True when the failed operation left data outside of every collection.
    pub fn is_data_loss(&self) -> bool {
        matches!(self, ReconcileError::Detached { .. })
    }
}

fn display_schema(schema: &Option<SchemaId>) -> String {
    match schema {
        Some(id) => id.to_string(),
        None => "<anonymous>".to_string(),
    }
}

impl From<std::cell::BorrowMutError> for ReconcileError {
    fn from(_: std::cell::BorrowMutError) -> Self {
        ReconcileError::DataBorrowed
    }
}

impl From<std::cell::BorrowError> for ReconcileError {
    fn from(_: std::cell::BorrowError) -> Self {
        ReconcileError::DataBorrowed
    }
}
