//! Network-specific error types.

use cf_core::{CellId, CfError, ConnId, NodeId};
use thiserror::Error;

/// Network construction and lookup errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Cell {0} does not exist")]
    UnknownCell(CellId),

    #[error("Connection {0} does not exist")]
    UnknownConnection(ConnId),

    #[error("Cannot connect node {node} to itself")]
    SelfConnection { node: NodeId },

    #[error("Node {node} ({name}) holds no water state")]
    NotAStorage { node: NodeId, name: String },

    #[error("Invalid layer for cell {cell}: {what}")]
    InvalidLayer { cell: CellId, what: &'static str },

    #[error("Cell {0} cannot neighbour itself")]
    SelfNeighbor(CellId),
}

impl From<GraphError> for CfError {
    fn from(err: GraphError) -> Self {
        CfError::Invariant {
            what: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_core_error_with_message() {
        let err: CfError = GraphError::SelfConnection {
            node: NodeId::from_index(4),
        }
        .into();
        assert!(matches!(&err, CfError::Invariant { what } if what.contains("itself")));
    }
}
