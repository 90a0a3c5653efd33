//! Error types for flow-law construction and network assembly.

use cf_core::error::CfError;
use cf_graph::GraphError;
use thiserror::Error;

/// Errors raised while building laws or wiring them into a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LawError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("{law} needs a {expected} as {side} endpoint, got {node}")]
    WrongEndpoint {
        law: &'static str,
        side: &'static str,
        expected: &'static str,
        node: String,
    },

    #[error(
        "No externally controlled connection between {from_node} and {to_node}. \
         Create one first by connecting both nodes with an ExternallyControlledFlux \
         (this replaces any existing connection between them)"
    )]
    MissingExternalConnection { from_node: String, to_node: String },

    #[error("No connector registered under '{name}'")]
    UnknownConnector { name: String },

    #[error("Network error: {0}")]
    Graph(#[from] GraphError),

    #[error("{0}")]
    Core(#[from] CfError),
}

pub type LawResult<T> = Result<T, LawError>;

impl From<LawError> for CfError {
    fn from(e: LawError) -> Self {
        match e {
            LawError::InvalidArg { what } => CfError::InvalidArg { what },
            LawError::Core(inner) => inner,
            LawError::Graph(inner) => inner.into(),
            other => CfError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
