//! Error types for simulation operations.

use cf_core::CfError;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("State length {got} does not match the {expected} storages of the network")]
    StateMismatch { expected: usize, got: usize },

    #[error("Network error: {0}")]
    Network(#[from] CfError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<cf_graph::GraphError> for SimError {
    fn from(e: cf_graph::GraphError) -> Self {
        SimError::Network(e.into())
    }
}
