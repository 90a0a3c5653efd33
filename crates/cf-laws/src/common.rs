//! Shared helpers for flow-law implementations.

use cf_core::{CfError, CfResult, Real};
use cf_graph::FluxNode;

use crate::error::{LawError, LawResult};

/// Reject a non-positive geometric or rate parameter.
pub fn check_positive(value: Real, what: &'static str) -> LawResult<Real> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LawError::InvalidArg { what })
    }
}

fn wrong_endpoint(
    law: &'static str,
    side: &'static str,
    expected: &'static str,
    node: &FluxNode,
) -> CfError {
    LawError::WrongEndpoint {
        law,
        side,
        expected,
        node: node.to_string(),
    }
    .into()
}

/// The endpoint must be a soil layer.
pub fn require_layer(law: &'static str, side: &'static str, node: &FluxNode) -> CfResult<()> {
    if node.as_layer().is_some() {
        Ok(())
    } else {
        Err(wrong_endpoint(law, side, "soil layer", node))
    }
}

/// The endpoint must own a volume (storage or layer).
pub fn require_storage(law: &'static str, side: &'static str, node: &FluxNode) -> CfResult<()> {
    if node.is_storage() {
        Ok(())
    } else {
        Err(wrong_endpoint(law, side, "water storage", node))
    }
}
