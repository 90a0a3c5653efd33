//! Fluxes forced by code outside the network.

use cf_core::{NodeId, Real};
use cf_graph::{Endpoints, EvalContext, FlowLaw, FluxNetwork};
use tracing::debug;

use crate::error::{LawError, LawResult};

/// A connection whose flux is set from outside, e.g. by a coupled model.
///
/// The flux is returned unchanged; empty endpoints do not clamp it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExternallyControlledFlux {
    pub flux: Real,
}

impl ExternallyControlledFlux {
    pub const NAME: &'static str = "external flux";

    pub fn new(flux: Real) -> Self {
        Self { flux }
    }
}

impl FlowLaw for ExternallyControlledFlux {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn calc_q(&self, _ctx: &mut EvalContext<'_>, _ends: Endpoints) -> Real {
        self.flux
    }

    fn is_externally_forced(&self) -> bool {
        true
    }

    fn forced_flux_mut(&mut self) -> Option<&mut Real> {
        Some(&mut self.flux)
    }
}

fn display_name(network: &FluxNetwork, node: NodeId) -> String {
    network
        .node(node)
        .map_or_else(|| format!("unknown node #{node}"), ToString::to_string)
}

/// Whether `set_flux` would succeed for this pair.
pub fn can_set_flux(network: &FluxNetwork, source: NodeId, target: NodeId) -> bool {
    network
        .connection_between(source, target)
        .is_some_and(|c| c.law().is_externally_forced())
}

/// Set the flux from `source` to `target` (m³/day).
///
/// The pair must be connected by an externally controlled flux. The value is
/// negated when `source` is the right endpoint of that connection.
pub fn set_flux(
    network: &mut FluxNetwork,
    source: NodeId,
    target: NodeId,
    value: Real,
) -> LawResult<()> {
    let missing = |network: &FluxNetwork| LawError::MissingExternalConnection {
        from_node: display_name(network, source),
        to_node: display_name(network, target),
    };
    let Some(conn) = network.connection_between_mut(source, target) else {
        return Err(missing(network));
    };
    let signed = if conn.left == source { value } else { -value };
    let id = conn.id;
    let Some(flux) = conn.law_mut().forced_flux_mut() else {
        return Err(missing(network));
    };
    *flux = signed;
    debug!(conn = %id, flux = signed, "external flux set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_flux_is_exposed() {
        let mut law = ExternallyControlledFlux::new(1.0);
        if let Some(f) = law.forced_flux_mut() {
            *f = 3.5;
        }
        assert_eq!(law.flux, 3.5);
        assert!(law.is_externally_forced());
        assert!(!crate::LinearStorage::new(cf_core::days(1.0)).unwrap().is_externally_forced());
    }
}
