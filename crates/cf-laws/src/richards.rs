//! Richards equation for unsaturated flow between soil layers.

use cf_core::units::{Area, Length, as_m, as_m2, m, m2};
use cf_core::{CellId, CfResult, ConnId, Real, geo_mean};
use cf_graph::{Endpoints, EvalContext, FlowLaw, FluxNetwork, FluxNode};

use crate::common::{check_positive, require_layer};
use crate::connectors::{
    CellConnector, LayerStart, VerticalConnector, connect_layer_stack, connect_layers_by_area,
};
use crate::error::LawResult;

/// Darcy flux driven by the total-head gradient with the geometric mean of
/// both unsaturated conductivities.
///
/// The conductivity is capped so that the flux never exceeds the saturated
/// conductivity of either layer. The right endpoint may be any node; a
/// non-layer right endpoint contributes only its potential.
#[derive(Debug, Clone)]
pub struct Richards {
    pub flow_area: Area,
    pub distance: Length,
}

impl Richards {
    pub const NAME: &'static str = "Richards eq.";
    pub const CELL_CONNECTOR: CellConnector = CellConnector::new(Self::NAME, Self::connect_cells);
    pub const VERTICAL_CONNECTOR: VerticalConnector =
        VerticalConnector::new(Self::NAME, Self::use_for_cell);

    pub fn new(flow_area: Area, distance: Length) -> LawResult<Self> {
        check_positive(as_m2(flow_area), "Richards flow area must be positive")?;
        check_positive(as_m(distance), "Richards distance must be positive")?;
        Ok(Self {
            flow_area,
            distance,
        })
    }

    /// Connect all layers of two neighbouring cells that share a cross section.
    pub fn connect_cells(
        network: &mut FluxNetwork,
        cell1: CellId,
        cell2: CellId,
        start: LayerStart,
    ) -> LawResult<Vec<ConnId>> {
        connect_layers_by_area(network, cell1, cell2, start, Self::NAME, |g| {
            Ok(Box::new(Self::new(m2(g.extent), m(g.distance))?))
        })
    }

    /// Connect each layer of `cell` with the layer below.
    pub fn use_for_cell(
        network: &mut FluxNetwork,
        cell: CellId,
        no_override: bool,
    ) -> LawResult<Vec<ConnId>> {
        connect_layer_stack(network, cell, no_override, Self::NAME, |g| {
            Ok(Box::new(Self::new(m2(g.extent), m(g.distance))?))
        })
    }
}

impl FlowLaw for Richards {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_layer(Self::NAME, "left", left)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let Some(l1) = ctx.layer(ends.left) else {
            return 0.0;
        };
        let l2 = ctx.layer(ends.right);

        let gradient = (l1.potential() - ctx.potential(ends.right)) / as_m(self.distance);
        let mut k = match l2 {
            Some(l2) => geo_mean(l1.k(), l2.k()),
            None => l1.k(),
        };
        if (k * gradient).abs() > l1.ksat() {
            k = l1.ksat();
        }
        if let Some(l2) = l2
            && (k * gradient).abs() > l2.ksat()
        {
            k = l2.ksat();
        }

        ctx.clamp_empty(k * gradient * as_m2(self.flow_area), ends)
    }
}
