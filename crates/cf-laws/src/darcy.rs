//! Darcy-type laws: unsaturated exchange with upwelling, saturated lateral
//! flow and the kinematic topographic-gradient approximation.

use cf_core::units::{Area, Length, as_m, as_m2, m, m2};
use cf_core::{CellId, CfResult, ConnId, Real, boltzmann, geo_mean};
use cf_graph::{Endpoints, EvalContext, FlowLaw, FluxNetwork, FluxNode, LayerView};

use crate::common::{check_positive, require_layer};
use crate::connectors::{
    CellConnector, LayerStart, VerticalConnector, connect_layer_stack, connect_layers_by_area,
    connect_layers_by_width,
};
use crate::error::LawResult;

/// Width of the sigmoid switching a saturated target into upwelling mode.
pub const UPWELLING_TAU: Real = 0.01;

/// Darcy flux between two layers with upstream conductivity.
///
/// When the receiving layer approaches saturation the flux turns into an
/// upwelling that carries the receiver's surplus back to the source.
#[derive(Debug, Clone)]
pub struct UnsaturatedDarcy {
    pub flow_area: Area,
    pub distance: Length,
}

impl UnsaturatedDarcy {
    pub const NAME: &'static str = "unsaturated Darcy";
    pub const CELL_CONNECTOR: CellConnector = CellConnector::new(Self::NAME, Self::connect_cells);
    pub const VERTICAL_CONNECTOR: VerticalConnector =
        VerticalConnector::new(Self::NAME, Self::use_for_cell);

    pub fn new(flow_area: Area, distance: Length) -> LawResult<Self> {
        check_positive(as_m2(flow_area), "unsaturated Darcy flow area must be positive")?;
        check_positive(as_m(distance), "unsaturated Darcy distance must be positive")?;
        Ok(Self {
            flow_area,
            distance,
        })
    }

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

impl FlowLaw for UnsaturatedDarcy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, right: &FluxNode) -> CfResult<()> {
        require_layer(Self::NAME, "left", left)?;
        require_layer(Self::NAME, "right", right)
    }

    fn recalc_always(&self) -> bool {
        true
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let (Some(l1), Some(l2)) = (ctx.layer(ends.left), ctx.layer(ends.right)) else {
            return 0.0;
        };
        let gradient = (l1.potential() - l2.potential()) / as_m(self.distance);
        let (k, target, target_view) = if gradient > 0.0 {
            (l1.k(), ends.right, l2)
        } else {
            (l2.k(), ends.left, l1)
        };

        let upwelling = 1.0 - 2.0 * boltzmann(target_view.wetness(), 1.0, UPWELLING_TAU);
        let q = if upwelling < 0.0 {
            upwelling * ctx.water_balance(target)
        } else {
            k * gradient * as_m2(self.flow_area) * upwelling
        };
        ctx.clamp_empty(q, ends)
    }
}

/// Depth range below the saturated depth that carries lateral flow (m).
fn flow_thickness(view: &LayerView<'_>, saturated_depth: Real) -> Real {
    view.thickness().min(view.lower_boundary() - saturated_depth)
}

fn saturated_transmissivity(view: &LayerView<'_>, thickness: Real) -> Real {
    view.transmissivity(view.lower_boundary() - thickness, view.lower_boundary())
}

/// Saturated lateral Darcy flow driven by the water-table gradient.
///
/// Only the saturated part of each layer carries flow. The transmissivity is
/// the geometric mean of both layers' transmissivities of that part.
#[derive(Debug, Clone)]
pub struct Darcy {
    pub flow_width: Length,
    pub distance: Length,
}

impl Darcy {
    pub const NAME: &'static str = "Darcy";
    pub const CELL_CONNECTOR: CellConnector = CellConnector::new(Self::NAME, Self::connect_cells);

    pub fn new(flow_width: Length, distance: Length) -> LawResult<Self> {
        check_positive(as_m(flow_width), "Darcy flow width must be positive")?;
        check_positive(as_m(distance), "Darcy distance must be positive")?;
        Ok(Self {
            flow_width,
            distance,
        })
    }

    pub fn connect_cells(
        network: &mut FluxNetwork,
        cell1: CellId,
        cell2: CellId,
        start: LayerStart,
    ) -> LawResult<Vec<ConnId>> {
        connect_layers_by_width(network, cell1, cell2, start, Self::NAME, |g| {
            Ok(Box::new(Self::new(m(g.extent), m(g.distance))?))
        })
    }
}

impl FlowLaw for Darcy {
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

        let ft1 = flow_thickness(&l1, l1.saturated_depth());
        let ft2 = l2.map_or(ft1, |v| flow_thickness(&v, v.saturated_depth()));
        if ft1 < 0.0 || ft2 < 0.0 {
            return 0.0;
        }

        let psi1 = l1.cell.position.z - l1.saturated_depth();
        let psi2 = match l2 {
            Some(v) => v.cell.position.z - v.saturated_depth(),
            None => ctx.potential(ends.right),
        };
        let gradient = (psi1 - psi2) / as_m(self.distance);

        let t1 = saturated_transmissivity(&l1, ft1);
        let t2 = l2.map_or(t1, |v| saturated_transmissivity(&v, ft2));
        let q = geo_mean(t1, t2) * gradient * as_m(self.flow_width);
        ctx.clamp_empty(q, ends)
    }
}

/// Kinematic lateral flow: the gradient is the surface slope, the
/// transmissivity is taken from the upwind cell's saturated zone.
#[derive(Debug, Clone)]
pub struct TopographicGradientDarcy {
    pub flow_width: Length,
    pub distance: Length,
}

impl TopographicGradientDarcy {
    pub const NAME: &'static str = "topographic gradient Darcy";
    pub const CELL_CONNECTOR: CellConnector = CellConnector::new(Self::NAME, Self::connect_cells);

    pub fn new(flow_width: Length, distance: Length) -> LawResult<Self> {
        check_positive(as_m(flow_width), "flow width must be positive")?;
        check_positive(as_m(distance), "distance must be positive")?;
        Ok(Self {
            flow_width,
            distance,
        })
    }

    pub fn connect_cells(
        network: &mut FluxNetwork,
        cell1: CellId,
        cell2: CellId,
        start: LayerStart,
    ) -> LawResult<Vec<ConnId>> {
        connect_layers_by_width(network, cell1, cell2, start, Self::NAME, |g| {
            Ok(Box::new(Self::new(m(g.extent), m(g.distance))?))
        })
    }
}

impl FlowLaw for TopographicGradientDarcy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_layer(Self::NAME, "left", left)
    }

    /// The saturated depth is read from the whole layer stack of each cell.
    fn recalc_always(&self) -> bool {
        true
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let Some(l1) = ctx.layer(ends.left) else {
            return 0.0;
        };
        let l2 = ctx.layer(ends.right);

        let ft1 = flow_thickness(&l1, ctx.cell_saturated_depth(l1.layer.cell));
        let ft2 = l2.map_or(ft1, |v| {
            flow_thickness(&v, ctx.cell_saturated_depth(v.layer.cell))
        });
        if ft1 <= 0.0 || ft2 <= 0.0 {
            return 0.0;
        }

        let psi1 = l1.cell.position.z;
        let psi2 = match l2 {
            Some(v) => v.cell.position.z,
            None => ctx.potential(ends.right),
        };
        let gradient = (psi1 - psi2) / as_m(self.distance);

        let t = if gradient > 0.0 {
            saturated_transmissivity(&l1, ft1)
        } else {
            l2.map_or_else(
                || saturated_transmissivity(&l1, ft1),
                |v| saturated_transmissivity(&v, ft2),
            )
        };
        ctx.clamp_empty(t * gradient * as_m(self.flow_width), ends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_reject_non_positive_geometry() {
        assert!(UnsaturatedDarcy::new(m2(1.0), m(0.0)).is_err());
        assert!(Darcy::new(m(0.0), m(1.0)).is_err());
        assert!(TopographicGradientDarcy::new(m(1.0), m(f64::NAN)).is_err());
        assert!(Darcy::new(m(10.0), m(100.0)).is_ok());
    }

    #[test]
    fn upwelling_switches_near_saturation() {
        let dry = 1.0 - 2.0 * boltzmann(0.5, 1.0, UPWELLING_TAU);
        let full = 1.0 - 2.0 * boltzmann(1.0, 1.0, UPWELLING_TAU);
        let over = 1.0 - 2.0 * boltzmann(1.05, 1.0, UPWELLING_TAU);
        assert!((dry - 1.0).abs() < 1e-9);
        assert!(full.abs() < 1e-12);
        assert!(over < 0.0);
    }
}
