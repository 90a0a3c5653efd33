//! Vertical percolation laws.

use cf_core::units::constants::pressure_to_waterhead;
use cf_core::{CellId, CfResult, ConnId, Real, geo_mean};
use cf_graph::{Endpoints, EvalContext, FlowLaw, FluxNetwork, FluxNode};

use crate::common::require_layer;
use crate::connectors::{VerticalConnector, connect_layer_stack};
use crate::error::{LawError, LawResult};

/// Exponent of the saturation factor `1 - (thickness / max)^n`.
pub const SATURATION_SHARPNESS: i32 = 100;

/// Pressure defining field capacity (Pa).
pub const FIELD_CAPACITY_PRESSURE: Real = -33_000.0;

/// Receiver wetness above which SWAT percolation stops.
pub const RECEIVER_WETNESS_LIMIT: Real = 0.9;

/// Lower bound of `area * Ksat` in the SWAT travel time (m³/day).
pub const TRAVEL_TIME_DENOMINATOR_FLOOR: Real = 1e-12;

/// Percolation from an unsaturated layer into a variable saturated layer
/// below it.
///
/// The Darcy term uses the geometric mean conductivity over half the upper
/// layer's thickness. The saturated zone passes its surplus water balance on
/// to the upper layer, scaled by the upper layer's wetness; this exchange
/// fades out as the saturated zone reaches its maximum thickness.
#[derive(Debug, Clone)]
pub struct UnsatSatPercolation {
    sharpness: i32,
}

impl Default for UnsatSatPercolation {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsatSatPercolation {
    pub const NAME: &'static str = "unsat-sat percolation";

    pub fn new() -> Self {
        Self {
            sharpness: SATURATION_SHARPNESS,
        }
    }

    pub fn with_sharpness(mut self, sharpness: i32) -> LawResult<Self> {
        if sharpness <= 0 {
            return Err(LawError::InvalidArg {
                what: "saturation sharpness must be positive",
            });
        }
        self.sharpness = sharpness;
        Ok(self)
    }

    pub fn sharpness(&self) -> i32 {
        self.sharpness
    }
}

impl FlowLaw for UnsatSatPercolation {
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
        let (Some(unsat), Some(sat)) = (ctx.layer(ends.left), ctx.layer(ends.right)) else {
            return 0.0;
        };
        let half_thickness = 0.5 * unsat.thickness();
        if half_thickness <= 0.0 {
            return 0.0;
        }

        let gradient = (unsat.potential() - sat.potential()) / half_thickness;
        let darcy = geo_mean(unsat.k(), sat.k()) * sat.cell.area * gradient;

        let sat_balance = ctx.water_balance(ends.right) + darcy;
        let max_thickness = sat.max_thickness();
        let fill = if max_thickness > 0.0 {
            sat.thickness() / max_thickness
        } else {
            1.0
        };
        let factor = 1.0 - fill.powi(self.sharpness);
        let exchange = factor * sat_balance * unsat.wetness();

        ctx.clamp_empty(darcy + exchange, ends)
    }
}

/// SWAT storage-routing percolation.
///
/// Water above field capacity drains with a travel time derived from the
/// drainable pore volume and the saturated conductivity. The drainage is
/// scaled by `min(0, 0.9 - receiver wetness)`, so it vanishes unless the
/// receiver is wetter than the limit and then takes the sign of that term.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwatPercolation;

impl SwatPercolation {
    pub const NAME: &'static str = "SWAT percolation";
    pub const VERTICAL_CONNECTOR: VerticalConnector =
        VerticalConnector::new(Self::NAME, Self::use_for_cell);

    pub fn new() -> Self {
        Self
    }

    pub fn use_for_cell(
        network: &mut FluxNetwork,
        cell: CellId,
        no_override: bool,
    ) -> LawResult<Vec<ConnId>> {
        connect_layer_stack(network, cell, no_override, Self::NAME, |_| {
            Ok(Box::new(Self))
        })
    }
}

impl FlowLaw for SwatPercolation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, right: &FluxNode) -> CfResult<()> {
        require_layer(Self::NAME, "left", left)?;
        require_layer(Self::NAME, "right", right)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let (Some(upper), Some(lower)) = (ctx.layer(ends.left), ctx.layer(ends.right)) else {
            return 0.0;
        };
        let capacity = upper.capacity();
        let field_capacity = upper
            .layer
            .soil
            .wetness_at_head(pressure_to_waterhead(FIELD_CAPACITY_PRESSURE))
            * capacity;
        let excess = upper.volume() - field_capacity;
        if excess <= 0.0 {
            return 0.0;
        }

        let drainable = (capacity - field_capacity).max(0.0);
        let conductance = (upper.cell.area * upper.ksat()).max(TRAVEL_TIME_DENOMINATOR_FLOOR);
        let travel_time = drainable / conductance;
        let drained = excess * (1.0 - (-1.0 / travel_time).exp());

        let q = drained * 0.0_f64.min(RECEIVER_WETNESS_LIMIT - lower.wetness());
        ctx.clamp_empty(q, ends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharpness_must_be_positive() {
        assert_eq!(UnsatSatPercolation::new().sharpness(), SATURATION_SHARPNESS);
        assert!(UnsatSatPercolation::new().with_sharpness(0).is_err());
        assert_eq!(
            UnsatSatPercolation::new()
                .with_sharpness(10)
                .unwrap()
                .sharpness(),
            10
        );
    }

    #[test]
    fn field_capacity_head() {
        let head = pressure_to_waterhead(FIELD_CAPACITY_PRESSURE);
        assert!((head + 3.365).abs() < 1e-2);
    }
}
