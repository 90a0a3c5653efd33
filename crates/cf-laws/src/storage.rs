//! Storage-release laws for conceptual reservoirs.

use cf_core::units::{Length, Time, Volume, as_days, as_m, as_m3, m3};
use cf_core::{CfResult, NodeId, Real};
use cf_graph::{Endpoints, EvalContext, FlowLaw, FluxNode};

use crate::common::{check_positive, require_storage};
use crate::error::{LawError, LawResult};

fn volume_of(ctx: &EvalContext<'_>, node: NodeId) -> Real {
    ctx.node(node).volume().unwrap_or(0.0)
}

/// Linear reservoir: `q = max(0, V - V_residual) / t_r`.
#[derive(Debug, Clone)]
pub struct LinearStorage {
    pub residence_time: Time,
    pub residual: Volume,
}

impl LinearStorage {
    pub const NAME: &'static str = "linear storage";

    pub fn new(residence_time: Time) -> LawResult<Self> {
        check_positive(as_days(residence_time), "residence time must be positive")?;
        Ok(Self {
            residence_time,
            residual: m3(0.0),
        })
    }

    /// Volume that stays in the source storage.
    pub fn with_residual(mut self, residual: Volume) -> LawResult<Self> {
        let v = as_m3(residual);
        if !(v.is_finite() && v >= 0.0) {
            return Err(LawError::InvalidArg {
                what: "residual volume must be non-negative",
            });
        }
        self.residual = residual;
        Ok(self)
    }
}

impl FlowLaw for LinearStorage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_storage(Self::NAME, "left", left)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let active = (volume_of(ctx, ends.left) - as_m3(self.residual)).max(0.0);
        ctx.clamp_empty(active / as_days(self.residence_time), ends)
    }
}

/// Power-law reservoir: `q = Q0 * (V / V0)^beta`.
#[derive(Debug, Clone)]
pub struct PowerLaw {
    /// Outflow at the reference volume (m³/day)
    pub q0: Real,
    pub v0: Volume,
    pub beta: Real,
    pub residual: Volume,
}

impl PowerLaw {
    pub const NAME: &'static str = "power law";

    pub fn new(q0: Real, v0: Volume, beta: Real) -> LawResult<Self> {
        check_positive(q0, "reference outflow must be positive")?;
        check_positive(as_m3(v0), "reference volume must be positive")?;
        if !beta.is_finite() {
            return Err(LawError::InvalidArg {
                what: "power law exponent must be finite",
            });
        }
        Ok(Self {
            q0,
            v0,
            beta,
            residual: m3(0.0),
        })
    }

    pub fn with_residual(mut self, residual: Volume) -> LawResult<Self> {
        let v = as_m3(residual);
        if !(v.is_finite() && v >= 0.0) {
            return Err(LawError::InvalidArg {
                what: "residual volume must be non-negative",
            });
        }
        self.residual = residual;
        Ok(self)
    }
}

impl FlowLaw for PowerLaw {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_storage(Self::NAME, "left", left)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let active = (volume_of(ctx, ends.left) - as_m3(self.residual)).max(0.0);
        let q = self.q0 * (active / as_m3(self.v0)).powf(self.beta);
        ctx.clamp_empty(q, ends)
    }
}

/// Exponential recession: `q = Q0 * exp((V - V0) / m)`.
#[derive(Debug, Clone)]
pub struct ExponentialDecline {
    pub q0: Real,
    pub v0: Volume,
    /// Volume scale of the decline (m³)
    pub m: Real,
}

impl ExponentialDecline {
    pub const NAME: &'static str = "exponential decline";

    pub fn new(q0: Real, v0: Volume, m: Real) -> LawResult<Self> {
        check_positive(q0, "reference outflow must be positive")?;
        if !as_m3(v0).is_finite() {
            return Err(LawError::InvalidArg {
                what: "reference volume must be finite",
            });
        }
        if !(m.is_finite() && m != 0.0) {
            return Err(LawError::InvalidArg {
                what: "decline scale must be finite and non-zero",
            });
        }
        Ok(Self { q0, v0, m })
    }
}

impl FlowLaw for ExponentialDecline {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_storage(Self::NAME, "left", left)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let q = self.q0 * ((volume_of(ctx, ends.left) - as_m3(self.v0)) / self.m).exp();
        ctx.clamp_empty(q, ends)
    }
}

/// Linear reservoir throttled by the free space of the receiver:
/// `q = (V_l - V_l,min) / t_r * (C / V_r,max)` with
/// `C = max(0, V_r,max - V_r)`.
#[derive(Debug, Clone)]
pub struct ConstrainedLinearStorage {
    pub residence_time: Time,
    pub left_min: Volume,
    pub right_max: Volume,
}

impl ConstrainedLinearStorage {
    pub const NAME: &'static str = "constrained linear storage";

    pub fn new(residence_time: Time, left_min: Volume, right_max: Volume) -> LawResult<Self> {
        check_positive(as_days(residence_time), "residence time must be positive")?;
        check_positive(as_m3(right_max), "receiver capacity must be positive")?;
        if !as_m3(left_min).is_finite() {
            return Err(LawError::InvalidArg {
                what: "minimum source volume must be finite",
            });
        }
        Ok(Self {
            residence_time,
            left_min,
            right_max,
        })
    }
}

impl FlowLaw for ConstrainedLinearStorage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, right: &FluxNode) -> CfResult<()> {
        require_storage(Self::NAME, "left", left)?;
        require_storage(Self::NAME, "right", right)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let available = (volume_of(ctx, ends.left) - as_m3(self.left_min)).max(0.0);
        let right_max = as_m3(self.right_max);
        let free = (right_max - volume_of(ctx, ends.right)).max(0.0);
        let q = available / as_days(self.residence_time) * (free / right_max);
        ctx.clamp_empty(q, ends)
    }
}

/// Drives the state of the left storage towards a target within the
/// reaction time, exchanging water with the right node.
#[derive(Debug, Clone)]
pub struct ConstantStateFlux {
    pub target_state: Real,
    pub reaction_time: Time,
}

impl ConstantStateFlux {
    pub const NAME: &'static str = "constant state flux";

    pub fn new(target_state: Real, reaction_time: Time) -> LawResult<Self> {
        check_positive(as_days(reaction_time), "reaction time must be positive")?;
        if !target_state.is_finite() {
            return Err(LawError::InvalidArg {
                what: "target state must be finite",
            });
        }
        Ok(Self {
            target_state,
            reaction_time,
        })
    }
}

impl FlowLaw for ConstantStateFlux {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        require_storage(Self::NAME, "left", left)
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let state = ctx.node(ends.left).state().unwrap_or(0.0);
        let delta = state - self.target_state;
        let q = delta / as_days(self.reaction_time);
        if delta > 0.0 && ctx.is_empty(ends.left) {
            return 0.0;
        }
        if delta < 0.0 && ctx.is_empty(ends.right) {
            return 0.0;
        }
        q
    }
}

/// Flux proportional to the potential difference: `q = K * A * Δψ / d`.
#[derive(Debug, Clone)]
pub struct LinearGradient {
    /// Conductivity (m/day)
    pub k: Real,
    /// Flow cross section (m²)
    pub area: Real,
    pub distance: Length,
}

impl LinearGradient {
    pub const NAME: &'static str = "linear gradient";

    pub fn new(k: Real, area: Real, distance: Length) -> LawResult<Self> {
        check_positive(k, "conductivity must be positive")?;
        check_positive(area, "flow area must be positive")?;
        check_positive(as_m(distance), "distance must be positive")?;
        Ok(Self { k, area, distance })
    }
}

impl FlowLaw for LinearGradient {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let gradient = (ctx.potential(ends.left) - ctx.potential(ends.right)) / as_m(self.distance);
        ctx.clamp_empty(self.k * self.area * gradient, ends)
    }
}

/// Passes the net inflow of the left node on to the right node.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaterbalanceFlux;

impl WaterbalanceFlux {
    pub const NAME: &'static str = "water balance flux";

    pub fn new() -> Self {
        Self
    }
}

impl FlowLaw for WaterbalanceFlux {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn recalc_always(&self) -> bool {
        true
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        ctx.water_balance(ends.left).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::units::{days, hours, m};

    #[test]
    fn constructors_validate_parameters() {
        assert!(LinearStorage::new(days(0.0)).is_err());
        assert!(LinearStorage::new(days(2.0)).is_ok());
        assert!(
            LinearStorage::new(days(1.0))
                .unwrap()
                .with_residual(m3(-1.0))
                .is_err()
        );
        assert!(PowerLaw::new(1.0, m3(0.0), 2.0).is_err());
        assert!(ExponentialDecline::new(1.0, m3(5.0), 0.0).is_err());
        assert!(ConstrainedLinearStorage::new(days(1.0), m3(0.0), m3(0.0)).is_err());
        assert!(ConstantStateFlux::new(1.0, hours(-1.0)).is_err());
        assert!(LinearGradient::new(1.0, 1.0, m(0.0)).is_err());
    }

    #[test]
    fn reaction_time_is_read_in_days() {
        let law = ConstantStateFlux::new(0.0, hours(12.0)).unwrap();
        assert!((as_days(law.reaction_time) - 0.5).abs() < 1e-12);
    }
}
