//! Retention-curve seam.
//!
//! Soil physics is owned by the surrounding cell model. The network only
//! calls the pure functions of this trait; `LinearRetention` is a conceptual
//! curve for assembling and testing networks.

use std::fmt;

use cf_core::{CfResult, Real, ensure_positive};

/// Pure soil-hydraulic functions of a layer's state.
///
/// Depths are metres below the local surface, conductivities m/day.
pub trait RetentionCurve: Send + Sync + fmt::Debug {
    /// Unsaturated conductivity at `wetness` (0..1) and `depth`.
    fn k(&self, wetness: Real, depth: Real) -> Real;

    /// Saturated conductivity at `depth`.
    fn ksat(&self, depth: Real) -> Real {
        self.k(1.0, depth)
    }

    /// Pore volume fraction at `depth`.
    fn porosity(&self, depth: Real) -> Real;

    /// Matric potential (m water column, ≤ 0 when unsaturated).
    fn matric_potential(&self, wetness: Real) -> Real;

    /// Wetness in equilibrium with a pressure `head` (m, negative for suction).
    fn wetness_at_head(&self, head: Real) -> Real;

    /// Conductivity integrated from `upper` to `lower` depth (m²/day).
    fn transmissivity(&self, upper: Real, lower: Real, wetness: Real) -> Real {
        if lower <= upper {
            return 0.0;
        }
        self.k(wetness, 0.5 * (upper + lower)) * (lower - upper)
    }
}

/// Conceptual retention curve: linear head/wetness relation, power-law
/// conductivity and optional exponential decline of Ksat with depth.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearRetention {
    /// Saturated conductivity at the surface (m/day)
    pub ksat: Real,
    /// Porosity (m³/m³)
    pub porosity: Real,
    /// Exponent of the conductivity curve
    pub beta: Real,
    /// Suction (m) at zero wetness
    pub suction_range: Real,
    /// Fractional decline of Ksat per metre depth (0 = none)
    pub ksat_decay: Real,
}

impl LinearRetention {
    pub fn new(ksat: Real, porosity: Real) -> CfResult<Self> {
        ensure_positive(ksat, "ksat must be positive")?;
        ensure_positive(porosity, "porosity must be positive")?;
        Ok(Self {
            ksat,
            porosity,
            beta: 1.0,
            suction_range: 1.0,
            ksat_decay: 0.0,
        })
    }

    pub fn with_beta(mut self, beta: Real) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_suction_range(mut self, suction_range: Real) -> CfResult<Self> {
        self.suction_range = ensure_positive(suction_range, "suction_range must be positive")?;
        Ok(self)
    }

    pub fn with_ksat_decay(mut self, decay: Real) -> CfResult<Self> {
        if !(0.0..1.0).contains(&decay) {
            return Err(cf_core::CfError::InvalidArg {
                what: "ksat_decay must be in [0, 1)",
            });
        }
        self.ksat_decay = decay;
        Ok(self)
    }

    fn depth_factor(&self, depth: Real) -> Real {
        (1.0 - self.ksat_decay).powf(depth)
    }
}

impl RetentionCurve for LinearRetention {
    fn k(&self, wetness: Real, depth: Real) -> Real {
        self.ksat * wetness.clamp(0.0, 1.0).powf(self.beta) * self.depth_factor(depth)
    }

    fn porosity(&self, _depth: Real) -> Real {
        self.porosity
    }

    fn matric_potential(&self, wetness: Real) -> Real {
        -(1.0 - wetness) * self.suction_range
    }

    fn wetness_at_head(&self, head: Real) -> Real {
        (1.0 + head / self.suction_range).clamp(0.0, 1.0)
    }

    fn transmissivity(&self, upper: Real, lower: Real, wetness: Real) -> Real {
        if lower <= upper {
            return 0.0;
        }
        let k0 = self.ksat * wetness.clamp(0.0, 1.0).powf(self.beta);
        if self.ksat_decay == 0.0 {
            return k0 * (lower - upper);
        }
        let ln_f = (1.0 - self.ksat_decay).ln();
        k0 * (self.depth_factor(lower) - self.depth_factor(upper)) / ln_f
    }
}
