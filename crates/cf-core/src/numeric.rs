use crate::CfError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CfError::NonFinite { what, value: v })
    }
}

/// Geometric mean `sqrt(a * b)`.
///
/// Used to combine the conductivities of two sides symmetrically. Negative
/// products (which are not physical for conductivities) yield 0.
#[inline]
pub fn geo_mean(a: Real, b: Real) -> Real {
    let p = a * b;
    if p > 0.0 { p.sqrt() } else { 0.0 }
}

/// Arithmetic mean of two values.
#[inline]
pub fn mean(a: Real, b: Real) -> Real {
    0.5 * (a + b)
}

/// Logistic step centred at `x_half` with width `tau`.
///
/// Returns 0.5 at `x == x_half`, tends to 1 above and to 0 below.
#[inline]
pub fn boltzmann(x: Real, x_half: Real, tau: Real) -> Real {
    1.0 / (1.0 + ((x_half - x) / tau).exp())
}
