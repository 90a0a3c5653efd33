//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// A system advanced in time by an explicit integrator.
///
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS: x_dot = f(t, x), with t in days
/// - Vector-space arithmetic on states for the integrator stages
pub trait TransientModel {
    type State: Clone;

    /// Return the initial state at t=0.
    fn initial_state(&self) -> Self::State;

    /// Compute the state derivative dxdt = f(t, x).
    ///
    /// Takes `&mut self` so models can write `x` into their own storage
    /// and reuse cached evaluations.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Element-wise `a + b`.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// `scale * a`.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}
