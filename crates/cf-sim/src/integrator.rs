//! Fixed-step time integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

pub trait Integrator {
    /// Advance the state by one step of `dt` days.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical fourth-order Runge-Kutta.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Explicit Euler, one rhs call per step.
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}
