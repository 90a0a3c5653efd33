//! Simulation runner and result recording.

use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::integrator::{ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (4 rhs calls per step).
    #[default]
    RK4,
    /// Forward Euler (1 rhs call per step).
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Fixed time step (days)
    pub dt: f64,
    /// Final simulation time (days)
    pub t_end: f64,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    pub integrator: IntegratorType,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1.0 / 24.0,
            t_end: 1.0,
            max_steps: 100_000,
            record_every: 1,
            integrator: IntegratorType::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.t_end.is_finite() && self.t_end >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Recorded trajectory of a simulation.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points (days)
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
}

impl<S> SimRecord<S> {
    pub fn final_state(&self) -> Option<&S> {
        self.x.last()
    }

    pub fn final_time(&self) -> Option<f64> {
        self.t.last().copied()
    }
}

/// Run a transient simulation with a fixed step.
pub fn run_sim<M: TransientModel>(
    model: &mut M,
    opts: &SimOptions,
) -> SimResult<SimRecord<M::State>> {
    opts.validate()?;

    let mut t = 0.0;
    let mut x = model.initial_state();

    let mut t_record = vec![t];
    let mut x_record = vec![x.clone()];

    let mut step = 0;
    while t < opts.t_end && step < opts.max_steps {
        let dt = opts.dt.min(opts.t_end - t);
        x = match opts.integrator {
            IntegratorType::RK4 => RK4.step(model, t, &x, dt)?,
            IntegratorType::ForwardEuler => ForwardEuler.step(model, t, &x, dt)?,
        };
        t += dt;
        step += 1;

        if step % opts.record_every == 0 {
            t_record.push(t);
            x_record.push(x.clone());
        }
    }

    // Always record final state
    if step % opts.record_every != 0 {
        t_record.push(t);
        x_record.push(x);
    }
    debug!(steps = step, t_end = t, "simulation finished");

    Ok(SimRecord {
        t: t_record,
        x: x_record,
    })
}
