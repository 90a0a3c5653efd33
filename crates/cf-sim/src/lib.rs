//! Reference transient simulation for catchment flux networks.
//!
//! Provides:
//! - The `TransientModel` trait for explicit integration
//! - Fixed-step Forward Euler and RK4 integrators
//! - `NetworkModel`, driving a `FluxNetwork` through its update, evaluate and
//!   reduce phases
//! - `run_sim` with decimated recording

pub mod error;
pub mod integrator;
pub mod model;
pub mod network_model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, RK4};
pub use model::TransientModel;
pub use network_model::NetworkModel;
pub use sim::{IntegratorType, SimOptions, SimRecord, run_sim};
