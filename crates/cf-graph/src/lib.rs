//! cf-graph: flux network layer for catchflow.
//!
//! Provides:
//! - Flux nodes (storages, soil layers, boundary conditions)
//! - Cells with layer stacks and lateral topology
//! - The `FlowLaw` contract and its evaluation context
//! - The arena-backed `FluxNetwork` with parallel flux evaluation
//! - Flux caching and stable state indexing for integrators
//!
//! # Example
//!
//! ```
//! use cf_core::Point;
//! use cf_graph::{BoundaryPotential, FluxNetwork, WaterStorage};
//!
//! let mut net = FluxNetwork::new();
//! let tank = net
//!     .add_storage("tank", Point::new(0.0, 0.0, 1.0), WaterStorage::new(10.0))
//!     .unwrap();
//! let outlet = net.add_boundary("outlet", Point::default(), BoundaryPotential::Constant(0.0));
//!
//! assert_eq!(net.potential(tank, 0.0), 1.0);
//! assert!(!net.is_empty(outlet));
//! assert_eq!(net.connection_count(), 0);
//! ```

pub mod cell;
pub mod error;
pub mod flux_table;
pub mod indexing;
pub mod law;
pub mod layer;
pub mod network;
pub mod node;
pub mod soil;

// Re-exports for ergonomics
pub use cell::{Cell, CrossSectionMode, Topology};
pub use error::GraphError;
pub use flux_table::FluxTable;
pub use indexing::StateIndex;
pub use law::{Endpoints, EvalContext, FlowLaw, prevent_negative_volume};
pub use layer::LayerView;
pub use network::{Connection, FluxNetwork, NetworkOptions};
pub use node::{
    BoundaryPotential, DirichletBoundary, FluxNode, LayerKind, NodeKind, SoilLayer, StateKind,
    WaterStorage,
};
pub use soil::{LinearRetention, RetentionCurve};
