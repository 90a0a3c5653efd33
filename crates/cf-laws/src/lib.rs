//! cf-laws: flow-law library for catchment flux networks.
//!
//! Provides:
//! - Soil-water laws (Richards, unsaturated and saturated Darcy, topographic gradient)
//! - Percolation laws (unsaturated/saturated exchange, SWAT storage routing)
//! - Storage-release laws for conceptual reservoirs
//! - Externally controlled fluxes and the `set_flux` override
//! - Cell connectors and an explicit connector registry
//!
//! All laws implement `cf_graph::FlowLaw` and are deterministic functions of
//! the endpoint states, suitable for parallel evaluation.
//!
//! # Example
//!
//! ```
//! use cf_core::{Point, days};
//! use cf_graph::{BoundaryPotential, FluxNetwork, WaterStorage};
//! use cf_laws::LinearStorage;
//!
//! let mut net = FluxNetwork::new();
//! let tank = net
//!     .add_storage("tank", Point::new(0.0, 0.0, 1.0), WaterStorage::new(10.0))
//!     .unwrap();
//! let outlet = net.add_boundary("outlet", Point::default(), BoundaryPotential::Constant(0.0));
//! let conn = net
//!     .connect(tank, outlet, LinearStorage::new(days(2.0)).unwrap())
//!     .unwrap();
//!
//! assert_eq!(net.evaluate(conn, 0.0), Some(5.0));
//! ```

pub mod common;
pub mod connectors;
pub mod darcy;
pub mod error;
pub mod external;
pub mod percolation;
pub mod richards;
pub mod storage;

pub use connectors::{
    CellConnector, ConnectorRegistry, LayerStart, PairGeometry, VerticalConnector,
};
pub use darcy::{Darcy, TopographicGradientDarcy, UnsaturatedDarcy};
pub use error::{LawError, LawResult};
pub use external::{ExternallyControlledFlux, can_set_flux, set_flux};
pub use percolation::{SwatPercolation, UnsatSatPercolation};
pub use richards::Richards;
pub use storage::{
    ConstantStateFlux, ConstrainedLinearStorage, ExponentialDecline, LinearGradient,
    LinearStorage, PowerLaw, WaterbalanceFlux,
};
