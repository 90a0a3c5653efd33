//! cf-core: stable foundation for catchflow.
//!
//! Contains:
//! - units (uom SI types, constructors, area/depth conversions)
//! - numeric (Real, tolerances, means and the sigmoid used by flow laws)
//! - ids (compact ids for nodes, connections and cells)
//! - geometry (3-D points)
//! - error (shared error types)

pub mod error;
pub mod geometry;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CfError, CfResult, ensure_positive};
pub use geometry::Point;
pub use ids::*;
pub use numeric::*;
pub use units::*;
