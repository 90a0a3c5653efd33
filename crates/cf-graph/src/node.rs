//! Flux nodes: storages, soil layers and boundary conditions.

use std::fmt;
use std::sync::Arc;

use cf_core::{CellId, ConnId, NodeId, Point, Real};

use crate::soil::RetentionCurve;

/// What the scalar state of a storage represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateKind {
    /// State is the stored volume (m³).
    #[default]
    Volume,
    /// State is the water depth over the storage area (m).
    Depth,
}

/// A generic water storage owning a volume.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterStorage {
    /// Stored water (m³)
    pub volume: Real,
    /// Base area used for depth conversions (m²)
    pub area: Real,
    pub state_kind: StateKind,
}

impl WaterStorage {
    /// A storage whose state is its volume.
    pub fn new(volume: Real) -> Self {
        Self {
            volume,
            area: 1.0,
            state_kind: StateKind::Volume,
        }
    }

    /// A storage whose state is the water depth over `area`.
    pub fn with_depth_state(volume: Real, area: Real) -> Self {
        Self {
            volume,
            area,
            state_kind: StateKind::Depth,
        }
    }

    /// Water depth over the storage area (m).
    pub fn depth(&self) -> Real {
        self.volume / self.area
    }

    pub fn state(&self) -> Real {
        match self.state_kind {
            StateKind::Volume => self.volume,
            StateKind::Depth => self.depth(),
        }
    }

    pub fn set_state(&mut self, state: Real) {
        self.volume = match self.state_kind {
            StateKind::Volume => state,
            StateKind::Depth => state * self.area,
        };
    }
}

/// Source of a boundary potential.
#[derive(Clone)]
pub enum BoundaryPotential {
    Constant(Real),
    /// Potential as a function of model time (days).
    Forced(Arc<dyn Fn(Real) -> Real + Send + Sync>),
}

impl BoundaryPotential {
    pub fn at(&self, t: Real) -> Real {
        match self {
            BoundaryPotential::Constant(p) => *p,
            BoundaryPotential::Forced(f) => f(t),
        }
    }

    pub fn is_time_dependent(&self) -> bool {
        matches!(self, BoundaryPotential::Forced(_))
    }
}

impl fmt::Debug for BoundaryPotential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPotential::Constant(p) => write!(f, "Constant({p})"),
            BoundaryPotential::Forced(_) => write!(f, "Forced(..)"),
        }
    }
}

/// Boundary condition with an externally driven potential and no state.
#[derive(Clone, Debug)]
pub struct DirichletBoundary {
    pub potential: BoundaryPotential,
}

/// Whether a layer's thickness is fixed or follows its water content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayerKind {
    #[default]
    Fixed,
    /// Saturated zone whose upper boundary moves with the stored volume.
    VariableSaturated,
}

/// A soil layer of a cell. Geometry is in metres below the cell surface.
#[derive(Clone, Debug)]
pub struct SoilLayer {
    pub cell: CellId,
    /// Position in the cell's layer stack (0 = top)
    pub position: usize,
    pub upper_boundary: Real,
    pub lower_boundary: Real,
    pub soil: Arc<dyn RetentionCurve>,
    /// Stored water (m³)
    pub volume: Real,
    pub kind: LayerKind,
}

/// Node variants.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Storage(WaterStorage),
    Layer(SoilLayer),
    Boundary(DirichletBoundary),
}

/// An endpoint of flux connections.
///
/// Nodes do not own their connections; they list the ids of the incident
/// connections stored in the network arena.
#[derive(Clone, Debug)]
pub struct FluxNode {
    pub id: NodeId,
    pub name: String,
    pub position: Point,
    pub kind: NodeKind,
    pub(crate) connections: Vec<ConnId>,
}

impl FluxNode {
    pub(crate) fn new(id: NodeId, name: String, position: Point, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            position,
            kind,
            connections: Vec::new(),
        }
    }

    /// Ids of the connections incident to this node.
    pub fn connections(&self) -> &[ConnId] {
        &self.connections
    }

    /// True for nodes owning a volume (storages and layers).
    pub fn is_storage(&self) -> bool {
        matches!(self.kind, NodeKind::Storage(_) | NodeKind::Layer(_))
    }

    pub fn volume(&self) -> Option<Real> {
        match &self.kind {
            NodeKind::Storage(s) => Some(s.volume),
            NodeKind::Layer(l) => Some(l.volume),
            NodeKind::Boundary(_) => None,
        }
    }

    /// Scalar state (volume or depth, depending on the storage).
    pub fn state(&self) -> Option<Real> {
        match &self.kind {
            NodeKind::Storage(s) => Some(s.state()),
            NodeKind::Layer(l) => Some(l.volume),
            NodeKind::Boundary(_) => None,
        }
    }

    pub fn as_layer(&self) -> Option<&SoilLayer> {
        match &self.kind {
            NodeKind::Layer(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_storage(&self) -> Option<&WaterStorage> {
        match &self.kind {
            NodeKind::Storage(s) => Some(s),
            _ => None,
        }
    }

    /// Potential that depends on model time (forced boundaries).
    pub fn is_time_dependent(&self) -> bool {
        match &self.kind {
            NodeKind::Boundary(b) => b.potential.is_time_dependent(),
            _ => false,
        }
    }

    pub(crate) fn set_volume(&mut self, volume: Real) -> bool {
        match &mut self.kind {
            NodeKind::Storage(s) => {
                s.volume = volume;
                true
            }
            NodeKind::Layer(l) => {
                l.volume = volume;
                true
            }
            NodeKind::Boundary(_) => false,
        }
    }

    pub(crate) fn set_state(&mut self, state: Real) -> bool {
        match &mut self.kind {
            NodeKind::Storage(s) => {
                s.set_state(state);
                true
            }
            NodeKind::Layer(l) => {
                l.volume = state;
                true
            }
            NodeKind::Boundary(_) => false,
        }
    }
}

impl fmt::Display for FluxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.name, self.id)
    }
}
