//! Cells, their layer stacks and lateral topology.

use cf_core::{CellId, NodeId, Point, Real, m3_to_mm, mm_to_m3};

/// How the vertical overlap of layers in neighbouring cells is measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrossSectionMode {
    /// Layers follow the terrain: compare depths below the local surface.
    #[default]
    TerrainFollowing,
    /// Layers are horizontal: compare absolute elevations.
    Horizontal,
}

/// Lateral neighbourhood of a cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
    neighbors: Vec<(CellId, Real)>,
}

impl Topology {
    /// Width of the shared face with `other` (m); 0 if not adjacent.
    pub fn flow_width(&self, other: CellId) -> Real {
        self.neighbors
            .iter()
            .find(|(c, _)| *c == other)
            .map_or(0.0, |(_, w)| *w)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = (CellId, Real)> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub(crate) fn set_width(&mut self, other: CellId, width: Real) {
        match self.neighbors.iter_mut().find(|(c, _)| *c == other) {
            Some(entry) => entry.1 = width,
            None => self.neighbors.push((other, width)),
        }
    }
}

/// A landscape cell: a surface position, an area and a stack of layers.
#[derive(Clone, Debug)]
pub struct Cell {
    pub id: CellId,
    /// Surface position; `z` is the land surface elevation (m)
    pub position: Point,
    /// Horizontal area (m²)
    pub area: Real,
    pub(crate) layers: Vec<NodeId>,
    pub(crate) topology: Topology,
}

impl Cell {
    pub(crate) fn new(id: CellId, position: Point, area: Real) -> Self {
        Self {
            id,
            position,
            area,
            layers: Vec::new(),
            topology: Topology::default(),
        }
    }

    pub fn layers(&self) -> &[NodeId] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<NodeId> {
        self.layers.get(index).copied()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Volume (m³) as water depth (mm) over this cell.
    pub fn m3_to_mm(&self, volume: Real) -> Real {
        m3_to_mm(volume, self.area)
    }

    /// Water depth (mm) over this cell as volume (m³).
    pub fn mm_to_m3(&self, depth: Real) -> Real {
        mm_to_m3(depth, self.area)
    }
}
