//! The flux network: an arena of nodes, cells and connections.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use cf_core::{CellId, CfError, CfResult, ConnId, NodeId, Point, Real, ensure_positive};

use crate::cell::{Cell, CrossSectionMode};
use crate::error::GraphError;
use crate::law::{EvalContext, FlowLaw};
use crate::layer::LayerView;
use crate::node::{
    BoundaryPotential, DirichletBoundary, FluxNode, LayerKind, NodeKind, SoilLayer, StateKind,
    WaterStorage,
};
use crate::soil::RetentionCurve;

/// Network-wide settings.
#[derive(Clone, Debug)]
pub struct NetworkOptions {
    /// Overlap rule for lateral layer cross sections
    pub cross_section: CrossSectionMode,
    /// Volume (m³) at or below which a storage counts as empty
    pub empty_tolerance: Real,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            cross_section: CrossSectionMode::default(),
            empty_tolerance: 0.0,
        }
    }
}

/// A flow law bound to two nodes. Positive flux is left → right.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnId,
    pub left: NodeId,
    pub right: NodeId,
    law: Box<dyn FlowLaw>,
}

impl Connection {
    pub fn law(&self) -> &dyn FlowLaw {
        self.law.as_ref()
    }

    pub fn law_mut(&mut self) -> &mut dyn FlowLaw {
        self.law.as_mut()
    }

    pub fn name(&self) -> &'static str {
        self.law.name()
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.left {
            Some(self.right)
        } else if node == self.right {
            Some(self.left)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        node == self.left || node == self.right
    }
}

/// Nodes, cells and the connections between nodes.
///
/// Connections live in an arena keyed by `ConnId`. Each node lists the ids
/// of its incident connections; a connection is dropped when it is
/// disconnected or replaced. At most one connection exists per node pair.
///
/// The arena is append-only: a dropped connection leaves an empty slot and
/// its id is never handed out again, so a stale `ConnId` (or a `FluxTable`
/// entry keyed by it) can never alias a newer connection. Networks that are
/// rewired heavily grow by one slot per replacement.
#[derive(Debug, Default)]
pub struct FluxNetwork {
    options: NetworkOptions,
    nodes: Vec<FluxNode>,
    cells: Vec<Cell>,
    connections: Vec<Option<Connection>>,
}

impl FluxNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NetworkOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    // ---- nodes -------------------------------------------------------------

    fn push_node(&mut self, name: String, position: Point, kind: NodeKind) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(FluxNode::new(id, name, position, kind));
        id
    }

    /// Add a free storage (not part of a cell's layer stack).
    pub fn add_storage(
        &mut self,
        name: impl Into<String>,
        position: Point,
        storage: WaterStorage,
    ) -> CfResult<NodeId> {
        if storage.state_kind == StateKind::Depth {
            ensure_positive(storage.area, "storage area must be positive")?;
        }
        Ok(self.push_node(name.into(), position, NodeKind::Storage(storage)))
    }

    /// Add a boundary condition with an externally driven potential.
    pub fn add_boundary(
        &mut self,
        name: impl Into<String>,
        position: Point,
        potential: BoundaryPotential,
    ) -> NodeId {
        self.push_node(
            name.into(),
            position,
            NodeKind::Boundary(DirichletBoundary { potential }),
        )
    }

    pub fn set_boundary_potential(
        &mut self,
        node: NodeId,
        potential: BoundaryPotential,
    ) -> CfResult<()> {
        let n = self
            .nodes
            .get_mut(node.slot())
            .ok_or(GraphError::UnknownNode(node))?;
        match &mut n.kind {
            NodeKind::Boundary(b) => {
                b.potential = potential;
                Ok(())
            }
            _ => Err(CfError::InvalidArg {
                what: "node is not a boundary condition",
            }),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&FluxNode> {
        self.nodes.get(id.slot())
    }

    pub fn nodes(&self) -> &[FluxNode] {
        &self.nodes
    }

    /// Ids of all nodes that own a water state, in id order.
    pub fn storage_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_storage())
            .map(|n| n.id)
            .collect()
    }

    // ---- cells and layers --------------------------------------------------

    /// Add a cell with its surface position and area (m²).
    pub fn add_cell(&mut self, position: Point, area: Real) -> CfResult<CellId> {
        ensure_positive(area, "cell area must be positive")?;
        let id = CellId::from_usize(self.cells.len());
        self.cells.push(Cell::new(id, position, area));
        Ok(id)
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.slot())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Append a fixed layer below the current layer stack of `cell`.
    pub fn add_layer(
        &mut self,
        cell: CellId,
        lower_boundary: Real,
        soil: Arc<dyn RetentionCurve>,
        wetness: Real,
    ) -> CfResult<NodeId> {
        self.add_layer_of_kind(cell, lower_boundary, soil, wetness, LayerKind::Fixed)
    }

    /// Append a layer of the given kind below the current layer stack.
    ///
    /// The new layer starts at the lower boundary of the previous one (or at
    /// the surface) and is filled to `wetness` of its pore volume.
    pub fn add_layer_of_kind(
        &mut self,
        cell: CellId,
        lower_boundary: Real,
        soil: Arc<dyn RetentionCurve>,
        wetness: Real,
        kind: LayerKind,
    ) -> CfResult<NodeId> {
        let c = self.cells.get(cell.slot()).ok_or(GraphError::UnknownCell(cell))?;
        let upper_boundary = c
            .layers
            .last()
            .and_then(|id| self.nodes[id.slot()].as_layer())
            .map_or(0.0, |l| l.lower_boundary);
        if !(lower_boundary > upper_boundary) {
            return Err(GraphError::InvalidLayer {
                cell,
                what: "lower boundary must lie below the upper boundary",
            }
            .into());
        }
        if !(wetness.is_finite() && wetness >= 0.0) {
            return Err(GraphError::InvalidLayer {
                cell,
                what: "initial wetness must be non-negative",
            }
            .into());
        }

        let mid = 0.5 * (upper_boundary + lower_boundary);
        let volume = wetness * soil.porosity(mid) * c.area * (lower_boundary - upper_boundary);
        let position_in_stack = c.layers.len();
        let location = c.position.below(mid);

        let layer = SoilLayer {
            cell,
            position: position_in_stack,
            upper_boundary,
            lower_boundary,
            soil,
            volume,
            kind,
        };
        let name = format!("layer #{position_in_stack} of cell #{cell}");
        let id = self.push_node(name, location, NodeKind::Layer(layer));
        self.cells[cell.slot()].layers.push(id);
        Ok(id)
    }

    pub fn layer_view(&self, id: NodeId) -> Option<LayerView<'_>> {
        let layer = self.nodes.get(id.slot())?.as_layer()?;
        let cell = self.cells.get(layer.cell.slot())?;
        Some(LayerView::new(layer, cell))
    }

    /// Declare two cells adjacent with a shared face of `flow_width` (m).
    pub fn set_neighbors(&mut self, a: CellId, b: CellId, flow_width: Real) -> CfResult<()> {
        if a == b {
            return Err(GraphError::SelfNeighbor(a).into());
        }
        for c in [a, b] {
            if c.slot() >= self.cells.len() {
                return Err(GraphError::UnknownCell(c).into());
            }
        }
        if !(flow_width.is_finite() && flow_width >= 0.0) {
            return Err(CfError::InvalidArg {
                what: "flow width must be non-negative",
            });
        }
        self.cells[a.slot()].topology.set_width(b, flow_width);
        self.cells[b.slot()].topology.set_width(a, flow_width);
        Ok(())
    }

    /// Flow cross section (m²) between two layers.
    ///
    /// Vertically adjacent layers of one cell share the cell area; layers of
    /// neighbouring cells share the flow width times their vertical overlap.
    pub fn flow_cross_section(&self, a: NodeId, b: NodeId) -> Real {
        let (Some(la), Some(lb)) = (self.layer_view(a), self.layer_view(b)) else {
            return 0.0;
        };
        if la.layer.cell == lb.layer.cell {
            return if la.layer.position.abs_diff(lb.layer.position) == 1 {
                la.cell.area
            } else {
                0.0
            };
        }
        let width = la.cell.topology.flow_width(lb.layer.cell);
        if width <= 0.0 {
            return 0.0;
        }
        let (upper, lower) = match self.options.cross_section {
            CrossSectionMode::TerrainFollowing => (
                (-la.upper_boundary()).min(-lb.upper_boundary()),
                (-la.lower_boundary()).max(-lb.lower_boundary()),
            ),
            CrossSectionMode::Horizontal => {
                let (za, zb) = (la.cell.position.z, lb.cell.position.z);
                (
                    (za - la.upper_boundary()).min(zb - lb.upper_boundary()),
                    (za - la.lower_boundary()).max(zb - lb.lower_boundary()),
                )
            }
        };
        if upper > lower {
            (upper - lower) * width
        } else {
            0.0
        }
    }

    /// Saturated depth of the deepest unsaturated layer of `cell` (m).
    ///
    /// Falls back to the top layer when the whole column is saturated and
    /// to 0 for cells without layers.
    pub fn cell_saturated_depth(&self, cell: CellId) -> Real {
        let Some(c) = self.cell(cell) else {
            return 0.0;
        };
        for &id in c.layers.iter().rev() {
            if let Some(view) = self.layer_view(id) {
                if !view.is_saturated() {
                    return view.saturated_depth();
                }
            }
        }
        c.layers
            .first()
            .and_then(|&id| self.layer_view(id))
            .map_or(0.0, |v| v.saturated_depth())
    }

    // ---- node state --------------------------------------------------------

    /// Total hydraulic potential of a node at time `t` (m).
    pub fn potential(&self, id: NodeId, t: Real) -> Real {
        let Some(node) = self.node(id) else {
            return 0.0;
        };
        match &node.kind {
            NodeKind::Storage(s) => match s.state_kind {
                StateKind::Volume => node.position.z,
                StateKind::Depth => node.position.z + s.depth(),
            },
            NodeKind::Layer(_) => self.layer_view(id).map_or(0.0, |v| v.potential()),
            NodeKind::Boundary(b) => b.potential.at(t),
        }
    }

    /// Whether a storage is drained. Boundaries are never empty.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.node(id)
            .and_then(FluxNode::volume)
            .is_some_and(|v| v <= self.options.empty_tolerance)
    }

    pub fn volume(&self, id: NodeId) -> Option<Real> {
        self.node(id)?.volume()
    }

    pub fn state(&self, id: NodeId) -> Option<Real> {
        self.node(id)?.state()
    }

    pub fn set_volume(&mut self, id: NodeId, volume: Real) -> CfResult<()> {
        let node = self
            .nodes
            .get_mut(id.slot())
            .ok_or(GraphError::UnknownNode(id))?;
        if node.set_volume(volume) {
            Ok(())
        } else {
            Err(GraphError::NotAStorage {
                node: id,
                name: node.name.clone(),
            }
            .into())
        }
    }

    pub fn set_state(&mut self, id: NodeId, state: Real) -> CfResult<()> {
        let node = self
            .nodes
            .get_mut(id.slot())
            .ok_or(GraphError::UnknownNode(id))?;
        if node.set_state(state) {
            Ok(())
        } else {
            Err(GraphError::NotAStorage {
                node: id,
                name: node.name.clone(),
            }
            .into())
        }
    }

    // ---- connections -------------------------------------------------------

    /// Bind `law` between `left` and `right`.
    ///
    /// An existing connection between the same pair is replaced.
    pub fn connect<L: FlowLaw + 'static>(
        &mut self,
        left: NodeId,
        right: NodeId,
        law: L,
    ) -> CfResult<ConnId> {
        self.connect_boxed(left, right, Box::new(law))
    }

    pub fn connect_boxed(
        &mut self,
        left: NodeId,
        right: NodeId,
        law: Box<dyn FlowLaw>,
    ) -> CfResult<ConnId> {
        if left == right {
            return Err(GraphError::SelfConnection { node: left }.into());
        }
        let l = self.node(left).ok_or(GraphError::UnknownNode(left))?;
        let r = self.node(right).ok_or(GraphError::UnknownNode(right))?;
        law.validate(l, r)?;

        if let Some(old) = self.connection_between(left, right).map(|c| c.id) {
            debug!(conn = %old, law = law.name(), "replacing existing connection");
            self.disconnect(old);
        }

        // Never reuse a freed slot.
        let id = ConnId::from_usize(self.connections.len());
        debug!(conn = %id, law = law.name(), left = %left, right = %right, "connected");
        self.connections.push(Some(Connection {
            id,
            left,
            right,
            law,
        }));
        self.nodes[left.slot()].connections.push(id);
        self.nodes[right.slot()].connections.push(id);
        Ok(id)
    }

    /// Remove a connection from the network and from both endpoints.
    pub fn disconnect(&mut self, id: ConnId) -> bool {
        let Some(conn) = self.connections.get_mut(id.slot()).and_then(Option::take) else {
            return false;
        };
        for node in [conn.left, conn.right] {
            self.nodes[node.slot()].connections.retain(|c| *c != id);
        }
        debug!(conn = %id, law = conn.name(), "disconnected");
        true
    }

    pub fn connection(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(id.slot())?.as_ref()
    }

    pub fn connection_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.connections.get_mut(id.slot())?.as_mut()
    }

    /// The connection between two nodes, in either direction.
    pub fn connection_between(&self, a: NodeId, b: NodeId) -> Option<&Connection> {
        let node = self.node(a)?;
        node.connections
            .iter()
            .filter_map(|&id| self.connection(id))
            .find(|c| c.other_end(a) == Some(b))
    }

    pub fn connection_between_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Connection> {
        let id = self.connection_between(a, b)?.id;
        self.connection_mut(id)
    }

    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.connection_between(a, b).is_some()
    }

    /// Ids of all live connections, in creation order.
    pub fn list_active_connections(&self) -> Vec<ConnId> {
        self.connections.iter().flatten().map(|c| c.id).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().flatten().count()
    }

    // ---- evaluation --------------------------------------------------------

    /// Flux of one connection at time `t` (m³/day, positive left → right).
    pub fn evaluate(&self, id: ConnId, t: Real) -> Option<Real> {
        self.connection(id)?;
        Some(EvalContext::new(self, t).eval(id))
    }

    /// Net inflow into `node` over all its connections (m³/day).
    pub fn water_balance(&self, node: NodeId, t: Real) -> Real {
        if self.node(node).is_none() {
            return 0.0;
        }
        EvalContext::new(self, t).water_balance(node)
    }

    /// Evaluate every live connection in parallel.
    ///
    /// Read-only: node state must not change while this runs.
    pub fn evaluate_all(&self, t: Real) -> Vec<(ConnId, Real)> {
        self.connections
            .par_iter()
            .filter_map(Option::as_ref)
            .map(|c| (c.id, EvalContext::new(self, t).eval(c.id)))
            .collect()
    }

    /// Sum connection fluxes into a per-node derivative, indexed by node slot.
    pub fn node_derivatives(&self, fluxes: &[(ConnId, Real)]) -> Vec<Real> {
        let mut dxdt = vec![0.0; self.nodes.len()];
        for &(id, q) in fluxes {
            if let Some(c) = self.connection(id) {
                dxdt[c.left.slot()] -= q;
                dxdt[c.right.slot()] += q;
            }
        }
        dxdt
    }
}
