//! Topology-driven construction of connections between soil layers.
//!
//! Lateral connectors wire the layer stacks of two neighbouring cells,
//! vertical connectors wire the layer stack of a single cell. Connectors are
//! looked up by law name in an explicitly constructed [`ConnectorRegistry`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use cf_core::{CellId, ConnId, NodeId, Real};
use cf_graph::{FlowLaw, FluxNetwork, GraphError};
use tracing::{debug, trace};

use crate::error::{LawError, LawResult};

/// First layer index taking part in a lateral connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerStart {
    /// Connect layers from this index downwards.
    At(usize),
    /// Skip the layer stacks entirely.
    SurfaceOnly,
}

impl Default for LayerStart {
    fn default() -> Self {
        LayerStart::At(0)
    }
}

impl LayerStart {
    fn range(self, layer_count: usize) -> Range<usize> {
        match self {
            LayerStart::At(start) => start.min(layer_count)..layer_count,
            LayerStart::SurfaceOnly => 0..0,
        }
    }
}

/// Geometry handed to a law factory for one layer pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairGeometry {
    /// Flow cross section (m²) for area-based laws, flow width (m) for
    /// width-based laws.
    pub extent: Real,
    /// Distance between the layer centres (m).
    pub distance: Real,
}

fn layers_of(network: &FluxNetwork, cell: CellId) -> LawResult<Vec<NodeId>> {
    let c = network.cell(cell).ok_or(GraphError::UnknownCell(cell))?;
    Ok(c.layers().to_vec())
}

fn centre_distance(network: &FluxNetwork, a: NodeId, b: NodeId) -> Real {
    match (network.layer_view(a), network.layer_view(b)) {
        (Some(va), Some(vb)) => va.centre().distance_3d(&vb.centre()),
        _ => 0.0,
    }
}

/// A validated connection waiting to be added to the network.
struct PlannedEdge {
    left: NodeId,
    right: NodeId,
    law: Box<dyn FlowLaw>,
}

fn plan_edge(
    network: &FluxNetwork,
    left: NodeId,
    right: NodeId,
    law: Box<dyn FlowLaw>,
) -> LawResult<PlannedEdge> {
    let l = network.node(left).ok_or(GraphError::UnknownNode(left))?;
    let r = network.node(right).ok_or(GraphError::UnknownNode(right))?;
    law.validate(l, r)?;
    Ok(PlannedEdge { left, right, law })
}

/// Add every planned edge. Laws and endpoints are checked while planning,
/// so a failing pair leaves the network untouched.
fn commit(network: &mut FluxNetwork, planned: Vec<PlannedEdge>) -> LawResult<Vec<ConnId>> {
    let mut created = Vec::with_capacity(planned.len());
    for edge in planned {
        created.push(network.connect_boxed(edge.left, edge.right, edge.law)?);
    }
    Ok(created)
}

fn skip_same_law(network: &FluxNetwork, a: NodeId, b: NodeId, law: &'static str) -> bool {
    let skip = network
        .connection_between(a, b)
        .is_some_and(|c| c.name() == law);
    if skip {
        trace!(law, left = %a, right = %b, "pair already connected, skipped");
    }
    skip
}

/// Connect every layer pair of two cells with a positive cross section.
///
/// The factory receives the cross section and the centre distance.
pub fn connect_layers_by_area<F>(
    network: &mut FluxNetwork,
    cell1: CellId,
    cell2: CellId,
    start: LayerStart,
    law: &'static str,
    make: F,
) -> LawResult<Vec<ConnId>>
where
    F: Fn(PairGeometry) -> LawResult<Box<dyn FlowLaw>>,
{
    let layers1 = layers_of(network, cell1)?;
    let layers2 = layers_of(network, cell2)?;
    let mut planned = Vec::new();
    for i in start.range(layers1.len()) {
        for j in start.range(layers2.len()) {
            let (a, b) = (layers1[i], layers2[j]);
            let area = network.flow_cross_section(a, b);
            if area <= 0.0 || skip_same_law(network, a, b, law) {
                continue;
            }
            let distance = centre_distance(network, a, b);
            let boxed = make(PairGeometry {
                extent: area,
                distance,
            })?;
            planned.push(plan_edge(network, a, b, boxed)?);
        }
    }
    let created = commit(network, planned)?;
    debug!(law, %cell1, %cell2, created = created.len(), "lateral connector run");
    Ok(created)
}

/// Connect the layer pairs of two cells through their shared flow width.
///
/// Nothing is connected when the cells are not neighbours.
pub fn connect_layers_by_width<F>(
    network: &mut FluxNetwork,
    cell1: CellId,
    cell2: CellId,
    start: LayerStart,
    law: &'static str,
    make: F,
) -> LawResult<Vec<ConnId>>
where
    F: Fn(PairGeometry) -> LawResult<Box<dyn FlowLaw>>,
{
    let width = network
        .cell(cell1)
        .ok_or(GraphError::UnknownCell(cell1))?
        .topology()
        .flow_width(cell2);
    if width <= 0.0 {
        trace!(law, %cell1, %cell2, "cells are not neighbours");
        return Ok(Vec::new());
    }
    let layers1 = layers_of(network, cell1)?;
    let layers2 = layers_of(network, cell2)?;
    let mut planned = Vec::new();
    for i in start.range(layers1.len()) {
        for j in start.range(layers2.len()) {
            let (a, b) = (layers1[i], layers2[j]);
            if network.flow_cross_section(a, b) <= 0.0 || skip_same_law(network, a, b, law) {
                continue;
            }
            let distance = centre_distance(network, a, b);
            let boxed = make(PairGeometry {
                extent: width,
                distance,
            })?;
            planned.push(plan_edge(network, a, b, boxed)?);
        }
    }
    let created = commit(network, planned)?;
    debug!(law, %cell1, %cell2, created = created.len(), "lateral connector run");
    Ok(created)
}

/// Connect each layer of `cell` with the layer directly below it.
///
/// The factory receives the cell area and the distance
/// `|½Δupper + ½Δlower|` between the two layers.
pub fn connect_layer_stack<F>(
    network: &mut FluxNetwork,
    cell: CellId,
    no_override: bool,
    law: &'static str,
    make: F,
) -> LawResult<Vec<ConnId>>
where
    F: Fn(PairGeometry) -> LawResult<Box<dyn FlowLaw>>,
{
    let area = network.cell(cell).ok_or(GraphError::UnknownCell(cell))?.area;
    let layers = layers_of(network, cell)?;
    let mut planned = Vec::new();
    for pair in layers.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        if no_override && network.is_connected(upper, lower) {
            trace!(law, %upper, %lower, "layers already connected, skipped");
            continue;
        }
        let (Some(vu), Some(vl)) = (network.layer_view(upper), network.layer_view(lower)) else {
            continue;
        };
        let distance = (0.5 * (vu.upper_boundary() - vl.upper_boundary())
            + 0.5 * (vu.lower_boundary() - vl.lower_boundary()))
        .abs();
        let boxed = make(PairGeometry {
            extent: area,
            distance,
        })?;
        planned.push(plan_edge(network, upper, lower, boxed)?);
    }
    let created = commit(network, planned)?;
    debug!(law, %cell, created = created.len(), "vertical connector run");
    Ok(created)
}

/// Signature of a lateral (cell to cell) connector.
pub type LateralFn = fn(&mut FluxNetwork, CellId, CellId, LayerStart) -> LawResult<Vec<ConnId>>;

/// Signature of a vertical (within one cell) connector.
pub type VerticalFn = fn(&mut FluxNetwork, CellId, bool) -> LawResult<Vec<ConnId>>;

/// A named lateral connector.
#[derive(Clone, Copy)]
pub struct CellConnector {
    name: &'static str,
    connect: LateralFn,
}

impl CellConnector {
    pub const fn new(name: &'static str, connect: LateralFn) -> Self {
        Self { name, connect }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn connect(
        &self,
        network: &mut FluxNetwork,
        cell1: CellId,
        cell2: CellId,
        start: LayerStart,
    ) -> LawResult<Vec<ConnId>> {
        (self.connect)(network, cell1, cell2, start)
    }
}

impl fmt::Debug for CellConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CellConnector").field(&self.name).finish()
    }
}

/// A named vertical connector.
#[derive(Clone, Copy)]
pub struct VerticalConnector {
    name: &'static str,
    connect: VerticalFn,
}

impl VerticalConnector {
    pub const fn new(name: &'static str, connect: VerticalFn) -> Self {
        Self { name, connect }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn use_for_cell(
        &self,
        network: &mut FluxNetwork,
        cell: CellId,
        no_override: bool,
    ) -> LawResult<Vec<ConnId>> {
        (self.connect)(network, cell, no_override)
    }
}

impl fmt::Debug for VerticalConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VerticalConnector").field(&self.name).finish()
    }
}

/// Connectors keyed by law name.
#[derive(Clone, Debug, Default)]
pub struct ConnectorRegistry {
    lateral: BTreeMap<&'static str, CellConnector>,
    vertical: BTreeMap<&'static str, VerticalConnector>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the connectors of every built-in layer law.
    pub fn with_defaults() -> Self {
        use crate::darcy::{Darcy, TopographicGradientDarcy, UnsaturatedDarcy};
        use crate::percolation::SwatPercolation;
        use crate::richards::Richards;

        let mut registry = Self::new();
        registry.register_lateral(Richards::CELL_CONNECTOR);
        registry.register_lateral(UnsaturatedDarcy::CELL_CONNECTOR);
        registry.register_lateral(Darcy::CELL_CONNECTOR);
        registry.register_lateral(TopographicGradientDarcy::CELL_CONNECTOR);
        registry.register_vertical(Richards::VERTICAL_CONNECTOR);
        registry.register_vertical(UnsaturatedDarcy::VERTICAL_CONNECTOR);
        registry.register_vertical(SwatPercolation::VERTICAL_CONNECTOR);
        registry
    }

    /// Register a lateral connector, returning the one it replaces.
    pub fn register_lateral(&mut self, connector: CellConnector) -> Option<CellConnector> {
        self.lateral.insert(connector.name(), connector)
    }

    pub fn register_vertical(&mut self, connector: VerticalConnector) -> Option<VerticalConnector> {
        self.vertical.insert(connector.name(), connector)
    }

    pub fn lateral(&self, name: &str) -> Option<&CellConnector> {
        self.lateral.get(name)
    }

    pub fn vertical(&self, name: &str) -> Option<&VerticalConnector> {
        self.vertical.get(name)
    }

    pub fn lateral_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.lateral.keys().copied()
    }

    pub fn vertical_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.vertical.keys().copied()
    }

    /// Run the lateral connector `name` once for every neighbouring cell pair.
    pub fn connect_neighbors(
        &self,
        network: &mut FluxNetwork,
        name: &str,
        start: LayerStart,
    ) -> LawResult<Vec<ConnId>> {
        let connector = self
            .lateral(name)
            .ok_or_else(|| LawError::UnknownConnector { name: name.into() })?;
        let pairs: Vec<(CellId, CellId)> = network
            .cells()
            .iter()
            .flat_map(|c| {
                c.topology()
                    .neighbors()
                    .filter(move |&(other, width)| c.id < other && width > 0.0)
                    .map(move |(other, _)| (c.id, other))
            })
            .collect();
        let mut created = Vec::new();
        for (a, b) in pairs {
            created.extend(connector.connect(network, a, b, start)?);
        }
        Ok(created)
    }

    /// Run the vertical connector `name` for every cell.
    pub fn use_for_all_cells(
        &self,
        network: &mut FluxNetwork,
        name: &str,
        no_override: bool,
    ) -> LawResult<Vec<ConnId>> {
        let connector = self
            .vertical(name)
            .ok_or_else(|| LawError::UnknownConnector { name: name.into() })?;
        let cells: Vec<CellId> = network.cells().iter().map(|c| c.id).collect();
        let mut created = Vec::new();
        for cell in cells {
            created.extend(connector.use_for_cell(network, cell, no_override)?);
        }
        Ok(created)
    }
}
