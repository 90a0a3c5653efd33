//! Stable indexing for integrator state vectors.
//!
//! Provides bidirectional mappings between storage node ids and contiguous
//! state indices (0..N).

use cf_core::{CfResult, NodeId};

use crate::error::GraphError;
use crate::network::FluxNetwork;

/// Index map from storage nodes to positions in a state vector.
///
/// Boundary nodes carry no state and are not indexed.
#[derive(Debug, Clone)]
pub struct StateIndex {
    /// Contiguous list of storage node IDs (index -> NodeId).
    node_ids: Vec<NodeId>,

    /// Reverse lookup: NodeId slot -> index, None for non-storages.
    node_to_idx: Vec<Option<usize>>,
}

impl StateIndex {
    /// Build an index over every storage-like node of `network`.
    pub fn from_network(network: &FluxNetwork) -> Self {
        let node_ids = network.storage_nodes();
        let mut node_to_idx = vec![None; network.nodes().len()];
        for (i, &id) in node_ids.iter().enumerate() {
            node_to_idx[id.slot()] = Some(i);
        }
        Self {
            node_ids,
            node_to_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// State index of a storage node.
    pub fn index_of(&self, id: NodeId) -> CfResult<usize> {
        self.node_to_idx
            .get(id.slot())
            .copied()
            .flatten()
            .ok_or_else(|| GraphError::UnknownNode(id).into())
    }

    /// Node at a state index (panics if out of bounds).
    pub fn node_id(&self, i: usize) -> NodeId {
        self.node_ids[i]
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Current volumes of all indexed storages, in index order.
    pub fn gather_volumes(&self, network: &FluxNetwork) -> Vec<f64> {
        self.node_ids
            .iter()
            .map(|&id| network.volume(id).unwrap_or(0.0))
            .collect()
    }

    /// Pick the indexed entries out of a per-node-slot vector.
    pub fn gather_slots(&self, per_slot: &[f64]) -> Vec<f64> {
        self.node_ids
            .iter()
            .map(|id| per_slot.get(id.slot()).copied().unwrap_or(0.0))
            .collect()
    }
}
