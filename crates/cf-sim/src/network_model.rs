//! Transient model driving a flux network.
//!
//! Each rhs call runs the three phases of a network step:
//! 1) update: write the integrator state into the storages
//! 2) evaluate: compute every connection flux (parallel, read only)
//! 3) reduce: sum fluxes into per-storage derivatives

use cf_core::{ConnId, NodeId, Real};
use cf_graph::{FluxNetwork, FluxTable, StateIndex};
use tracing::{trace, warn};

use crate::error::{SimError, SimResult};
use crate::model::TransientModel;

/// A `FluxNetwork` whose storage volumes form the integrator state.
///
/// The state vector follows `StateIndex` order (storage-like nodes in id
/// order). Negative volumes proposed by the integrator are clamped to zero.
#[derive(Debug)]
pub struct NetworkModel {
    network: FluxNetwork,
    index: StateIndex,
    cache: Option<FluxTable>,
    use_cache: bool,
}

impl NetworkModel {
    pub fn new(network: FluxNetwork) -> Self {
        let index = StateIndex::from_network(&network);
        Self {
            network,
            index,
            cache: None,
            use_cache: false,
        }
    }

    /// Re-evaluate only connections whose endpoints changed since the last
    /// call, plus those whose laws ask to be recalculated always.
    pub fn with_flux_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    pub fn network(&self) -> &FluxNetwork {
        &self.network
    }

    /// Mutable access for edits. Drops the flux cache; call `reindex` after
    /// adding storages.
    pub fn network_mut(&mut self) -> &mut FluxNetwork {
        self.cache = None;
        &mut self.network
    }

    /// Rebuild the state index after nodes were added.
    pub fn reindex(&mut self) {
        self.index = StateIndex::from_network(&self.network);
        self.cache = None;
    }

    pub fn index(&self) -> &StateIndex {
        &self.index
    }

    pub fn into_network(self) -> FluxNetwork {
        self.network
    }

    /// Write `x` into the storages, returning the nodes whose volume changed.
    pub fn apply_state(&mut self, x: &[Real]) -> SimResult<Vec<NodeId>> {
        if x.len() != self.index.len() {
            return Err(SimError::StateMismatch {
                expected: self.index.len(),
                got: x.len(),
            });
        }
        let mut changed = Vec::new();
        for (i, &value) in x.iter().enumerate() {
            if !value.is_finite() {
                return Err(SimError::NonPhysical {
                    what: "storage volume is not finite",
                });
            }
            let id = self.index.node_id(i);
            let volume = if value < 0.0 {
                warn!(node = %id, volume = value, "negative volume clamped to zero");
                0.0
            } else {
                value
            };
            if self.network.volume(id) != Some(volume) {
                self.network.set_volume(id, volume)?;
                changed.push(id);
            }
        }
        Ok(changed)
    }

    /// Fluxes of every live connection at `t` for the current network state.
    pub fn fluxes(&mut self, t: Real, changed: &[NodeId]) -> Vec<(ConnId, Real)> {
        if !self.use_cache {
            return self.network.evaluate_all(t);
        }
        match &mut self.cache {
            Some(table) => {
                let n = table.refresh(&self.network, t, changed);
                trace!(refreshed = n, "flux table refreshed");
                table.pairs()
            }
            None => {
                let table = FluxTable::evaluate(&self.network, t);
                let pairs = table.pairs();
                self.cache = Some(table);
                pairs
            }
        }
    }
}

impl TransientModel for NetworkModel {
    type State = Vec<Real>;

    fn initial_state(&self) -> Vec<Real> {
        self.index.gather_volumes(&self.network)
    }

    fn rhs(&mut self, t: f64, x: &Vec<Real>) -> SimResult<Vec<Real>> {
        let changed = self.apply_state(x)?;
        let fluxes = self.fluxes(t, &changed);
        let per_slot = self.network.node_derivatives(&fluxes);
        Ok(self.index.gather_slots(&per_slot))
    }

    fn add(&self, a: &Vec<Real>, b: &Vec<Real>) -> Vec<Real> {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }

    fn scale(&self, a: &Vec<Real>, scale: f64) -> Vec<Real> {
        a.iter().map(|x| x * scale).collect()
    }
}
