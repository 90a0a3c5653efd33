//! Cached connection fluxes with selective re-evaluation.

use std::collections::HashSet;

use cf_core::{ConnId, NodeId, Real};

use crate::network::FluxNetwork;

/// Last evaluated flux of every connection.
///
/// After a state update only connections touching changed nodes, laws that
/// ask to be recalculated always and connections touching time-dependent
/// boundaries (when `t` moves) need fresh values.
#[derive(Clone, Debug, Default)]
pub struct FluxTable {
    t: Real,
    fluxes: Vec<Option<Real>>,
}

impl FluxTable {
    /// Evaluate every connection of `network` at `t`.
    pub fn evaluate(network: &FluxNetwork, t: Real) -> Self {
        let mut table = Self {
            t,
            fluxes: Vec::new(),
        };
        for (id, q) in network.evaluate_all(t) {
            table.store(id, q);
        }
        table
    }

    fn store(&mut self, id: ConnId, q: Real) {
        if self.fluxes.len() <= id.slot() {
            self.fluxes.resize(id.slot() + 1, None);
        }
        self.fluxes[id.slot()] = Some(q);
    }

    pub fn t(&self) -> Real {
        self.t
    }

    pub fn get(&self, id: ConnId) -> Option<Real> {
        self.fluxes.get(id.slot()).copied().flatten()
    }

    /// `(connection, flux)` pairs in id order.
    pub fn pairs(&self) -> Vec<(ConnId, Real)> {
        self.fluxes
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.map(|q| (ConnId::from_usize(i), q)))
            .collect()
    }

    /// Re-evaluate what `changed` nodes and the new time invalidate.
    ///
    /// Returns the number of connections evaluated.
    pub fn refresh(&mut self, network: &FluxNetwork, t: Real, changed: &[NodeId]) -> usize {
        let changed: HashSet<NodeId> = changed.iter().copied().collect();
        let time_moved = t != self.t;
        self.t = t;

        // Drop removed connections.
        for (i, slot) in self.fluxes.iter_mut().enumerate() {
            if slot.is_some() && network.connection(ConnId::from_usize(i)).is_none() {
                *slot = None;
            }
        }

        let mut evaluated = 0;
        for id in network.list_active_connections() {
            let Some(conn) = network.connection(id) else {
                continue;
            };
            let stale = self.get(id).is_none()
                || conn.law().recalc_always()
                || changed.contains(&conn.left)
                || changed.contains(&conn.right)
                || (time_moved
                    && [conn.left, conn.right].iter().any(|&n| {
                        network.node(n).is_some_and(|node| node.is_time_dependent())
                    }));
            if stale {
                if let Some(q) = network.evaluate(id, t) {
                    self.store(id, q);
                    evaluated += 1;
                }
            }
        }
        evaluated
    }

    /// Per-node net inflow, indexed by node slot.
    pub fn node_derivatives(&self, network: &FluxNetwork) -> Vec<Real> {
        network.node_derivatives(&self.pairs())
    }
}
