//! The flow-law contract and its evaluation context.

use std::collections::HashMap;
use std::fmt;

use cf_core::{CellId, CfResult, ConnId, NodeId, Real};

use crate::cell::Cell;
use crate::layer::LayerView;
use crate::network::FluxNetwork;
use crate::node::FluxNode;

/// The two endpoints of the connection being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub conn: ConnId,
    pub left: NodeId,
    pub right: NodeId,
}

/// A physical law computing the flux between two nodes.
///
/// Laws are deterministic functions of the endpoint state and time, suitable
/// for parallel evaluation. Positive flux means left → right (m³/day).
pub trait FlowLaw: Send + Sync + fmt::Debug {
    /// Law name, also used to recognise connections of the same type.
    fn name(&self) -> &'static str;

    /// Compute the flux for the current state of the endpoints.
    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real;

    /// Check endpoint kinds before the law is bound into the network.
    fn validate(&self, _left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        Ok(())
    }

    /// Laws reading water balances depend on more than their endpoints and
    /// must not be served from a flux cache.
    fn recalc_always(&self) -> bool {
        false
    }

    /// Whether the flux is set by code outside the network.
    fn is_externally_forced(&self) -> bool {
        false
    }

    /// Mutable access to an externally forced flux, if this law has one.
    fn forced_flux_mut(&mut self) -> Option<&mut Real> {
        None
    }
}

/// Zero a flux that would drain an empty node.
///
/// `q > 0` leaves the left node, `q < 0` leaves the right node.
#[inline]
pub fn prevent_negative_volume(q: Real, left_empty: bool, right_empty: bool) -> Real {
    if (left_empty && q > 0.0) || (right_empty && q < 0.0) {
        0.0
    } else {
        q
    }
}

/// Read access to the network during one flux evaluation.
///
/// The context keeps the stack of connections currently being evaluated so
/// that water-balance queries skip them, and memoises every flux it has
/// computed. Each connection is evaluated at most once per context, so a
/// pass costs at most one `calc_q` per connection.
pub struct EvalContext<'a> {
    network: &'a FluxNetwork,
    t: Real,
    stack: Vec<ConnId>,
    memo: HashMap<ConnId, Real>,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(network: &'a FluxNetwork, t: Real) -> Self {
        Self {
            network,
            t,
            stack: Vec::new(),
            memo: HashMap::new(),
        }
    }

    /// Model time (days).
    pub fn t(&self) -> Real {
        self.t
    }

    pub fn network(&self) -> &'a FluxNetwork {
        self.network
    }

    /// Node by id. Ids bound to a live connection always resolve.
    pub fn node(&self, id: NodeId) -> &'a FluxNode {
        &self.network.nodes()[id.slot()]
    }

    pub fn cell(&self, id: CellId) -> &'a Cell {
        &self.network.cells()[id.slot()]
    }

    pub fn layer(&self, id: NodeId) -> Option<LayerView<'a>> {
        self.network.layer_view(id)
    }

    pub fn potential(&self, id: NodeId) -> Real {
        self.network.potential(id, self.t)
    }

    pub fn is_empty(&self, id: NodeId) -> bool {
        self.network.is_empty(id)
    }

    pub fn cell_saturated_depth(&self, cell: CellId) -> Real {
        self.network.cell_saturated_depth(cell)
    }

    /// Clamp `q` against the emptiness of both endpoints.
    pub fn clamp_empty(&self, q: Real, ends: Endpoints) -> Real {
        prevent_negative_volume(q, self.is_empty(ends.left), self.is_empty(ends.right))
    }

    /// Net inflow into `node` over every incident connection that is not
    /// already being evaluated.
    ///
    /// Fluxes already computed in this context are reused, even when they
    /// were computed deeper in the recursion with other connections skipped.
    pub fn water_balance(&mut self, node: NodeId) -> Real {
        let net = self.network;
        let mut balance = 0.0;
        for &conn in net.nodes()[node.slot()].connections() {
            if self.stack.contains(&conn) {
                continue;
            }
            let Some(c) = net.connection(conn) else {
                continue;
            };
            let q = self.eval(conn);
            if c.left == node {
                balance -= q;
            } else {
                balance += q;
            }
        }
        balance
    }

    pub(crate) fn eval(&mut self, conn: ConnId) -> Real {
        if let Some(&q) = self.memo.get(&conn) {
            return q;
        }
        let net = self.network;
        let Some(c) = net.connection(conn) else {
            return 0.0;
        };
        self.stack.push(conn);
        let q = c.law().calc_q(
            self,
            Endpoints {
                conn,
                left: c.left,
                right: c.right,
            },
        );
        self.stack.pop();
        self.memo.insert(conn, q);
        q
    }
}
