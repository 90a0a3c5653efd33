//! Integration tests for cf-graph: construction, connection registry,
//! evaluation phases and caching.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cf_core::{CfResult, Point, Real};
use cf_graph::{
    BoundaryPotential, CrossSectionMode, Endpoints, EvalContext, FlowLaw, FluxNetwork, FluxNode,
    FluxTable, LayerKind, LinearRetention, NetworkOptions, StateIndex, WaterStorage,
};

/// Potential difference times a conductance.
#[derive(Debug)]
struct Conductance(Real);

impl FlowLaw for Conductance {
    fn name(&self) -> &'static str {
        "conductance"
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        let q = self.0 * (ctx.potential(ends.left) - ctx.potential(ends.right));
        ctx.clamp_empty(q, ends)
    }
}

/// Passes on the net inflow of its left node.
#[derive(Debug)]
struct PassOn;

impl FlowLaw for PassOn {
    fn name(&self) -> &'static str {
        "pass on"
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        ctx.water_balance(ends.left).max(0.0)
    }

    fn recalc_always(&self) -> bool {
        true
    }
}

/// Counts its evaluations.
#[derive(Debug, Default)]
struct Counting(Arc<AtomicUsize>);

impl FlowLaw for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn calc_q(&self, _ctx: &mut EvalContext<'_>, _ends: Endpoints) -> Real {
        self.0.fetch_add(1, Ordering::SeqCst);
        1.0
    }
}

/// Only accepts storages on the left.
#[derive(Debug)]
struct NeedsStorage;

impl FlowLaw for NeedsStorage {
    fn name(&self) -> &'static str {
        "needs storage"
    }

    fn calc_q(&self, _ctx: &mut EvalContext<'_>, _ends: Endpoints) -> Real {
        0.0
    }

    fn validate(&self, left: &FluxNode, _right: &FluxNode) -> CfResult<()> {
        if left.is_storage() {
            Ok(())
        } else {
            Err(cf_core::CfError::InvalidArg {
                what: "left must be a storage",
            })
        }
    }
}

fn storage(net: &mut FluxNetwork, name: &str, z: Real, volume: Real) -> cf_core::NodeId {
    net.add_storage(name, Point::new(0.0, 0.0, z), WaterStorage::new(volume))
        .unwrap()
}

#[test]
fn connect_registers_both_endpoints() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 1.0);
    let b = storage(&mut net, "b", 1.0, 1.0);
    let c = net.connect(a, b, Conductance(0.5)).unwrap();

    assert_eq!(net.node(a).unwrap().connections(), &[c]);
    assert_eq!(net.node(b).unwrap().connections(), &[c]);
    assert!(net.is_connected(b, a));
    assert_eq!(net.connection_between(b, a).unwrap().id, c);
    assert_eq!(net.list_active_connections(), vec![c]);
    assert_eq!(net.evaluate(c, 0.0), Some(0.5));
}

#[test]
fn reconnecting_a_pair_replaces_the_connection() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 1.0);
    let b = storage(&mut net, "b", 1.0, 1.0);
    let first = net.connect(a, b, Conductance(0.5)).unwrap();
    let second = net.connect(b, a, Conductance(2.0)).unwrap();

    assert_ne!(first, second);
    assert_eq!(net.connection_count(), 1);
    assert!(net.connection(first).is_none());
    assert_eq!(net.node(a).unwrap().connections(), &[second]);
    // b is left now: flux b -> a is negative
    assert_eq!(net.evaluate(second, 0.0), Some(-2.0));
}

#[test]
fn self_connection_and_bad_kinds_are_rejected() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 1.0);
    let out = net.add_boundary("out", Point::default(), BoundaryPotential::Constant(0.0));

    assert!(net.connect(a, a, Conductance(1.0)).is_err());
    assert!(net.connect(out, a, NeedsStorage).is_err());
    assert!(net.connect(a, out, NeedsStorage).is_ok());
    assert!(
        net.connect(a, cf_core::NodeId::from_index(99), Conductance(1.0))
            .is_err()
    );
}

#[test]
fn disconnect_removes_from_both_ends() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 1.0);
    let b = storage(&mut net, "b", 1.0, 1.0);
    let c = net.connect(a, b, Conductance(1.0)).unwrap();

    assert!(net.disconnect(c));
    assert!(!net.disconnect(c));
    assert!(net.node(a).unwrap().connections().is_empty());
    assert!(net.node(b).unwrap().connections().is_empty());
    assert_eq!(net.evaluate(c, 0.0), None);
    assert_eq!(net.connection_count(), 0);
}

#[test]
fn empty_source_is_not_drained() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 0.0);
    let b = storage(&mut net, "b", 1.0, 1.0);
    let c = net.connect(a, b, Conductance(1.0)).unwrap();
    assert_eq!(net.evaluate(c, 0.0), Some(0.0));

    net.set_volume(a, 0.1).unwrap();
    assert_eq!(net.evaluate(c, 0.0), Some(1.0));
}

#[test]
fn evaluation_reduction_and_update_phases() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 3.0, 10.0);
    let b = storage(&mut net, "b", 2.0, 10.0);
    let out = net.add_boundary("out", Point::default(), BoundaryPotential::Constant(0.0));
    let ab = net.connect(a, b, Conductance(1.0)).unwrap();
    let bo = net.connect(b, out, Conductance(0.5)).unwrap();

    let fluxes = net.evaluate_all(0.0);
    assert_eq!(fluxes, vec![(ab, 1.0), (bo, 1.0)]);

    let dxdt = net.node_derivatives(&fluxes);
    assert_eq!(dxdt[a.slot()], -1.0);
    assert_eq!(dxdt[b.slot()], 0.0);
    assert_eq!(dxdt[out.slot()], 1.0);

    // mass is conserved across all nodes
    let total: Real = dxdt.iter().sum();
    assert!(total.abs() < 1e-12);

    let idx = StateIndex::from_network(&net);
    assert_eq!(idx.gather_slots(&dxdt), vec![-1.0, 0.0]);

    let dt = 0.5;
    for &id in idx.node_ids() {
        let v = net.volume(id).unwrap() + dt * dxdt[id.slot()];
        net.set_volume(id, v).unwrap();
    }
    assert_eq!(net.volume(a), Some(9.5));
    assert!(net.set_volume(out, 1.0).is_err());
}

#[test]
fn water_balance_excludes_the_asking_connection() {
    let mut net = FluxNetwork::new();
    let src = net.add_boundary("src", Point::default(), BoundaryPotential::Constant(5.0));
    let pass = storage(&mut net, "pass", 0.0, 0.0);
    let out = net.add_boundary("out", Point::default(), BoundaryPotential::Constant(-1.0));
    net.connect(src, pass, Conductance(1.0)).unwrap();
    let po = net.connect(pass, out, PassOn).unwrap();

    // inflow is 5, forwarded unchanged
    assert_eq!(net.evaluate(po, 0.0), Some(5.0));
    assert_eq!(net.water_balance(pass, 0.0), 0.0);
}

#[test]
fn mutually_dependent_balance_laws_terminate() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 0.0, 0.0);
    let b = storage(&mut net, "b", 0.0, 0.0);
    let src = net.add_boundary("src", Point::default(), BoundaryPotential::Constant(2.0));
    net.connect(src, a, Conductance(1.0)).unwrap();
    let ab = net.connect(a, b, PassOn).unwrap();
    let c = storage(&mut net, "c", 0.0, 0.0);
    net.connect(b, c, PassOn).unwrap();

    assert_eq!(net.evaluate(ab, 0.0), Some(2.0));
    let fluxes = net.evaluate_all(0.0);
    assert_eq!(fluxes.len(), 3);
}

/// Counts its evaluations and passes on half of the right node's balance.
#[derive(Debug)]
struct CountingBalance(Arc<AtomicUsize>);

impl FlowLaw for CountingBalance {
    fn name(&self) -> &'static str {
        "counting balance"
    }

    fn calc_q(&self, ctx: &mut EvalContext<'_>, ends: Endpoints) -> Real {
        self.0.fetch_add(1, Ordering::SeqCst);
        0.5 * ctx.water_balance(ends.right) - 0.5 * ctx.water_balance(ends.left)
    }

    fn recalc_always(&self) -> bool {
        true
    }
}

#[test]
fn balance_laws_on_a_grid_evaluate_each_connection_once() {
    const N: usize = 10;
    let counter = Arc::new(AtomicUsize::new(0));
    let mut net = FluxNetwork::new();
    let ids: Vec<_> = (0..N * N)
        .map(|k| storage(&mut net, &format!("s{k}"), (k % 7) as Real, 1.0))
        .collect();
    for row in 0..N {
        for col in 0..N {
            let k = row * N + col;
            if col + 1 < N {
                net.connect(ids[k], ids[k + 1], CountingBalance(counter.clone()))
                    .unwrap();
            }
            if row + 1 < N {
                net.connect(ids[k], ids[k + N], CountingBalance(counter.clone()))
                    .unwrap();
            }
        }
    }
    let edges = net.connection_count();
    assert_eq!(edges, 2 * N * (N - 1));

    for id in net.list_active_connections() {
        counter.store(0, Ordering::SeqCst);
        net.evaluate(id, 0.0).unwrap();
        assert!(counter.load(Ordering::SeqCst) <= edges);
    }

    counter.store(0, Ordering::SeqCst);
    let fluxes = net.evaluate_all(0.0);
    assert_eq!(fluxes.len(), edges);
    assert!(counter.load(Ordering::SeqCst) <= edges * edges);
}

#[test]
fn connection_ids_are_never_reused() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 2.0, 1.0);
    let b = storage(&mut net, "b", 1.0, 1.0);
    let c = storage(&mut net, "c", 0.0, 1.0);
    let ab = net.connect(a, b, Conductance(1.0)).unwrap();
    let mut table = FluxTable::evaluate(&net, 0.0);

    assert!(net.disconnect(ab));
    let bc = net.connect(b, c, Conductance(3.0)).unwrap();
    assert_ne!(ab, bc);
    assert!(net.connection(ab).is_none());
    assert_eq!(net.evaluate(ab, 0.0), None);

    table.refresh(&net, 0.0, &[]);
    assert_eq!(table.get(ab), None);
    assert_eq!(table.get(bc), Some(3.0));
}

#[test]
fn forced_boundary_follows_time() {
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 0.0, 1.0);
    let bc = net.add_boundary(
        "tide",
        Point::default(),
        BoundaryPotential::Forced(Arc::new(|t| t)),
    );
    let c = net.connect(bc, a, Conductance(1.0)).unwrap();
    assert_eq!(net.evaluate(c, 0.0), Some(0.0));
    assert_eq!(net.evaluate(c, 2.0), Some(2.0));

    net.set_boundary_potential(bc, BoundaryPotential::Constant(-1.0))
        .unwrap();
    assert_eq!(net.evaluate(c, 2.0), Some(-1.0));
    assert!(
        net.set_boundary_potential(a, BoundaryPotential::Constant(0.0))
            .is_err()
    );
}

#[test]
fn flux_table_refreshes_only_stale_connections() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut net = FluxNetwork::new();
    let a = storage(&mut net, "a", 0.0, 1.0);
    let b = storage(&mut net, "b", 0.0, 1.0);
    let c = storage(&mut net, "c", 0.0, 1.0);
    let d = storage(&mut net, "d", 0.0, 1.0);
    net.connect(a, b, Counting(counter.clone())).unwrap();
    net.connect(c, d, Counting(counter.clone())).unwrap();
    net.connect(b, c, PassOn).unwrap();

    let mut table = FluxTable::evaluate(&net, 0.0);
    assert_eq!(table.pairs().len(), 3);
    let after_full = counter.load(Ordering::SeqCst);

    // only a->b touches a; the pass-on law always recalculates
    let n = table.refresh(&net, 0.0, &[a]);
    assert_eq!(n, 2);
    assert!(counter.load(Ordering::SeqCst) > after_full);

    let dxdt = table.node_derivatives(&net);
    assert_eq!(dxdt.len(), 4);
}

#[test]
fn layers_stack_and_cross_sections() {
    let soil = Arc::new(LinearRetention::new(1.0, 0.5).unwrap());
    let mut net = FluxNetwork::new();
    let c1 = net.add_cell(Point::new(0.0, 0.0, 10.0), 100.0).unwrap();
    let c2 = net.add_cell(Point::new(10.0, 0.0, 9.0), 100.0).unwrap();
    let l10 = net.add_layer(c1, 0.5, soil.clone(), 0.5).unwrap();
    let l11 = net.add_layer(c1, 1.0, soil.clone(), 0.5).unwrap();
    let l12 = net.add_layer(c1, 2.0, soil.clone(), 0.5).unwrap();
    let l20 = net.add_layer(c2, 1.0, soil.clone(), 0.5).unwrap();

    assert!(net.add_layer(c1, 1.5, soil.clone(), 0.5).is_err());
    assert_eq!(net.cell(c1).unwrap().layer_count(), 3);

    let view = net.layer_view(l11).unwrap();
    assert_eq!(view.upper_boundary(), 0.5);
    assert_eq!(view.thickness(), 0.5);
    assert!((view.capacity() - 25.0).abs() < 1e-12);
    assert!((view.wetness() - 0.5).abs() < 1e-12);

    // vertical neighbours share the cell area
    assert_eq!(net.flow_cross_section(l10, l11), 100.0);
    assert_eq!(net.flow_cross_section(l10, l12), 0.0);

    // not yet neighbours
    assert_eq!(net.flow_cross_section(l10, l20), 0.0);
    net.set_neighbors(c1, c2, 10.0).unwrap();
    assert!(net.set_neighbors(c1, c1, 10.0).is_err());
    assert!((net.flow_cross_section(l10, l20) - 5.0).abs() < 1e-12);
    assert!((net.flow_cross_section(l11, l20) - 5.0).abs() < 1e-12);
    assert_eq!(net.flow_cross_section(l12, l20), 0.0);
}

#[test]
fn horizontal_cross_section_uses_elevations() {
    let soil = Arc::new(LinearRetention::new(1.0, 0.5).unwrap());
    let mut net = FluxNetwork::with_options(NetworkOptions {
        cross_section: CrossSectionMode::Horizontal,
        ..NetworkOptions::default()
    });
    let c1 = net.add_cell(Point::new(0.0, 0.0, 10.0), 100.0).unwrap();
    let c2 = net.add_cell(Point::new(10.0, 0.0, 9.5), 100.0).unwrap();
    let a = net.add_layer(c1, 1.0, soil.clone(), 0.5).unwrap();
    let b = net.add_layer(c2, 1.0, soil.clone(), 0.5).unwrap();
    net.set_neighbors(c1, c2, 2.0).unwrap();

    // [9, 10] overlaps [8.5, 9.5] over 0.5 m
    assert!((net.flow_cross_section(a, b) - 1.0).abs() < 1e-12);
}

#[test]
fn variable_saturated_layer_tracks_volume() {
    let soil = Arc::new(LinearRetention::new(1.0, 0.5).unwrap());
    let mut net = FluxNetwork::new();
    let cell = net.add_cell(Point::new(0.0, 0.0, 10.0), 100.0).unwrap();
    net.add_layer(cell, 1.0, soil.clone(), 0.5).unwrap();
    let sat = net
        .add_layer_of_kind(cell, 3.0, soil.clone(), 0.5, LayerKind::VariableSaturated)
        .unwrap();

    // half of 2 m pore volume: thickness 1 m, upper boundary at 2 m
    let view = net.layer_view(sat).unwrap();
    assert!((view.max_thickness() - 2.0).abs() < 1e-12);
    assert!((view.thickness() - 1.0).abs() < 1e-12);
    assert!((view.upper_boundary() - 2.0).abs() < 1e-12);
    assert!((view.wetness() - 1.0).abs() < 1e-12);
    assert!((view.potential() - 8.0).abs() < 1e-12);
    assert!((view.saturated_depth() - 2.0).abs() < 1e-12);
}

#[test]
fn cell_saturated_depth_uses_deepest_unsaturated_layer() {
    let soil = Arc::new(
        LinearRetention::new(1.0, 0.5)
            .unwrap()
            .with_suction_range(2.0)
            .unwrap(),
    );
    let mut net = FluxNetwork::new();
    let cell = net.add_cell(Point::new(0.0, 0.0, 10.0), 100.0).unwrap();
    net.add_layer(cell, 1.0, soil.clone(), 0.5).unwrap();
    let deep = net.add_layer(cell, 2.0, soil.clone(), 0.75).unwrap();

    let expected = net.layer_view(deep).unwrap().saturated_depth();
    assert!((net.cell_saturated_depth(cell) - expected).abs() < 1e-12);

    let empty_cell = net.add_cell(Point::default(), 1.0).unwrap();
    assert_eq!(net.cell_saturated_depth(empty_cell), 0.0);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn cross_section_is_symmetric(
            z1 in 0.0_f64..20.0,
            z2 in 0.0_f64..20.0,
            d1 in 0.1_f64..3.0,
            d2 in 0.1_f64..3.0,
            width in 0.1_f64..50.0,
            horizontal in any::<bool>(),
        ) {
            let cross_section = if horizontal {
                CrossSectionMode::Horizontal
            } else {
                CrossSectionMode::TerrainFollowing
            };
            let mut net = FluxNetwork::with_options(NetworkOptions {
                cross_section,
                ..NetworkOptions::default()
            });
            let soil = Arc::new(LinearRetention::new(1.0, 0.4).unwrap());
            let c1 = net.add_cell(Point::new(0.0, 0.0, z1), 10.0).unwrap();
            let c2 = net.add_cell(Point::new(5.0, 0.0, z2), 10.0).unwrap();
            let a = net.add_layer(c1, d1, soil.clone(), 0.5).unwrap();
            let b = net.add_layer(c2, d2, soil, 0.5).unwrap();
            net.set_neighbors(c1, c2, width).unwrap();

            let ab = net.flow_cross_section(a, b);
            prop_assert_eq!(ab, net.flow_cross_section(b, a));
            prop_assert!(ab >= 0.0);
            prop_assert!(ab <= width * d1.min(d2) + 1e-12);
        }

        #[test]
        fn reduction_conserves_water(
            volumes in proptest::collection::vec(0.0_f64..10.0, 2..6),
            conductance in 0.01_f64..5.0,
        ) {
            let mut net = FluxNetwork::new();
            let ids: Vec<_> = volumes
                .iter()
                .enumerate()
                .map(|(i, &v)| storage(&mut net, &format!("s{i}"), i as Real, v))
                .collect();
            for pair in ids.windows(2) {
                net.connect(pair[0], pair[1], Conductance(conductance)).unwrap();
            }
            let fluxes = net.evaluate_all(0.0);
            let total: Real = net.node_derivatives(&fluxes).iter().sum();
            prop_assert!(total.abs() < 1e-9);
        }
    }
}
