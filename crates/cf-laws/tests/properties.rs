//! Sign and clamping invariants of the flow laws.

mod common;

use cf_core::{Point, m, m2};
use cf_graph::{BoundaryPotential, FluxNetwork};
use cf_laws::{LinearGradient, Richards};
use proptest::prelude::*;

use common::{FixedCurve, storage};

proptest! {
    #[test]
    fn richards_follows_the_potential_gradient(
        matric_upper in -5.0_f64..0.0,
        matric_lower in -5.0_f64..0.0,
        wetness in 0.05_f64..0.95,
    ) {
        let mut net = FluxNetwork::new();
        let cell = net.add_cell(Point::new(0.0, 0.0, 0.0), 50.0).unwrap();
        let upper = FixedCurve::new(1e-4, 1e-2, matric_upper).shared();
        let lower = FixedCurve::new(1e-4, 1e-2, matric_lower).shared();
        let l0 = net.add_layer(cell, 0.5, upper, wetness).unwrap();
        let l1 = net.add_layer(cell, 1.0, lower, wetness).unwrap();
        let c = net.connect(l0, l1, Richards::new(m2(50.0), m(0.5)).unwrap()).unwrap();

        let q = net.evaluate(c, 0.0).unwrap();
        let dpsi = net.potential(l0, 0.0) - net.potential(l1, 0.0);
        prop_assert!(q * dpsi >= 0.0);
        prop_assert_eq!(q == 0.0, dpsi == 0.0);
    }

    #[test]
    fn empty_endpoints_are_never_drained(
        z_left in -10.0_f64..10.0,
        z_right in -10.0_f64..10.0,
        left_empty in any::<bool>(),
        right_empty in any::<bool>(),
    ) {
        let mut net = FluxNetwork::new();
        let a = storage(&mut net, "a", z_left, if left_empty { 0.0 } else { 1.0 });
        let b = storage(&mut net, "b", z_right, if right_empty { 0.0 } else { 1.0 });
        let c = net
            .connect(a, b, LinearGradient::new(1.0, 1.0, m(1.0)).unwrap())
            .unwrap();
        let q = net.evaluate(c, 0.0).unwrap();
        if left_empty {
            prop_assert!(q <= 0.0);
        }
        if right_empty {
            prop_assert!(q >= 0.0);
        }
    }

    #[test]
    fn boundaries_are_never_empty(potential in -10.0_f64..10.0) {
        let mut net = FluxNetwork::new();
        let a = net.add_boundary("a", Point::default(), BoundaryPotential::Constant(potential));
        let b = storage(&mut net, "b", 0.0, 0.0);
        let c = net
            .connect(a, b, LinearGradient::new(2.0, 1.0, m(1.0)).unwrap())
            .unwrap();
        let q = net.evaluate(c, 0.0).unwrap();
        prop_assert!(q >= 0.0);
        if potential > 0.0 {
            prop_assert!(q > 0.0);
        }
    }
}
