//! Shared fixtures for the cf-laws integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use cf_core::{CellId, NodeId, Point, Real};
use cf_graph::{FluxNetwork, LayerKind, RetentionCurve, WaterStorage};

/// Retention curve with a constant matric potential.
///
/// Conductivity is `k` below saturation and `ksat` at or above it.
#[derive(Debug, Clone)]
pub struct FixedCurve {
    pub k: Real,
    pub ksat: Real,
    pub matric: Real,
    pub porosity: Real,
    pub field_capacity: Real,
    /// Replaces the integrated transmissivity when set (m²/day).
    pub transmissivity: Option<Real>,
}

impl FixedCurve {
    pub fn new(k: Real, ksat: Real, matric: Real) -> Self {
        Self {
            k,
            ksat,
            matric,
            porosity: 0.5,
            field_capacity: 0.4,
            transmissivity: None,
        }
    }

    pub fn with_transmissivity(mut self, transmissivity: Real) -> Self {
        self.transmissivity = Some(transmissivity);
        self
    }

    pub fn shared(self) -> Arc<dyn RetentionCurve> {
        Arc::new(self)
    }
}

impl RetentionCurve for FixedCurve {
    fn k(&self, wetness: Real, _depth: Real) -> Real {
        if wetness >= 1.0 { self.ksat } else { self.k }
    }

    fn porosity(&self, _depth: Real) -> Real {
        self.porosity
    }

    fn matric_potential(&self, _wetness: Real) -> Real {
        self.matric
    }

    fn wetness_at_head(&self, _head: Real) -> Real {
        self.field_capacity
    }

    fn transmissivity(&self, upper: Real, lower: Real, wetness: Real) -> Real {
        match self.transmissivity {
            Some(t) => t,
            None if lower <= upper => 0.0,
            None => self.k(wetness, 0.5 * (upper + lower)) * (lower - upper),
        }
    }
}

pub fn storage(net: &mut FluxNetwork, name: &str, z: Real, volume: Real) -> NodeId {
    net.add_storage(name, Point::new(0.0, 0.0, z), WaterStorage::new(volume))
        .unwrap()
}

/// A cell with fixed layers reaching down to each of `lower_boundaries`.
pub fn cell_with_layers(
    net: &mut FluxNetwork,
    position: Point,
    area: Real,
    lower_boundaries: &[Real],
    curve: &FixedCurve,
    wetness: Real,
) -> (CellId, Vec<NodeId>) {
    let cell = net.add_cell(position, area).unwrap();
    let layers = lower_boundaries
        .iter()
        .map(|&lb| {
            net.add_layer_of_kind(cell, lb, curve.clone().shared(), wetness, LayerKind::Fixed)
                .unwrap()
        })
        .collect();
    (cell, layers)
}

pub fn assert_close(actual: Real, expected: Real) {
    let tol = 1e-9 * expected.abs().max(1e-9);
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual}"
    );
}
