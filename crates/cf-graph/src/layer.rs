//! Read-only physics view of a soil layer within its cell.

use cf_core::{Point, Real};

use crate::cell::Cell;
use crate::node::{LayerKind, SoilLayer};

/// A layer together with the cell it belongs to.
///
/// Every derived quantity is a pure function of the layer state and the
/// cell geometry.
#[derive(Clone, Copy, Debug)]
pub struct LayerView<'a> {
    pub layer: &'a SoilLayer,
    pub cell: &'a Cell,
}

impl<'a> LayerView<'a> {
    pub fn new(layer: &'a SoilLayer, cell: &'a Cell) -> Self {
        Self { layer, cell }
    }

    pub fn volume(&self) -> Real {
        self.layer.volume
    }

    /// Nominal thickness between the constructed boundaries (m).
    pub fn max_thickness(&self) -> Real {
        self.layer.lower_boundary - self.layer.upper_boundary
    }

    fn nominal_porosity(&self) -> Real {
        let mid = 0.5 * (self.layer.upper_boundary + self.layer.lower_boundary);
        self.layer.soil.porosity(mid)
    }

    /// Current thickness (m). Variable saturated layers grow with their volume.
    pub fn thickness(&self) -> Real {
        match self.layer.kind {
            LayerKind::Fixed => self.max_thickness(),
            LayerKind::VariableSaturated => {
                let pore_area = self.nominal_porosity() * self.cell.area;
                (self.layer.volume / pore_area).clamp(0.0, self.max_thickness())
            }
        }
    }

    /// Current upper boundary (m below surface).
    pub fn upper_boundary(&self) -> Real {
        match self.layer.kind {
            LayerKind::Fixed => self.layer.upper_boundary,
            LayerKind::VariableSaturated => self.layer.lower_boundary - self.thickness(),
        }
    }

    pub fn lower_boundary(&self) -> Real {
        self.layer.lower_boundary
    }

    pub fn mid_depth(&self) -> Real {
        0.5 * (self.upper_boundary() + self.lower_boundary())
    }

    /// Pore volume of the current thickness (m³).
    pub fn capacity(&self) -> Real {
        self.layer.soil.porosity(self.mid_depth()) * self.cell.area * self.thickness()
    }

    pub fn wetness(&self) -> Real {
        let cap = self.capacity();
        if cap > 0.0 {
            self.layer.volume / cap
        } else {
            0.0
        }
    }

    /// Unsaturated conductivity (m/day).
    pub fn k(&self) -> Real {
        self.layer.soil.k(self.wetness(), self.mid_depth())
    }

    /// Saturated conductivity (m/day).
    pub fn ksat(&self) -> Real {
        self.layer.soil.ksat(self.mid_depth())
    }

    pub fn matric_potential(&self) -> Real {
        self.layer.soil.matric_potential(self.wetness())
    }

    /// Elevation of the reference point of the layer (m).
    pub fn gravitational_potential(&self) -> Real {
        match self.layer.kind {
            LayerKind::Fixed => self.cell.position.z - self.mid_depth(),
            LayerKind::VariableSaturated => self.cell.position.z - self.upper_boundary(),
        }
    }

    /// Total hydraulic head (m).
    pub fn potential(&self) -> Real {
        self.gravitational_potential() + self.matric_potential()
    }

    /// Depth below the surface where the pressure head is zero (m).
    pub fn saturated_depth(&self) -> Real {
        self.cell.position.z - self.potential()
    }

    pub fn transmissivity(&self, upper: Real, lower: Real) -> Real {
        self.layer.soil.transmissivity(upper, lower, self.wetness())
    }

    pub fn is_saturated(&self) -> bool {
        self.wetness() >= 1.0
    }

    /// Centre of the layer in model space.
    pub fn centre(&self) -> Point {
        self.cell.position.below(self.mid_depth())
    }
}
