//! Minimal 3-D geometry for node positions.

use crate::Real;

/// A location in model space (metres; `z` is elevation).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: Real,
    pub y: Real,
    pub z: Real,
}

impl Point {
    pub const fn new(x: Real, y: Real, z: Real) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in three dimensions.
    pub fn distance_3d(&self, other: &Point) -> Real {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal distance, ignoring elevation.
    pub fn distance_xy(&self, other: &Point) -> Real {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Same horizontal location shifted down by `depth`.
    pub fn below(&self, depth: Real) -> Point {
        Point::new(self.x, self.y, self.z - depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 12.0);
        assert_eq!(a.distance_xy(&b), 5.0);
        assert_eq!(a.distance_3d(&b), 13.0);
        assert_eq!(b.below(2.0).z, 10.0);
    }
}
