// cf-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, Length as UomLength, Ratio as UomRatio, Time as UomTime, Volume as UomVolume,
};

use crate::Real;

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Length = UomLength;
pub type Ratio = UomRatio;
pub type Time = UomTime;
pub type Volume = UomVolume;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

/// Model time in days (the integrator's time axis).
#[inline]
pub fn as_days(t: Time) -> Real {
    use uom::si::time::day;
    t.get::<day>()
}

#[inline]
pub fn as_m(l: Length) -> Real {
    use uom::si::length::meter;
    l.get::<meter>()
}

#[inline]
pub fn as_m2(a: Area) -> Real {
    use uom::si::area::square_meter;
    a.get::<square_meter>()
}

#[inline]
pub fn as_m3(v: Volume) -> Real {
    use uom::si::volume::cubic_meter;
    v.get::<cubic_meter>()
}

/// Convert a water volume (m³) into a depth (mm) over `area` (m²).
#[inline]
pub fn m3_to_mm(volume: Real, area: Real) -> Real {
    volume / area * 1e3
}

/// Convert a water depth (mm) over `area` (m²) into a volume (m³).
#[inline]
pub fn mm_to_m3(depth: Real, area: Real) -> Real {
    depth * area * 1e-3
}

pub mod constants {
    pub const G0_MPS2: f64 = 9.806_65;

    /// Density of water (kg/m³).
    pub const RHO_WATER: f64 = 1000.0;

    /// Convert a pressure (Pa) into an equivalent water column (m).
    #[inline]
    pub fn pressure_to_waterhead(pressure_pa: f64) -> f64 {
        pressure_pa / (RHO_WATER * G0_MPS2)
    }

    /// Convert a water column (m) into a pressure (Pa).
    #[inline]
    pub fn waterhead_to_pressure(head_m: f64) -> f64 {
        head_m * RHO_WATER * G0_MPS2
    }
}
