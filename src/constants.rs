//! Gravity models and fixed astronomical constants
//!
//! Everything here is immutable. The gravity constant sets are built once on
//! first use; the lunar/solar and resonance coefficients of the deep-space
//! theory are plain literals from Spacetrack Report #3.

use once_cell::sync::Lazy;
use std::f64::consts::PI;

/// Two pi
pub const TAU: f64 = 2.0 * PI;

/// Degrees to radians
pub const DEG2RAD: f64 = PI / 180.0;

/// Minutes in a day
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Seconds in a day
pub const DAY_S: f64 = 86400.0;

/// J2000 epoch in Julian days
pub const J2000: f64 = 2451545.0;

/// Julian date of 1950 January 0.0, the reference for SGP4 epoch days
pub const JD_1950: f64 = 2433281.5;

/// Revolutions per day to radians per minute divisor (1440 / 2π)
pub const XPDOTP: f64 = MINUTES_PER_DAY / TAU;

/// Orbital period at or above which the deep-space theory is used (minutes)
pub const DEEP_SPACE_PERIOD_MIN: f64 = 225.0;

/// Perigee height below which the atmospheric density parameter is refit (km)
pub const LOW_PERIGEE_KM: f64 = 156.0;

/// Perigee height below which `s` is pinned at 20 km (km)
pub const VERY_LOW_PERIGEE_KM: f64 = 98.0;

/// Perigee height below which the higher-order drag terms are dropped (km)
pub const SIMPLIFIED_DRAG_PERIGEE_KM: f64 = 220.0;

/// Altitude of the `s` density parameter for standard perigees (km)
pub const DENSITY_S_KM: f64 = 78.0;

/// Altitude of the `q0` density reference (km)
pub const DENSITY_Q0_KM: f64 = 120.0;

/// Geopotential constants for one Earth model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityConstants {
    /// Earth gravitational parameter (km³/s²)
    pub mu: f64,
    /// Equatorial radius (km)
    pub radius_earth_km: f64,
    /// sqrt(mu) in Earth radii^1.5 per minute
    pub xke: f64,
    /// Minutes per time unit (1 / xke)
    pub tumin: f64,
    /// Second zonal harmonic
    pub j2: f64,
    /// Third zonal harmonic
    pub j3: f64,
    /// Fourth zonal harmonic
    pub j4: f64,
    /// j3 / j2
    pub j3oj2: f64,
}

impl GravityConstants {
    fn from_mu(mu: f64, radius_earth_km: f64, j2: f64, j3: f64, j4: f64) -> Self {
        let xke = 60.0 / (radius_earth_km * radius_earth_km * radius_earth_km / mu).sqrt();
        Self::with_xke(mu, radius_earth_km, xke, j2, j3, j4)
    }

    fn with_xke(mu: f64, radius_earth_km: f64, xke: f64, j2: f64, j3: f64, j4: f64) -> Self {
        GravityConstants {
            mu,
            radius_earth_km,
            xke,
            tumin: 1.0 / xke,
            j2,
            j3,
            j4,
            j3oj2: j3 / j2,
        }
    }

    /// Velocity unit of the model (Earth radii per minute) in km/s
    pub fn velocity_km_per_s(&self) -> f64 {
        self.radius_earth_km * self.xke / 60.0
    }
}

/// WGS-72 with the rounded `xke` used by legacy operational code
pub static WGS72OLD: Lazy<GravityConstants> = Lazy::new(|| {
    GravityConstants::with_xke(
        398600.79964,
        6378.135,
        0.0743669161,
        0.001082616,
        -0.00000253881,
        -0.00000165597,
    )
});

/// WGS-72, the model TLEs are generated with
pub static WGS72: Lazy<GravityConstants> = Lazy::new(|| {
    GravityConstants::from_mu(
        398600.8,
        6378.135,
        0.001082616,
        -0.00000253881,
        -0.00000165597,
    )
});

/// WGS-84
pub static WGS84: Lazy<GravityConstants> = Lazy::new(|| {
    GravityConstants::from_mu(
        398600.5,
        6378.137,
        0.00108262998905,
        -0.00000253215306,
        -0.00000161098761,
    )
});

// Lunar and solar perturbation constants

/// Solar mean motion (rad/min)
pub const ZNS: f64 = 1.19459e-5;
/// Solar eccentricity
pub const ZES: f64 = 0.01675;
/// Lunar mean motion (rad/min)
pub const ZNL: f64 = 1.5835218e-4;
/// Lunar eccentricity
pub const ZEL: f64 = 0.05490;
/// Solar perturbation coefficient
pub const C1SS: f64 = 2.9864797e-6;
/// Lunar perturbation coefficient
pub const C1L: f64 = 4.7968065e-7;
/// Sine of the obliquity of the ecliptic
pub const ZSINIS: f64 = 0.39785416;
/// Cosine of the obliquity of the ecliptic
pub const ZCOSIS: f64 = 0.91744867;
/// Cosine of the solar argument of perigee
pub const ZCOSGS: f64 = 0.1945905;
/// Sine of the solar argument of perigee
pub const ZSINGS: f64 = -0.98088458;

// Geopotential resonance constants

pub const Q22: f64 = 1.7891679e-6;
pub const Q31: f64 = 2.1460748e-6;
pub const Q33: f64 = 2.2123015e-7;
pub const ROOT22: f64 = 1.7891679e-6;
pub const ROOT32: f64 = 3.7393792e-7;
pub const ROOT44: f64 = 7.3636953e-9;
pub const ROOT52: f64 = 1.1428639e-7;
pub const ROOT54: f64 = 2.1765803e-9;

/// Earth rotation rate relative to the stars (rad/min)
pub const RPTIM: f64 = 4.37526908801129966e-3;

pub const FASX2: f64 = 0.13130908;
pub const FASX4: f64 = 2.8843198;
pub const FASX6: f64 = 0.37448087;
pub const G22: f64 = 5.7686396;
pub const G32: f64 = 0.95240898;
pub const G44: f64 = 1.8014998;
pub const G52: f64 = 1.0508330;
pub const G54: f64 = 4.4108898;

/// Resonance integrator step (minutes)
pub const RESONANCE_STEP_MIN: f64 = 720.0;

/// Half the square of the resonance step, used by the Taylor update
pub const RESONANCE_STEP2: f64 = 259200.0;

/// Mean motion band of one-revolution-per-day resonance (rad/min, exclusive)
pub const ONE_DAY_BAND: (f64, f64) = (0.0034906585, 0.0052359877);

/// Mean motion band of half-day resonance (rad/min, inclusive)
pub const HALF_DAY_BAND: (f64, f64) = (8.26e-3, 9.24e-3);

/// Minimum eccentricity for half-day resonance
pub const HALF_DAY_MIN_ECCENTRICITY: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs72_xke() {
        assert_relative_eq!(WGS72.xke, 0.07436691613317342, epsilon = 1e-10);
        assert_relative_eq!(WGS72.tumin * WGS72.xke, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_wgs72old_uses_rounded_xke() {
        assert_eq!(WGS72OLD.xke, 0.0743669161);
        assert_eq!(WGS72OLD.radius_earth_km, WGS72.radius_earth_km);
    }

    #[test]
    fn test_wgs84_radius() {
        assert_eq!(WGS84.radius_earth_km, 6378.137);
        assert!(WGS84.j3oj2 < 0.0);
    }

    #[test]
    fn test_velocity_unit() {
        // One Earth radius per minute-unit is about 7.9 km/s
        assert_relative_eq!(WGS72.velocity_km_per_s(), 7.905, epsilon = 1e-3);
    }

    #[test]
    fn test_xpdotp() {
        assert_relative_eq!(XPDOTP, 229.1831180523293, epsilon = 1e-12);
    }
}
