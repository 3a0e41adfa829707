//! SGP4/SDP4 satellite propagation
//!
//! A [`SatelliteRecord`] is built once per satellite from a parsed TLE. It
//! selects the near-earth (SGP4) or deep-space (SDP4) theory from the orbital
//! period and precomputes every coefficient the propagation step needs.
//! [`SatelliteRecord::propagate`] then produces position and velocity in the
//! TEME frame at any time offset from epoch.
//!
//! Propagation never returns `Err`. Numerical failures are reported through
//! [`PropagationResult::error`], the way operational SGP4 code does;
//! [`PropagationResult::into_result`] converts for callers who prefer `?`.
//!
//! # Example
//!
//! ```
//! use sattrack::sgp4lib::{ErrorCode, Method, SatelliteRecord, Sgp4Options};
//! use sattrack::tlelib::parse_tle;
//!
//! let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
//! let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
//!
//! let mut iss = SatelliteRecord::new(&parse_tle(line1, line2), Sgp4Options::default());
//! assert_eq!(iss.method(), Method::NearEarth);
//!
//! let state = iss.propagate(90.0);
//! assert_eq!(state.error, ErrorCode::None);
//! assert!(state.position.norm() > 6378.0);
//! ```

mod deep_space;
mod near_earth;
pub mod teme;

#[cfg(test)]
mod tests;

use std::f64::consts::PI;
use std::fmt;

use chrono::NaiveDateTime;
use log::debug;
use nalgebra::Vector3;
use thiserror::Error;

use crate::constants::{
    GravityConstants, DEEP_SPACE_PERIOD_MIN, MINUTES_PER_DAY, TAU, WGS72, WGS72OLD, WGS84,
};
use crate::time::julian_date_from_datetime;
use crate::tlelib::{parse_tle_strict, TleRecord};
use crate::{Result, SattrackError};

use deep_space::{AngularElements, DeepSpaceTerms, ResonanceState};
use near_earth::{long_period_xlcof, EpochQuantities, NearEarthCoefficients};

pub use teme::{rot_z, teme_to_pef, teme_to_pef_at};

/// Eccentricity floor applied after drag, keeping later divisions finite
const MIN_ECCENTRICITY: f64 = 1.0e-6;

/// Kepler solver limits
const KEPLER_MAX_ITERATIONS: usize = 10;
const KEPLER_TOLERANCE: f64 = 1.0e-12;
const KEPLER_MAX_STEP: f64 = 0.95;

/// Which perturbation theory a record uses. Decided once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// SGP4, period below 225 minutes
    NearEarth,
    /// SDP4, period of 225 minutes or more
    DeepSpace,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::NearEarth => write!(f, "n"),
            Method::DeepSpace => write!(f, "d"),
        }
    }
}

/// Geopotential resonance class of a deep-space orbit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resonance {
    /// No resonance integration (also every near-earth orbit)
    None,
    /// Synchronous, about one revolution per day
    OneDay,
    /// Eccentric (e >= 0.5) orbits of about two revolutions per day, e.g. Molniya
    HalfDay,
}

/// Atmospheric density fit selected by perigee height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerigeeRegime {
    /// Perigee at or above 156 km
    Standard,
    /// Perigee between 98 and 156 km: density parameter tracks the perigee
    Low,
    /// Perigee below 98 km: density parameter pinned at 20 km
    VeryLow,
}

/// Propagation error codes.
///
/// Codes other than `Decayed` mean no state vector could be computed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// Propagation succeeded (code 0)
    #[default]
    #[error("no error")]
    None,
    /// Drag pushed the mean eccentricity outside [-0.001, 1) (code 1)
    #[error("mean eccentricity out of range 0 <= e < 1")]
    MeanEccentricityOutOfRange,
    /// Mean motion after the secular update is not positive (code 2)
    #[error("mean motion below zero")]
    MeanMotionBelowZero,
    /// Lunar/solar periodics pushed the eccentricity outside [0, 1] (code 3)
    #[error("perturbed eccentricity out of range 0 <= e <= 1")]
    PerturbedEccentricityOutOfRange,
    /// Negative semi-latus rectum after the long-period terms (code 4)
    #[error("semi-latus rectum below zero")]
    SemiLatusRectumBelowZero,
    /// Mean or osculating orbit below one Earth radius (code 6). The
    /// computed state is still returned.
    #[error("satellite has decayed")]
    Decayed,
}

impl ErrorCode {
    /// Numeric code used by operational SGP4 implementations
    pub fn code(&self) -> u8 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::MeanEccentricityOutOfRange => 1,
            ErrorCode::MeanMotionBelowZero => 2,
            ErrorCode::PerturbedEccentricityOutOfRange => 3,
            ErrorCode::SemiLatusRectumBelowZero => 4,
            ErrorCode::Decayed => 6,
        }
    }
}

/// Earth gravity model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravityModel {
    /// WGS-72 with the rounded `xke` of legacy code
    Wgs72Old,
    /// WGS-72, which TLEs are fitted with
    #[default]
    Wgs72,
    Wgs84,
}

impl GravityModel {
    pub fn constants(&self) -> &'static GravityConstants {
        match self {
            GravityModel::Wgs72Old => &*WGS72OLD,
            GravityModel::Wgs72 => &*WGS72,
            GravityModel::Wgs84 => &*WGS84,
        }
    }
}

/// Operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpsMode {
    /// Legacy operational behavior: 1970-based sidereal time and node wrapping
    Afspc,
    /// IAU-82 sidereal time
    #[default]
    Improved,
}

/// Propagator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sgp4Options {
    pub gravity: GravityModel,
    pub ops_mode: OpsMode,
}

/// Mean elements after secular and drag updates, before periodics.
///
/// Angles in radians, semi-major axis in Earth radii, mean motion in
/// radians per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub raan: f64,
    pub argument_of_perigee: f64,
    pub mean_anomaly: f64,
    pub mean_motion: f64,
}

/// Output of one propagation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationResult {
    /// TEME position (km)
    pub position: Vector3<f64>,
    /// TEME velocity (km/s)
    pub velocity: Vector3<f64>,
    pub error: ErrorCode,
    /// Mean elements at the requested time, when propagation got that far
    pub mean_elements: Option<MeanElements>,
}

impl PropagationResult {
    fn failed(error: ErrorCode, mean_elements: Option<MeanElements>) -> Self {
        PropagationResult {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            error,
            mean_elements,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error == ErrorCode::None
    }

    /// Position and velocity, or the error code as an `Err`
    pub fn into_result(self) -> Result<(Vector3<f64>, Vector3<f64>)> {
        match self.error {
            ErrorCode::None => Ok((self.position, self.velocity)),
            code => Err(SattrackError::Propagation(code)),
        }
    }
}

/// Short-period coefficients that depend on inclination. Fixed for
/// near-earth orbits, recomputed from the perturbed inclination each call
/// for deep-space ones.
struct ShortPeriodCoefficients {
    aycof: f64,
    xlcof: f64,
    con41: f64,
    x1mth2: f64,
    x7thm1: f64,
}

impl ShortPeriodCoefficients {
    fn at_inclination(j3oj2: f64, sin_i: f64, cos_i: f64) -> Self {
        let cosisq = cos_i * cos_i;
        ShortPeriodCoefficients {
            aycof: -0.5 * j3oj2 * sin_i,
            xlcof: long_period_xlcof(j3oj2, sin_i, cos_i),
            con41: 3.0 * cosisq - 1.0,
            x1mth2: 1.0 - cosisq,
            x7thm1: 7.0 * cosisq - 1.0,
        }
    }
}

/// Solve Kepler's equation in equinoctial form for `E + ω`.
///
/// Newton iteration from `u`, at most ten steps, each clamped to 0.95 rad.
/// Returns `(sin, cos)` of the iterate the final correction was computed
/// from, which is what the short-period terms are evaluated with.
fn solve_kepler(u: f64, axnl: f64, aynl: f64) -> (f64, f64) {
    let mut eo1 = u;
    let mut sin_cos = (0.0, 0.0);
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let (sineo1, coseo1) = eo1.sin_cos();
        sin_cos = (sineo1, coseo1);
        let mut step = (u - aynl * coseo1 + axnl * sineo1 - eo1)
            / (1.0 - coseo1 * axnl - sineo1 * aynl);
        if step.abs() >= KEPLER_MAX_STEP {
            step = KEPLER_MAX_STEP.copysign(step);
        }
        eo1 += step;
        if step.abs() < KEPLER_TOLERANCE {
            break;
        }
    }
    sin_cos
}

/// A satellite initialized for SGP4/SDP4 propagation.
///
/// Everything except the resonance integrator state is fixed at
/// construction. `propagate` takes `&mut self` because resonant deep-space
/// orbits advance that state; results never depend on earlier calls.
#[derive(Debug, Clone)]
pub struct SatelliteRecord {
    tle: TleRecord,
    options: Sgp4Options,
    gravity: GravityConstants,
    epoch: EpochQuantities,
    near_earth: NearEarthCoefficients,
    deep_space: Option<DeepSpaceTerms>,
    resonance_state: ResonanceState,
    error: ErrorCode,
}

impl SatelliteRecord {
    /// Initialize a satellite from parsed elements.
    ///
    /// Initialization itself never fails. The record is propagated once at
    /// epoch and any error found there is kept in [`SatelliteRecord::error`].
    pub fn new(tle: &TleRecord, options: Sgp4Options) -> Self {
        let gravity = *options.gravity.constants();
        let epoch = EpochQuantities::new(tle, &gravity, options.ops_mode);
        let is_deep_space = epoch.period_minutes() >= DEEP_SPACE_PERIOD_MIN;
        let near_earth = NearEarthCoefficients::new(tle, &epoch, &gravity, is_deep_space);
        let deep_space =
            is_deep_space.then(|| DeepSpaceTerms::new(tle, &epoch, &near_earth, &gravity));
        let resonance_state = match &deep_space {
            Some(terms) => terms.initial_state(),
            None => ResonanceState {
                atime: 0.0,
                xli: 0.0,
                xni: 0.0,
            },
        };

        let mut record = SatelliteRecord {
            tle: tle.clone(),
            options,
            gravity,
            epoch,
            near_earth,
            deep_space,
            resonance_state,
            error: ErrorCode::None,
        };
        record.error = record.propagate(0.0).error;

        debug!(
            "Initialized satellite {}: method={} resonance={:?} perigee={:.1} km ({:?}) error={:?}",
            record.tle.catalog_number,
            record.method(),
            record.resonance(),
            record.epoch.perigee_km(&record.gravity),
            record.near_earth.perigee_regime,
            record.error,
        );

        record
    }

    /// Parse and validate two TLE lines, then initialize
    pub fn from_lines(line1: &str, line2: &str, options: Sgp4Options) -> Result<Self> {
        let tle = parse_tle_strict(line1, line2)?;
        Ok(Self::new(&tle, options))
    }

    pub fn tle(&self) -> &TleRecord {
        &self.tle
    }

    pub fn catalog_number(&self) -> &str {
        &self.tle.catalog_number
    }

    pub fn options(&self) -> Sgp4Options {
        self.options
    }

    pub fn gravity(&self) -> &GravityConstants {
        &self.gravity
    }

    /// Error found by the priming propagation at epoch
    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn method(&self) -> Method {
        if self.deep_space.is_some() {
            Method::DeepSpace
        } else {
            Method::NearEarth
        }
    }

    pub fn resonance(&self) -> Resonance {
        self.deep_space
            .as_ref()
            .map_or(Resonance::None, |terms| terms.resonance.class())
    }

    pub fn perigee_regime(&self) -> PerigeeRegime {
        self.near_earth.perigee_regime
    }

    /// Whether the drag terms of order `t³` and above are dropped
    /// (perigee below 220 km, or deep space)
    pub fn is_simplified(&self) -> bool {
        self.near_earth.drag.is_none()
    }

    /// Brouwer mean motion at epoch (rad/min)
    pub fn no_unkozai(&self) -> f64 {
        self.epoch.no_unkozai
    }

    /// Anomalistic period at epoch (minutes)
    pub fn period_minutes(&self) -> f64 {
        self.epoch.period_minutes()
    }

    /// Semi-major axis at epoch (Earth radii)
    pub fn semi_major_axis(&self) -> f64 {
        (self.epoch.no_unkozai * self.gravity.tumin).powf(-2.0 / 3.0)
    }

    /// Apogee altitude at epoch (Earth radii above the surface)
    pub fn apogee_altitude(&self) -> f64 {
        self.semi_major_axis() * (1.0 + self.tle.eccentricity) - 1.0
    }

    /// Perigee altitude at epoch (Earth radii above the surface)
    pub fn perigee_altitude(&self) -> f64 {
        self.semi_major_axis() * (1.0 - self.tle.eccentricity) - 1.0
    }

    /// Greenwich sidereal time at epoch (rad)
    pub fn gsto(&self) -> f64 {
        self.epoch.gsto
    }

    /// Leading drag coefficient C1
    pub fn cc1(&self) -> f64 {
        self.near_earth.cc1
    }

    /// Minutes from epoch to a split Julian date
    pub fn minutes_since_epoch(&self, jd_whole: f64, jd_fraction: f64) -> f64 {
        (jd_whole - self.tle.epoch_jd) * MINUTES_PER_DAY
            + (jd_fraction - self.tle.epoch_jd_fraction) * MINUTES_PER_DAY
    }

    /// Propagate to a split Julian date (UTC)
    pub fn propagate_jd(&mut self, jd_whole: f64, jd_fraction: f64) -> PropagationResult {
        let minutes = self.minutes_since_epoch(jd_whole, jd_fraction);
        self.propagate(minutes)
    }

    /// Propagate to a calendar timestamp (UTC)
    pub fn propagate_datetime(&mut self, datetime: &NaiveDateTime) -> PropagationResult {
        let (jd_whole, jd_fraction) = julian_date_from_datetime(datetime);
        self.propagate_jd(jd_whole, jd_fraction)
    }

    /// Propagate to `tsince` minutes from epoch (negative is before epoch).
    pub fn propagate(&mut self, tsince: f64) -> PropagationResult {
        let result = self.step(tsince);
        if !result.is_ok() {
            debug!(
                "Satellite {} at {} min: {} (code {})",
                self.tle.catalog_number,
                tsince,
                result.error,
                result.error.code()
            );
        }
        result
    }

    fn step(&mut self, t: f64) -> PropagationResult {
        let tle = &self.tle;
        let gravity = &self.gravity;
        let coefficients = &self.near_earth;
        let no_unkozai = self.epoch.no_unkozai;

        // Secular gravity and drag
        let xmdf = tle.mean_anomaly + coefficients.mdot * t;
        let argpdf = tle.argument_of_perigee + coefficients.argpdot * t;
        let nodedf = tle.raan + coefficients.nodedot * t;
        let t2 = t * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let mut nodem = nodedf + coefficients.nodecf * t2;
        let mut tempa = 1.0 - coefficients.cc1 * t;
        let mut tempe = tle.bstar * coefficients.cc4 * t;
        let mut templ = coefficients.t2cof * t2;

        if let Some(drag) = &coefficients.drag {
            let delomg = drag.omgcof * t;
            let delmtemp = 1.0 + drag.eta * xmdf.cos();
            let delm = drag.xmcof * (delmtemp * delmtemp * delmtemp - drag.delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa -= drag.d2 * t2 + drag.d3 * t3 + drag.d4 * t4;
            tempe += tle.bstar * drag.cc5 * (mm.sin() - drag.sinmao);
            templ += drag.t3cof * t3 + t4 * (drag.t4cof + t * drag.t5cof);
        }

        let mut nm = no_unkozai;
        let mut em = tle.eccentricity;
        let mut inclm = tle.inclination;

        if let Some(deep) = &self.deep_space {
            let mean = AngularElements {
                eccentricity: em,
                inclination: inclm,
                raan: nodem,
                argument_of_perigee: argpm,
                mean_anomaly: mm,
            };
            let (drifted, n) = deep.secular(t, mean, &mut self.resonance_state);
            em = drifted.eccentricity;
            inclm = drifted.inclination;
            nodem = drifted.raan;
            argpm = drifted.argument_of_perigee;
            mm = drifted.mean_anomaly;
            nm = n;
        }

        if nm <= 0.0 {
            return PropagationResult::failed(ErrorCode::MeanMotionBelowZero, None);
        }

        let am = (gravity.xke / nm).powf(2.0 / 3.0) * tempa * tempa;
        nm = gravity.xke / am.powf(1.5);
        em -= tempe;

        if !(-0.001..1.0).contains(&em) {
            return PropagationResult::failed(ErrorCode::MeanEccentricityOutOfRange, None);
        }
        if em < MIN_ECCENTRICITY {
            em = MIN_ECCENTRICITY;
        }

        mm += no_unkozai * templ;
        let xlm = (mm + argpm + nodem) % TAU;
        nodem %= TAU;
        argpm %= TAU;
        mm = (xlm - argpm - nodem) % TAU;

        let mean_elements = MeanElements {
            semi_major_axis: am,
            eccentricity: em,
            inclination: inclm,
            raan: nodem,
            argument_of_perigee: argpm,
            mean_anomaly: mm,
            mean_motion: nm,
        };

        // Lunar/solar periodics
        let mut perturbed = AngularElements {
            eccentricity: em,
            inclination: inclm,
            raan: nodem,
            argument_of_perigee: argpm,
            mean_anomaly: mm,
        };
        let short_period = match &self.deep_space {
            Some(deep) => {
                perturbed = deep.periodics.apply(t, perturbed, self.options.ops_mode);
                if perturbed.inclination < 0.0 {
                    perturbed.inclination = -perturbed.inclination;
                    perturbed.raan += PI;
                    perturbed.argument_of_perigee -= PI;
                }
                if perturbed.eccentricity < 0.0 || perturbed.eccentricity > 1.0 {
                    return PropagationResult::failed(
                        ErrorCode::PerturbedEccentricityOutOfRange,
                        Some(mean_elements),
                    );
                }
                let (sin_i, cos_i) = perturbed.inclination.sin_cos();
                ShortPeriodCoefficients::at_inclination(gravity.j3oj2, sin_i, cos_i)
            }
            None => ShortPeriodCoefficients {
                aycof: coefficients.aycof,
                xlcof: coefficients.xlcof,
                con41: self.epoch.con41,
                x1mth2: coefficients.x1mth2,
                x7thm1: coefficients.x7thm1,
            },
        };

        orbital_state(
            gravity,
            am,
            nm,
            &perturbed,
            &short_period,
            mean_elements,
        )
    }
}

/// Long-period periodics, Kepler's equation, short-period periodics and
/// the rotation of the orbit-plane state into TEME.
fn orbital_state(
    gravity: &GravityConstants,
    am: f64,
    nm: f64,
    elements: &AngularElements,
    short_period: &ShortPeriodCoefficients,
    mean_elements: MeanElements,
) -> PropagationResult {
    let ep = elements.eccentricity;
    let argpp = elements.argument_of_perigee;
    let nodep = elements.raan;
    let (sinip, cosip) = elements.inclination.sin_cos();

    // Long-period periodics
    let axnl = ep * argpp.cos();
    let temp = 1.0 / (am * (1.0 - ep * ep));
    let aynl = ep * argpp.sin() + temp * short_period.aycof;
    let xl = elements.mean_anomaly + argpp + nodep + temp * short_period.xlcof * axnl;

    let u = (xl - nodep) % TAU;
    let (sineo1, coseo1) = solve_kepler(u, axnl, aynl);

    // Short-period preliminary quantities
    let ecose = axnl * coseo1 + aynl * sineo1;
    let esine = axnl * sineo1 - aynl * coseo1;
    let el2 = axnl * axnl + aynl * aynl;
    let pl = am * (1.0 - el2);
    if pl < 0.0 {
        return PropagationResult::failed(
            ErrorCode::SemiLatusRectumBelowZero,
            Some(mean_elements),
        );
    }

    let rl = am * (1.0 - ecose);
    let rdotl = am.sqrt() * esine / rl;
    let rvdotl = pl.sqrt() / rl;
    let betal = (1.0 - el2).sqrt();
    let temp = esine / (1.0 + betal);
    let sinu = am / rl * (sineo1 - aynl - axnl * temp);
    let cosu = am / rl * (coseo1 - axnl + aynl * temp);
    let su = sinu.atan2(cosu);
    let sin2u = (cosu + cosu) * sinu;
    let cos2u = 1.0 - 2.0 * sinu * sinu;
    let temp = 1.0 / pl;
    let temp1 = 0.5 * gravity.j2 * temp;
    let temp2 = temp1 * temp;

    // Short-period periodics
    let sp = short_period;
    let mrt = rl * (1.0 - 1.5 * temp2 * betal * sp.con41) + 0.5 * temp1 * sp.x1mth2 * cos2u;
    let su = su - 0.25 * temp2 * sp.x7thm1 * sin2u;
    let xnode = nodep + 1.5 * temp2 * cosip * sin2u;
    let xinc = elements.inclination + 1.5 * temp2 * cosip * sinip * cos2u;
    let mvt = rdotl - nm * temp1 * sp.x1mth2 * sin2u / gravity.xke;
    let rvdot = rvdotl + nm * temp1 * (sp.x1mth2 * cos2u + 1.5 * sp.con41) / gravity.xke;

    // Orientation vectors
    let (sinsu, cossu) = su.sin_cos();
    let (snod, cnod) = xnode.sin_cos();
    let (sini, cosi) = xinc.sin_cos();
    let xmx = -snod * cosi;
    let xmy = cnod * cosi;
    let u_vec = Vector3::new(xmx * sinsu + cnod * cossu, xmy * sinsu + snod * cossu, sini * sinsu);
    let v_vec = Vector3::new(xmx * cossu - cnod * sinsu, xmy * cossu - snod * sinsu, sini * cossu);

    let position = u_vec * (mrt * gravity.radius_earth_km);
    let velocity = (u_vec * mvt + v_vec * rvdot) * gravity.velocity_km_per_s();

    // Decay is judged on the drag-decayed mean orbit as well as the
    // osculating radius, so it holds once the mean orbit is sub-surface.
    let error = if mrt < 1.0 || am < 1.0 {
        ErrorCode::Decayed
    } else {
        ErrorCode::None
    };

    PropagationResult {
        position,
        velocity,
        error,
        mean_elements: Some(mean_elements),
    }
}
