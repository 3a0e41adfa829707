//! Epoch quantities and near-earth secular/drag coefficients
//!
//! Both builders are pure: they read the parsed elements and the gravity
//! model and return immutable coefficient sets. The deep-space builder in
//! [`super::deep_space`] consumes their output but never writes back.

use std::f64::consts::PI;

use super::{OpsMode, PerigeeRegime};
use crate::constants::{
    GravityConstants, DENSITY_Q0_KM, DENSITY_S_KM, JD_1950, LOW_PERIGEE_KM,
    SIMPLIFIED_DRAG_PERIGEE_KM, VERY_LOW_PERIGEE_KM,
};
use crate::time::{greenwich_sidereal_time, greenwich_sidereal_time_afspc};
use crate::tlelib::TleRecord;

/// Guard for the `1 + cos(i)` denominator of the long-period coefficient
/// at inclinations near 180 degrees
const RETROGRADE_GUARD: f64 = 1.5e-12;

/// Eccentricity below which the terms divided by `e` are skipped
const SMALL_ECCENTRICITY: f64 = 1.0e-4;

/// Quantities fixed at epoch: the un-Kozai'd mean motion and the
/// inclination/eccentricity functions every later stage builds on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EpochQuantities {
    /// Brouwer mean motion (rad/min)
    pub no_unkozai: f64,
    /// Semi-major axis from the Brouwer mean motion (Earth radii)
    pub ao: f64,
    pub con41: f64,
    pub con42: f64,
    pub cosio: f64,
    pub cosio2: f64,
    pub sinio: f64,
    pub eccsq: f64,
    pub omeosq: f64,
    pub rteosq: f64,
    pub posq: f64,
    /// Perigee radius (Earth radii)
    pub rp: f64,
    /// Greenwich sidereal time at epoch (rad)
    pub gsto: f64,
}

impl EpochQuantities {
    /// Recover the Brouwer mean motion from the Kozai mean motion of the
    /// TLE, correcting once for J2, and derive the epoch quantities.
    pub fn new(tle: &TleRecord, gravity: &GravityConstants, ops_mode: OpsMode) -> Self {
        let x2o3 = 2.0 / 3.0;
        let ecco = tle.eccentricity;
        let eccsq = ecco * ecco;
        let omeosq = 1.0 - eccsq;
        let rteosq = omeosq.sqrt();
        let cosio = tle.inclination.cos();
        let cosio2 = cosio * cosio;

        let ak = (gravity.xke / tle.mean_motion).powf(x2o3);
        let d1 = 0.75 * gravity.j2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
        let mut del = d1 / (ak * ak);
        let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
        del = d1 / (adel * adel);
        let no_unkozai = tle.mean_motion / (1.0 + del);

        let ao = (gravity.xke / no_unkozai).powf(x2o3);
        let po = ao * omeosq;
        let con42 = 1.0 - 5.0 * cosio2;

        let epoch_1950 = tle.epoch_1950();
        let gsto = match ops_mode {
            OpsMode::Afspc => greenwich_sidereal_time_afspc(epoch_1950),
            OpsMode::Improved => greenwich_sidereal_time(epoch_1950 + JD_1950),
        };

        EpochQuantities {
            no_unkozai,
            ao,
            con41: -con42 - cosio2 - cosio2,
            con42,
            cosio,
            cosio2,
            sinio: tle.inclination.sin(),
            eccsq,
            omeosq,
            rteosq,
            posq: po * po,
            rp: ao * (1.0 - ecco),
            gsto,
        }
    }

    /// Perigee height above the surface (km)
    pub fn perigee_km(&self, gravity: &GravityConstants) -> f64 {
        (self.rp - 1.0) * gravity.radius_earth_km
    }

    /// Anomalistic period from the Brouwer mean motion (minutes)
    pub fn period_minutes(&self) -> f64 {
        2.0 * PI / self.no_unkozai
    }
}

/// Drag terms of order `t³` and above, dropped for low perigees and for
/// deep-space orbits.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HigherOrderDrag {
    pub eta: f64,
    pub cc5: f64,
    pub omgcof: f64,
    pub xmcof: f64,
    pub delmo: f64,
    pub sinmao: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
    pub t3cof: f64,
    pub t4cof: f64,
    pub t5cof: f64,
}

/// Secular rates and drag coefficients shared by both theories
#[derive(Debug, Clone, Copy)]
pub(crate) struct NearEarthCoefficients {
    pub perigee_regime: PerigeeRegime,
    pub cc1: f64,
    pub cc4: f64,
    /// Secular rate of mean anomaly (rad/min)
    pub mdot: f64,
    /// Secular rate of argument of perigee (rad/min)
    pub argpdot: f64,
    /// Secular rate of right ascension (rad/min)
    pub nodedot: f64,
    pub nodecf: f64,
    pub t2cof: f64,
    pub xlcof: f64,
    pub aycof: f64,
    pub x1mth2: f64,
    pub x7thm1: f64,
    /// Present when the full drag model applies
    pub drag: Option<HigherOrderDrag>,
}

/// Density parameters `(s, q0 - s)^4` in Earth radii for a perigee height.
fn density_parameters(perigee_km: f64, radius_earth_km: f64) -> (PerigeeRegime, f64, f64) {
    let (regime, s_km) = if perigee_km >= LOW_PERIGEE_KM {
        (PerigeeRegime::Standard, DENSITY_S_KM)
    } else if perigee_km >= VERY_LOW_PERIGEE_KM {
        (PerigeeRegime::Low, perigee_km - DENSITY_S_KM)
    } else {
        (PerigeeRegime::VeryLow, 20.0)
    };
    let qzms24 = ((DENSITY_Q0_KM - s_km) / radius_earth_km).powi(4);
    (regime, s_km / radius_earth_km + 1.0, qzms24)
}

/// Long-period periodic coefficient of the mean longitude
pub(crate) fn long_period_xlcof(j3oj2: f64, sin_i: f64, cos_i: f64) -> f64 {
    let denominator = if (cos_i + 1.0).abs() > RETROGRADE_GUARD {
        1.0 + cos_i
    } else {
        RETROGRADE_GUARD
    };
    -0.25 * j3oj2 * sin_i * (3.0 + 5.0 * cos_i) / denominator
}

impl NearEarthCoefficients {
    /// Build the secular and drag coefficients.
    ///
    /// `deep_space` forces the simplified drag model regardless of perigee.
    pub fn new(
        tle: &TleRecord,
        epoch: &EpochQuantities,
        gravity: &GravityConstants,
        deep_space: bool,
    ) -> Self {
        let x2o3 = 2.0 / 3.0;
        let ecco = tle.eccentricity;
        let bstar = tle.bstar;
        let ao = epoch.ao;
        let no = epoch.no_unkozai;
        let j2 = gravity.j2;

        let perigee_km = epoch.perigee_km(gravity);
        let (perigee_regime, sfour, qzms24) =
            density_parameters(perigee_km, gravity.radius_earth_km);
        let simplified =
            deep_space || epoch.rp < SIMPLIFIED_DRAG_PERIGEE_KM / gravity.radius_earth_km + 1.0;

        let pinvsq = 1.0 / epoch.posq;
        let tsi = 1.0 / (ao - sfour);
        let eta = ao * ecco * tsi;
        let etasq = eta * eta;
        let eeta = ecco * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * no
            * (ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * j2 * tsi / psisq * epoch.con41 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let cc1 = bstar * cc2;
        let cc3 = if ecco > SMALL_ECCENTRICITY {
            -2.0 * coef * tsi * gravity.j3oj2 * no * epoch.sinio / ecco
        } else {
            0.0
        };
        let x1mth2 = 1.0 - epoch.cosio2;
        let cc4 = 2.0
            * no
            * coef1
            * ao
            * epoch.omeosq
            * (eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - j2 * tsi / (ao * psisq)
                    * (-3.0 * epoch.con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * tle.argument_of_perigee).cos()));
        let cc5 = 2.0 * coef1 * ao * epoch.omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        let cosio = epoch.cosio;
        let cosio2 = epoch.cosio2;
        let cosio4 = cosio2 * cosio2;
        let temp1 = 1.5 * j2 * pinvsq * no;
        let temp2 = 0.5 * temp1 * j2 * pinvsq;
        let temp3 = -0.46875 * gravity.j4 * pinvsq * pinvsq * no;
        let mdot = no
            + 0.5 * temp1 * epoch.rteosq * epoch.con41
            + 0.0625 * temp2 * epoch.rteosq * (13.0 - 78.0 * cosio2 + 137.0 * cosio4);
        let argpdot = -0.5 * temp1 * epoch.con42
            + 0.0625 * temp2 * (7.0 - 114.0 * cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * cosio;
        let nodedot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * cosio2) + 2.0 * temp3 * (3.0 - 7.0 * cosio2)) * cosio;

        let drag = if simplified {
            None
        } else {
            let cc1sq = cc1 * cc1;
            let d2 = 4.0 * ao * tsi * cc1sq;
            let temp = d2 * tsi * cc1 / 3.0;
            let d3 = (17.0 * ao + sfour) * temp;
            let d4 = 0.5 * temp * ao * tsi * (221.0 * ao + 31.0 * sfour) * cc1;
            let delmotemp = 1.0 + eta * tle.mean_anomaly.cos();
            Some(HigherOrderDrag {
                eta,
                cc5,
                omgcof: bstar * cc3 * tle.argument_of_perigee.cos(),
                xmcof: if ecco > SMALL_ECCENTRICITY {
                    -x2o3 * coef * bstar / eeta
                } else {
                    0.0
                },
                delmo: delmotemp * delmotemp * delmotemp,
                sinmao: tle.mean_anomaly.sin(),
                d2,
                d3,
                d4,
                t3cof: d2 + 2.0 * cc1sq,
                t4cof: 0.25 * (3.0 * d3 + cc1 * (12.0 * d2 + 10.0 * cc1sq)),
                t5cof: 0.2
                    * (3.0 * d4
                        + 12.0 * cc1 * d3
                        + 6.0 * d2 * d2
                        + 15.0 * cc1sq * (2.0 * d2 + cc1sq)),
            })
        };

        NearEarthCoefficients {
            perigee_regime,
            cc1,
            cc4,
            mdot,
            argpdot,
            nodedot,
            nodecf: 3.5 * epoch.omeosq * xhdot1 * cc1,
            t2cof: 1.5 * cc1,
            xlcof: long_period_xlcof(gravity.j3oj2, epoch.sinio, cosio),
            aycof: -0.5 * gravity.j3oj2 * epoch.sinio,
            x1mth2,
            x7thm1: 7.0 * cosio2 - 1.0,
            drag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WGS72;
    use crate::tlelib::parse_tle;
    use approx::assert_relative_eq;

    #[test]
    fn test_density_parameters_continuous_at_thresholds() {
        let re = WGS72.radius_earth_km;
        let (regime, s_hi, q_hi) = density_parameters(LOW_PERIGEE_KM, re);
        assert_eq!(regime, PerigeeRegime::Standard);
        let (regime, s_lo, q_lo) = density_parameters(LOW_PERIGEE_KM - 1e-9, re);
        assert_eq!(regime, PerigeeRegime::Low);
        assert_relative_eq!(s_hi, s_lo, epsilon = 1e-12);
        assert_relative_eq!(q_hi, q_lo, epsilon = 1e-15);

        let (regime, s, _) = density_parameters(50.0, re);
        assert_eq!(regime, PerigeeRegime::VeryLow);
        assert_relative_eq!(s, 20.0 / re + 1.0);
    }

    #[test]
    fn test_unkozai_mean_motion() {
        let tle = parse_tle(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        );
        let epoch = EpochQuantities::new(&tle, &WGS72, OpsMode::Improved);
        // Brouwer mean motion is slightly below the Kozai value
        assert!(epoch.no_unkozai < tle.mean_motion);
        assert_relative_eq!(epoch.no_unkozai / tle.mean_motion, 1.0, epsilon = 1e-3);
        assert!(epoch.period_minutes() < 225.0);
        assert!(epoch.perigee_km(&WGS72) > 600.0);
    }

    #[test]
    fn test_full_drag_model_for_high_perigee() {
        let tle = parse_tle(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        );
        let epoch = EpochQuantities::new(&tle, &WGS72, OpsMode::Improved);
        let coefficients = NearEarthCoefficients::new(&tle, &epoch, &WGS72, false);
        assert_eq!(coefficients.perigee_regime, PerigeeRegime::Standard);
        assert!(coefficients.cc1 > 0.0);
        assert!(coefficients.drag.is_some());

        let deep = NearEarthCoefficients::new(&tle, &epoch, &WGS72, true);
        assert!(deep.drag.is_none());
        assert_eq!(deep.cc1, coefficients.cc1);
    }

    #[test]
    fn test_xlcof_guard_at_retrograde_equator() {
        let value = long_period_xlcof(WGS72.j3oj2, 0.0, -1.0);
        assert!(value.is_finite());
    }
}
