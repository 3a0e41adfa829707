//! Deep-space (SDP4) lunar/solar perturbations and geopotential resonance
//!
//! Orbits with a period of 225 minutes or more pick up three extra effects:
//!
//! - long-period lunar and solar periodics ([`LunisolarPeriodics`])
//! - linear lunar/solar secular drift of the angular elements ([`SecularRates`])
//! - for orbits commensurate with the Earth's rotation, resonance with the
//!   tesseral harmonics, integrated numerically in 720-minute steps
//!
//! Everything here is built once at initialization. The only state carried
//! between propagation calls is [`ResonanceState`], the last point the
//! resonance integrator reached.

use std::f64::consts::PI;

use log::trace;

use super::near_earth::{EpochQuantities, NearEarthCoefficients};
use super::{OpsMode, Resonance};
use crate::constants::*;
use crate::tlelib::TleRecord;

/// Inclination below which (or within this of 180 degrees) the nodal
/// terms of the secular rates are dropped
const NODAL_CUTOFF: f64 = 5.2359877e-2;

/// Perturbed inclination below which the Lyddane form of the periodics is used
const LYDDANE_INCLINATION: f64 = 0.2;

/// Mean elements as they pass through the deep-space corrections
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AngularElements {
    pub eccentricity: f64,
    pub inclination: f64,
    pub raan: f64,
    pub argument_of_perigee: f64,
    pub mean_anomaly: f64,
}

/// Orientation of a perturbing body's orbit
struct BodyOrientation {
    cos_g: f64,
    sin_g: f64,
    cos_i: f64,
    sin_i: f64,
    cos_h: f64,
    sin_h: f64,
}

/// Trigonometric functions of the satellite orbit at epoch
struct OrbitTrig {
    eccentricity: f64,
    emsq: f64,
    betasq: f64,
    rtemsq: f64,
    sin_i: f64,
    cos_i: f64,
    sin_w: f64,
    cos_w: f64,
    inverse_mean_motion: f64,
}

/// Coupling coefficients between the satellite orbit and one body
#[derive(Debug, Clone, Copy)]
struct ThirdBody {
    s1: f64,
    s2: f64,
    s3: f64,
    s4: f64,
    s5: f64,
    s6: f64,
    s7: f64,
    z1: f64,
    z2: f64,
    z3: f64,
    z11: f64,
    z12: f64,
    z13: f64,
    z21: f64,
    z22: f64,
    z23: f64,
    z31: f64,
    z32: f64,
    z33: f64,
}

impl ThirdBody {
    fn new(body: &BodyOrientation, orbit: &OrbitTrig, coupling: f64) -> Self {
        let a1 = body.cos_g * body.cos_h + body.sin_g * body.cos_i * body.sin_h;
        let a3 = -body.sin_g * body.cos_h + body.cos_g * body.cos_i * body.sin_h;
        let a7 = -body.cos_g * body.sin_h + body.sin_g * body.cos_i * body.cos_h;
        let a8 = body.sin_g * body.sin_i;
        let a9 = body.sin_g * body.sin_h + body.cos_g * body.cos_i * body.cos_h;
        let a10 = body.cos_g * body.sin_i;
        let a2 = orbit.cos_i * a7 + orbit.sin_i * a8;
        let a4 = orbit.cos_i * a9 + orbit.sin_i * a10;
        let a5 = -orbit.sin_i * a7 + orbit.cos_i * a8;
        let a6 = -orbit.sin_i * a9 + orbit.cos_i * a10;

        let (sin_w, cos_w) = (orbit.sin_w, orbit.cos_w);
        let x1 = a1 * cos_w + a2 * sin_w;
        let x2 = a3 * cos_w + a4 * sin_w;
        let x3 = -a1 * sin_w + a2 * cos_w;
        let x4 = -a3 * sin_w + a4 * cos_w;
        let x5 = a5 * sin_w;
        let x6 = a6 * sin_w;
        let x7 = a5 * cos_w;
        let x8 = a6 * cos_w;

        let emsq = orbit.emsq;
        let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
        let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
        let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
        let z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * emsq;
        let z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * emsq;
        let z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * emsq;
        let z11 = -6.0 * a1 * a5 + emsq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
        let z12 = -6.0 * (a1 * a6 + a3 * a5)
            + emsq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
        let z13 = -6.0 * a3 * a6 + emsq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
        let z21 = 6.0 * a2 * a5 + emsq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
        let z22 = 6.0 * (a4 * a5 + a2 * a6)
            + emsq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
        let z23 = 6.0 * a4 * a6 + emsq * (24.0 * x2 * x6 - 6.0 * x4 * x8);

        let s3 = coupling * orbit.inverse_mean_motion;
        let s4 = s3 * orbit.rtemsq;
        ThirdBody {
            s1: -15.0 * orbit.eccentricity * s4,
            s2: -0.5 * s3 / orbit.rtemsq,
            s3,
            s4,
            s5: x1 * x3 + x2 * x4,
            s6: x2 * x3 + x1 * x4,
            s7: x2 * x4 - x1 * x3,
            z1: z1 + z1 + orbit.betasq * z31,
            z2: z2 + z2 + orbit.betasq * z32,
            z3: z3 + z3 + orbit.betasq * z33,
            z11,
            z12,
            z13,
            z21,
            z22,
            z23,
            z31,
            z32,
            z33,
        }
    }
}

/// Lunar and solar geometry at epoch
struct LunisolarGeometry {
    solar: ThirdBody,
    lunar: ThirdBody,
    /// Solar mean anomaly at epoch
    zmos: f64,
    /// Lunar mean anomaly at epoch
    zmol: f64,
    emsq: f64,
    sin_i: f64,
    cos_i: f64,
}

impl LunisolarGeometry {
    fn new(tle: &TleRecord, no_unkozai: f64) -> Self {
        let em = tle.eccentricity;
        let emsq = em * em;
        let betasq = 1.0 - emsq;
        let (snodm, cnodm) = tle.raan.sin_cos();
        let orbit = OrbitTrig {
            eccentricity: em,
            emsq,
            betasq,
            rtemsq: betasq.sqrt(),
            sin_i: tle.inclination.sin(),
            cos_i: tle.inclination.cos(),
            sin_w: tle.argument_of_perigee.sin(),
            cos_w: tle.argument_of_perigee.cos(),
            inverse_mean_motion: 1.0 / no_unkozai,
        };

        // Days since 1900 January 0.5
        let day = tle.epoch_1950() + 18261.5;
        let xnodce = (4.5236020 - 9.2422029e-4 * day) % TAU;
        let (stem, ctem) = xnodce.sin_cos();
        let zcosil = 0.91375164 - 0.03568096 * ctem;
        let zsinil = (1.0 - zcosil * zcosil).sqrt();
        let zsinhl = 0.089683511 * stem / zsinil;
        let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
        let gam = 5.8351514 + 0.0019443680 * day;
        let zx = (ZSINIS * stem / zsinil).atan2(zcoshl * ctem + ZCOSIS * zsinhl * stem);
        let zx = gam + zx - xnodce;

        let sun = BodyOrientation {
            cos_g: ZCOSGS,
            sin_g: ZSINGS,
            cos_i: ZCOSIS,
            sin_i: ZSINIS,
            cos_h: cnodm,
            sin_h: snodm,
        };
        let moon = BodyOrientation {
            cos_g: zx.cos(),
            sin_g: zx.sin(),
            cos_i: zcosil,
            sin_i: zsinil,
            cos_h: zcoshl * cnodm + zsinhl * snodm,
            sin_h: snodm * zcoshl - cnodm * zsinhl,
        };

        LunisolarGeometry {
            solar: ThirdBody::new(&sun, &orbit, C1SS),
            lunar: ThirdBody::new(&moon, &orbit, C1L),
            zmos: (6.2565837 + 0.017201977 * day) % TAU,
            zmol: (4.7199672 + 0.22997150 * day - gam) % TAU,
            emsq,
            sin_i: orbit.sin_i,
            cos_i: orbit.cos_i,
        }
    }
}

/// Coefficients of the long-period lunar/solar periodic terms
#[derive(Debug, Clone, Copy)]
pub(crate) struct LunisolarPeriodics {
    zmos: f64,
    zmol: f64,
    se2: f64,
    se3: f64,
    si2: f64,
    si3: f64,
    sl2: f64,
    sl3: f64,
    sl4: f64,
    sgh2: f64,
    sgh3: f64,
    sgh4: f64,
    sh2: f64,
    sh3: f64,
    ee2: f64,
    e3: f64,
    xi2: f64,
    xi3: f64,
    xl2: f64,
    xl3: f64,
    xl4: f64,
    xgh2: f64,
    xgh3: f64,
    xgh4: f64,
    xh2: f64,
    xh3: f64,
}

/// Periodic perturbations in eccentricity, inclination, mean longitude,
/// argument of perigee and node from one body
struct PeriodicShift {
    e: f64,
    i: f64,
    l: f64,
    gh: f64,
    h: f64,
}

impl LunisolarPeriodics {
    fn new(geometry: &LunisolarGeometry) -> Self {
        let s = &geometry.solar;
        let l = &geometry.lunar;
        let emsq = geometry.emsq;
        LunisolarPeriodics {
            zmos: geometry.zmos,
            zmol: geometry.zmol,
            se2: 2.0 * s.s1 * s.s6,
            se3: 2.0 * s.s1 * s.s7,
            si2: 2.0 * s.s2 * s.z12,
            si3: 2.0 * s.s2 * (s.z13 - s.z11),
            sl2: -2.0 * s.s3 * s.z2,
            sl3: -2.0 * s.s3 * (s.z3 - s.z1),
            sl4: -2.0 * s.s3 * (-21.0 - 9.0 * emsq) * ZES,
            sgh2: 2.0 * s.s4 * s.z32,
            sgh3: 2.0 * s.s4 * (s.z33 - s.z31),
            sgh4: -18.0 * s.s4 * ZES,
            sh2: -2.0 * s.s2 * s.z22,
            sh3: -2.0 * s.s2 * (s.z23 - s.z21),
            ee2: 2.0 * l.s1 * l.s6,
            e3: 2.0 * l.s1 * l.s7,
            xi2: 2.0 * l.s2 * l.z12,
            xi3: 2.0 * l.s2 * (l.z13 - l.z11),
            xl2: -2.0 * l.s3 * l.z2,
            xl3: -2.0 * l.s3 * (l.z3 - l.z1),
            xl4: -2.0 * l.s3 * (-21.0 - 9.0 * emsq) * ZEL,
            xgh2: 2.0 * l.s4 * l.z32,
            xgh3: 2.0 * l.s4 * (l.z33 - l.z31),
            xgh4: -18.0 * l.s4 * ZEL,
            xh2: -2.0 * l.s2 * l.z22,
            xh3: -2.0 * l.s2 * (l.z23 - l.z21),
        }
    }

    fn solar(&self, t: f64) -> PeriodicShift {
        let zm = self.zmos + ZNS * t;
        let zf = zm + 2.0 * ZES * zm.sin();
        let sinzf = zf.sin();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * zf.cos();
        PeriodicShift {
            e: self.se2 * f2 + self.se3 * f3,
            i: self.si2 * f2 + self.si3 * f3,
            l: self.sl2 * f2 + self.sl3 * f3 + self.sl4 * sinzf,
            gh: self.sgh2 * f2 + self.sgh3 * f3 + self.sgh4 * sinzf,
            h: self.sh2 * f2 + self.sh3 * f3,
        }
    }

    fn lunar(&self, t: f64) -> PeriodicShift {
        let zm = self.zmol + ZNL * t;
        let zf = zm + 2.0 * ZEL * zm.sin();
        let sinzf = zf.sin();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * zf.cos();
        PeriodicShift {
            e: self.ee2 * f2 + self.e3 * f3,
            i: self.xi2 * f2 + self.xi3 * f3,
            l: self.xl2 * f2 + self.xl3 * f3 + self.xl4 * sinzf,
            gh: self.xgh2 * f2 + self.xgh3 * f3 + self.xgh4 * sinzf,
            h: self.xh2 * f2 + self.xh3 * f3,
        }
    }

    /// Add the lunar/solar periodics at `t` minutes since epoch.
    ///
    /// Below 0.2 rad of perturbed inclination the node and argument of
    /// perigee are corrected through the Lyddane modification, which stays
    /// well defined as the inclination goes to zero.
    pub fn apply(&self, t: f64, elements: AngularElements, ops_mode: OpsMode) -> AngularElements {
        let solar = self.solar(t);
        let lunar = self.lunar(t);
        let pe = solar.e + lunar.e;
        let pinc = solar.i + lunar.i;
        let pl = solar.l + lunar.l;
        let pgh = solar.gh + lunar.gh;
        let ph = solar.h + lunar.h;

        let inclp = elements.inclination + pinc;
        let ep = elements.eccentricity + pe;
        let (sinip, cosip) = inclp.sin_cos();
        let mut nodep = elements.raan;
        let mut argpp = elements.argument_of_perigee;
        let mut mp = elements.mean_anomaly;

        if inclp >= LYDDANE_INCLINATION {
            let ph = ph / sinip;
            argpp += pgh - cosip * ph;
            nodep += ph;
            mp += pl;
        } else {
            let (sinop, cosop) = nodep.sin_cos();
            let alfdp = sinip * sinop + (ph * cosop + pinc * cosip * sinop);
            let betdp = sinip * cosop + (-ph * sinop + pinc * cosip * cosop);
            nodep %= TAU;
            if nodep < 0.0 && ops_mode == OpsMode::Afspc {
                nodep += TAU;
            }
            let xls = mp + argpp + cosip * nodep + (pl + pgh - pinc * nodep * sinip);
            let xnoh = nodep;
            nodep = alfdp.atan2(betdp);
            if nodep < 0.0 && ops_mode == OpsMode::Afspc {
                nodep += TAU;
            }
            if (xnoh - nodep).abs() > PI {
                if nodep < xnoh {
                    nodep += TAU;
                } else {
                    nodep -= TAU;
                }
            }
            mp += pl;
            argpp = xls - mp - cosip * nodep;
        }

        AngularElements {
            eccentricity: ep,
            inclination: inclp,
            raan: nodep,
            argument_of_perigee: argpp,
            mean_anomaly: mp,
        }
    }
}

/// Lunar/solar secular rates of the mean elements (per minute)
#[derive(Debug, Clone, Copy)]
pub(crate) struct SecularRates {
    pub dedt: f64,
    pub didt: f64,
    pub dmdt: f64,
    pub dnodt: f64,
    pub domdt: f64,
}

impl SecularRates {
    fn new(geometry: &LunisolarGeometry, inclination: f64) -> Self {
        let s = &geometry.solar;
        let l = &geometry.lunar;
        let emsq = geometry.emsq;
        let sinim = geometry.sin_i;
        let cosim = geometry.cos_i;
        let nodal_terms = !(inclination < NODAL_CUTOFF || inclination > PI - NODAL_CUTOFF);

        let ses = s.s1 * ZNS * s.s5;
        let sis = s.s2 * ZNS * (s.z11 + s.z13);
        let sls = -ZNS * s.s3 * (s.z1 + s.z3 - 14.0 - 6.0 * emsq);
        let sghs = s.s4 * ZNS * (s.z31 + s.z33 - 6.0);
        let mut shs = if nodal_terms {
            -ZNS * s.s2 * (s.z21 + s.z23)
        } else {
            0.0
        };
        if sinim != 0.0 {
            shs /= sinim;
        }
        let sgs = sghs - cosim * shs;

        let sghl = l.s4 * ZNL * (l.z31 + l.z33 - 6.0);
        let shll = if nodal_terms {
            -ZNL * l.s2 * (l.z21 + l.z23)
        } else {
            0.0
        };
        let mut domdt = sgs + sghl;
        let mut dnodt = shs;
        if sinim != 0.0 {
            domdt -= cosim / sinim * shll;
            dnodt += shll / sinim;
        }

        SecularRates {
            dedt: ses + l.s1 * ZNL * l.s5,
            didt: sis + l.s2 * ZNL * (l.z11 + l.z13),
            dmdt: sls - ZNL * l.s3 * (l.z1 + l.z3 - 14.0 - 6.0 * emsq),
            dnodt,
            domdt,
        }
    }

    fn apply(&self, t: f64, elements: AngularElements) -> AngularElements {
        AngularElements {
            eccentricity: elements.eccentricity + self.dedt * t,
            inclination: elements.inclination + self.didt * t,
            raan: elements.raan + self.dnodt * t,
            argument_of_perigee: elements.argument_of_perigee + self.domdt * t,
            mean_anomaly: elements.mean_anomaly + self.dmdt * t,
        }
    }
}

/// Tesseral-harmonic coefficients for each resonance class
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResonanceTerms {
    None,
    /// Synchronous orbits (about one revolution per day)
    OneDay { del1: f64, del2: f64, del3: f64 },
    /// Eccentric half-day orbits (about two revolutions per day)
    HalfDay {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
    },
}

impl ResonanceTerms {
    fn classify(no: f64, eccentricity: f64) -> Resonance {
        if no > ONE_DAY_BAND.0 && no < ONE_DAY_BAND.1 {
            Resonance::OneDay
        } else if no >= HALF_DAY_BAND.0
            && no <= HALF_DAY_BAND.1
            && eccentricity >= HALF_DAY_MIN_ECCENTRICITY
        {
            Resonance::HalfDay
        } else {
            Resonance::None
        }
    }

    fn one_day(no: f64, aonv: f64, emsq: f64, sinim: f64, cosim: f64) -> Self {
        let g200 = 1.0 + emsq * (-2.5 + 0.8125 * emsq);
        let g310 = 1.0 + 2.0 * emsq;
        let g300 = 1.0 + emsq * (-6.0 + 6.60937 * emsq);
        let f220 = 0.75 * (1.0 + cosim) * (1.0 + cosim);
        let f311 = 0.9375 * sinim * sinim * (1.0 + 3.0 * cosim) - 0.75 * (1.0 + cosim);
        let f330 = 1.0 + cosim;
        let f330 = 1.875 * f330 * f330 * f330;
        let del1 = 3.0 * no * no * aonv * aonv;
        ResonanceTerms::OneDay {
            del1: del1 * f311 * g310 * Q31 * aonv,
            del2: 2.0 * del1 * f220 * g200 * Q22,
            del3: 3.0 * del1 * f330 * g300 * Q33 * aonv,
        }
    }

    fn half_day(no: f64, aonv: f64, em: f64, sinim: f64, cosim: f64) -> Self {
        let emsq = em * em;
        let eoc = em * emsq;
        let cosisq = cosim * cosim;

        // Eccentricity functions, fitted piecewise
        let g201 = -0.306 - (em - 0.64) * 0.440;
        let (g211, g310, g322, g410, g422, g520) = if em <= 0.65 {
            (
                3.616 - 13.2470 * em + 16.2900 * emsq,
                -19.302 + 117.3900 * em - 228.4190 * emsq + 156.5910 * eoc,
                -18.9068 + 109.7927 * em - 214.6334 * emsq + 146.5816 * eoc,
                -41.122 + 242.6940 * em - 471.0940 * emsq + 313.9530 * eoc,
                -146.407 + 841.8800 * em - 1629.014 * emsq + 1083.4350 * eoc,
                -532.114 + 3017.977 * em - 5740.032 * emsq + 3708.2760 * eoc,
            )
        } else {
            let g520 = if em > 0.715 {
                -5149.66 + 29936.92 * em - 54087.36 * emsq + 31324.56 * eoc
            } else {
                1464.74 - 4664.75 * em + 3763.64 * emsq
            };
            (
                -72.099 + 331.819 * em - 508.738 * emsq + 266.724 * eoc,
                -346.844 + 1582.851 * em - 2415.925 * emsq + 1246.113 * eoc,
                -342.585 + 1554.908 * em - 2366.899 * emsq + 1215.972 * eoc,
                -1052.797 + 4758.686 * em - 7193.992 * emsq + 3651.957 * eoc,
                -3581.690 + 16178.110 * em - 24462.770 * emsq + 12422.520 * eoc,
                g520,
            )
        };
        let (g533, g521, g532) = if em < 0.7 {
            (
                -919.22770 + 4988.61 * em - 9064.77 * emsq + 5542.21 * eoc,
                -822.71072 + 4568.6173 * em - 8491.4146 * emsq + 5337.524 * eoc,
                -853.66600 + 4690.25 * em - 8624.77 * emsq + 5341.4 * eoc,
            )
        } else {
            (
                -37995.78 + 161616.52 * em - 229838.2 * emsq + 109377.94 * eoc,
                -51752.104 + 218913.95 * em - 309468.16 * emsq + 146349.42 * eoc,
                -40023.88 + 170470.89 * em - 242699.48 * emsq + 115605.82 * eoc,
            )
        };

        // Inclination functions
        let sini2 = sinim * sinim;
        let f220 = 0.75 * (1.0 + 2.0 * cosim + cosisq);
        let f221 = 1.5 * sini2;
        let f321 = 1.875 * sinim * (1.0 - 2.0 * cosim - 3.0 * cosisq);
        let f322 = -1.875 * sinim * (1.0 + 2.0 * cosim - 3.0 * cosisq);
        let f441 = 35.0 * sini2 * f220;
        let f442 = 39.3750 * sini2 * sini2;
        let f522 = 9.84375
            * sinim
            * (sini2 * (1.0 - 2.0 * cosim - 5.0 * cosisq)
                + 0.33333333 * (-2.0 + 4.0 * cosim + 6.0 * cosisq));
        let f523 = sinim
            * (4.92187512 * sini2 * (-2.0 - 4.0 * cosim + 10.0 * cosisq)
                + 6.56250012 * (1.0 + 2.0 * cosim - 3.0 * cosisq));
        let f542 = 29.53125
            * sinim
            * (2.0 - 8.0 * cosim + cosisq * (-12.0 + 8.0 * cosim + 10.0 * cosisq));
        let f543 = 29.53125
            * sinim
            * (-2.0 - 8.0 * cosim + cosisq * (12.0 + 8.0 * cosim - 10.0 * cosisq));

        let mut temp1 = 3.0 * no * no * aonv * aonv;
        let temp = temp1 * ROOT22;
        let (d2201, d2211) = (temp * f220 * g201, temp * f221 * g211);
        temp1 *= aonv;
        let temp = temp1 * ROOT32;
        let (d3210, d3222) = (temp * f321 * g310, temp * f322 * g322);
        temp1 *= aonv;
        let temp = 2.0 * temp1 * ROOT44;
        let (d4410, d4422) = (temp * f441 * g410, temp * f442 * g422);
        temp1 *= aonv;
        let temp = temp1 * ROOT52;
        let (d5220, d5232) = (temp * f522 * g520, temp * f523 * g532);
        let temp = 2.0 * temp1 * ROOT54;
        let (d5421, d5433) = (temp * f542 * g521, temp * f543 * g533);

        ResonanceTerms::HalfDay {
            d2201,
            d2211,
            d3210,
            d3222,
            d4410,
            d4422,
            d5220,
            d5232,
            d5421,
            d5433,
        }
    }

    pub fn class(&self) -> Resonance {
        match self {
            ResonanceTerms::None => Resonance::None,
            ResonanceTerms::OneDay { .. } => Resonance::OneDay,
            ResonanceTerms::HalfDay { .. } => Resonance::HalfDay,
        }
    }
}

/// Last point reached by the resonance integrator.
///
/// `atime` is in minutes since epoch, `xli` is the resonance longitude and
/// `xni` the mean motion there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResonanceState {
    pub atime: f64,
    pub xli: f64,
    pub xni: f64,
}

/// Everything the deep-space theory adds to a satellite record
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeepSpaceTerms {
    pub periodics: LunisolarPeriodics,
    pub rates: SecularRates,
    pub resonance: ResonanceTerms,
    /// Resonance longitude at epoch
    xlamo: f64,
    /// Rate of the resonance longitude less the mean motion
    xfact: f64,
    gsto: f64,
    no_unkozai: f64,
    argpo: f64,
    argpdot: f64,
}

impl DeepSpaceTerms {
    pub fn new(
        tle: &TleRecord,
        epoch: &EpochQuantities,
        near_earth: &NearEarthCoefficients,
        gravity: &GravityConstants,
    ) -> Self {
        let no = epoch.no_unkozai;
        let geometry = LunisolarGeometry::new(tle, no);
        let periodics = LunisolarPeriodics::new(&geometry);
        let rates = SecularRates::new(&geometry, tle.inclination);

        let theta = epoch.gsto % TAU;
        let aonv = (no / gravity.xke).powf(2.0 / 3.0);
        let (resonance, xlamo, xfact) = match ResonanceTerms::classify(no, tle.eccentricity) {
            Resonance::None => (ResonanceTerms::None, 0.0, 0.0),
            Resonance::OneDay => (
                ResonanceTerms::one_day(no, aonv, geometry.emsq, geometry.sin_i, geometry.cos_i),
                (tle.mean_anomaly + tle.raan + tle.argument_of_perigee - theta) % TAU,
                near_earth.mdot + near_earth.argpdot + near_earth.nodedot - RPTIM
                    + rates.dmdt
                    + rates.domdt
                    + rates.dnodt
                    - no,
            ),
            Resonance::HalfDay => (
                ResonanceTerms::half_day(
                    no,
                    aonv,
                    tle.eccentricity,
                    geometry.sin_i,
                    geometry.cos_i,
                ),
                (tle.mean_anomaly + tle.raan + tle.raan - theta - theta) % TAU,
                near_earth.mdot + rates.dmdt + 2.0 * (near_earth.nodedot + rates.dnodt - RPTIM)
                    - no,
            ),
        };

        DeepSpaceTerms {
            periodics,
            rates,
            resonance,
            xlamo,
            xfact,
            gsto: epoch.gsto,
            no_unkozai: no,
            argpo: tle.argument_of_perigee,
            argpdot: near_earth.argpdot,
        }
    }

    /// Integrator state at epoch
    pub fn initial_state(&self) -> ResonanceState {
        ResonanceState {
            atime: 0.0,
            xli: self.xlamo,
            xni: self.no_unkozai,
        }
    }

    /// Rates of the resonance longitude and mean motion at a state:
    /// `(xldot, xndt, xnddt)`.
    fn derivatives(&self, state: &ResonanceState) -> (f64, f64, f64) {
        let xli = state.xli;
        let xldot = state.xni + self.xfact;
        match self.resonance {
            ResonanceTerms::None => (xldot, 0.0, 0.0),
            ResonanceTerms::OneDay { del1, del2, del3 } => {
                let xndt = del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin();
                let xnddt = del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos();
                (xldot, xndt, xnddt * xldot)
            }
            ResonanceTerms::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            } => {
                let xomi = self.argpo + self.argpdot * state.atime;
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                let xndt = d2201 * (x2omi + xli - G22).sin()
                    + d2211 * (xli - G22).sin()
                    + d3210 * (xomi + xli - G32).sin()
                    + d3222 * (-xomi + xli - G32).sin()
                    + d4410 * (x2omi + x2li - G44).sin()
                    + d4422 * (x2li - G44).sin()
                    + d5220 * (xomi + xli - G52).sin()
                    + d5232 * (-xomi + xli - G52).sin()
                    + d5421 * (xomi + x2li - G54).sin()
                    + d5433 * (-xomi + x2li - G54).sin();
                let xnddt = d2201 * (x2omi + xli - G22).cos()
                    + d2211 * (xli - G22).cos()
                    + d3210 * (xomi + xli - G32).cos()
                    + d3222 * (-xomi + xli - G32).cos()
                    + d5220 * (xomi + xli - G52).cos()
                    + d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (d4410 * (x2omi + x2li - G44).cos()
                            + d4422 * (x2li - G44).cos()
                            + d5421 * (xomi + x2li - G54).cos()
                            + d5433 * (-xomi + x2li - G54).cos());
                (xldot, xndt, xnddt * xldot)
            }
        }
    }

    /// Apply the lunar/solar secular drift and, for resonant orbits, advance
    /// the resonance integrator to `t`.
    ///
    /// The integrator restarts from epoch whenever `t` lies on the other
    /// side of epoch from the stored state or closer to epoch than it, so
    /// the result never depends on the order of earlier calls. Returns the
    /// drifted elements and the mean motion at `t`.
    pub fn secular(
        &self,
        t: f64,
        elements: AngularElements,
        state: &mut ResonanceState,
    ) -> (AngularElements, f64) {
        let mut drifted = self.rates.apply(t, elements);
        if let ResonanceTerms::None = self.resonance {
            return (drifted, self.no_unkozai);
        }

        if state.atime == 0.0 || t * state.atime <= 0.0 || t.abs() < state.atime.abs() {
            *state = self.initial_state();
        }

        let delt = if t > 0.0 {
            RESONANCE_STEP_MIN
        } else {
            -RESONANCE_STEP_MIN
        };

        let (xldot, xndt, xnddt) = loop {
            let (xldot, xndt, xnddt) = self.derivatives(state);
            if (t - state.atime).abs() < RESONANCE_STEP_MIN {
                break (xldot, xndt, xnddt);
            }
            state.xli += xldot * delt + xndt * RESONANCE_STEP2;
            state.xni += xndt * delt + xnddt * RESONANCE_STEP2;
            state.atime += delt;
            trace!(
                "resonance step to {} min: xli={:.12} xni={:.12e}",
                state.atime,
                state.xli,
                state.xni
            );
        };

        let ft = t - state.atime;
        let nm = state.xni + xndt * ft + xnddt * ft * ft * 0.5;
        let xl = state.xli + xldot * ft + xndt * ft * ft * 0.5;
        let theta = (self.gsto + t * RPTIM) % TAU;
        drifted.mean_anomaly = match self.resonance {
            ResonanceTerms::OneDay { .. } => {
                xl - drifted.raan - drifted.argument_of_perigee + theta
            }
            _ => xl - 2.0 * drifted.raan + 2.0 * theta,
        };

        (drifted, nm)
    }
}
