//! Propagator regression tests against the standard SGP4 verification set
//! (AIAA 2006-6753), plus behavioral checks at the model's thresholds.

use super::*;
use crate::constants::{DEG2RAD, XPDOTP};
use crate::tlelib::parse_tle;
use approx::{assert_abs_diff_eq, assert_relative_eq};

const VANGUARD_LINE1: &str =
    "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
const VANGUARD_LINE2: &str =
    "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

const MOLNIYA_LINE1: &str =
    "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813";
const MOLNIYA_LINE2: &str =
    "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656";

const GEO_LINE1: &str =
    "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190";
const GEO_LINE2: &str =
    "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4891";

const ISS_LINE1: &str =
    "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
const ISS_LINE2: &str =
    "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

fn record(line1: &str, line2: &str) -> SatelliteRecord {
    SatelliteRecord::new(&parse_tle(line1, line2), Sgp4Options::default())
}

fn iss_with(modify: impl FnOnce(&mut TleRecord)) -> SatelliteRecord {
    let mut tle = parse_tle(ISS_LINE1, ISS_LINE2);
    modify(&mut tle);
    SatelliteRecord::new(&tle, Sgp4Options::default())
}

fn assert_state(result: &PropagationResult, position: [f64; 3], velocity: [f64; 3]) {
    assert_eq!(result.error, ErrorCode::None);
    for i in 0..3 {
        assert_abs_diff_eq!(result.position[i], position[i], epsilon = 1e-6);
        assert_abs_diff_eq!(result.velocity[i], velocity[i], epsilon = 1e-8);
    }
}

/// Difference of two angles folded into (-π, π]
fn angle_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

#[test]
fn test_vanguard_reference_vectors() {
    let mut sat = record(VANGUARD_LINE1, VANGUARD_LINE2);
    assert_eq!(sat.method(), Method::NearEarth);
    assert_eq!(sat.error(), ErrorCode::None);

    assert_state(
        &sat.propagate(0.0),
        [7022.465292664065, -1400.0829675535551, 0.03995155416514583],
        [1.8938410145129514, 6.405893759209842, 4.534807250354738],
    );
    assert_state(
        &sat.propagate(360.0),
        [-7154.031202015245, -3783.176825036972, -3536.1941229424187],
        [4.741887408996559, -4.15181776537348, -2.0939354249071664],
    );
    assert_state(
        &sat.propagate(720.0),
        [-7134.593401193214, 6531.686413336449, 3260.2718648255714],
        [-4.113793027161286, -2.9119220386229627, -2.5573278509305486],
    );
    assert_state(
        &sat.propagate(1440.0),
        [-938.5592394292928, -6268.187488313945, -4294.029247511623],
        [7.53610520925609, -0.42712770712347303, 0.9898780795591832],
    );
}

#[test]
fn test_vanguard_derived_quantities() {
    let sat = record(VANGUARD_LINE1, VANGUARD_LINE2);
    assert_relative_eq!(sat.no_unkozai(), 0.04720630155917529, epsilon = 1e-14);
    assert_relative_eq!(sat.semi_major_axis(), 1.3538998206027828, epsilon = 1e-12);
    assert_relative_eq!(sat.gsto(), 3.4691723423794016, epsilon = 1e-10);
    assert_relative_eq!(sat.cc1(), 9.531093269423194e-12, max_relative = 1e-9);
    assert_eq!(sat.perigee_regime(), PerigeeRegime::Standard);
    assert!(!sat.is_simplified());
    assert_eq!(sat.resonance(), Resonance::None);
    assert!(sat.perigee_altitude() < sat.apogee_altitude());
    assert_relative_eq!(
        sat.perigee_altitude() * sat.gravity().radius_earth_km,
        651.3322048254029,
        epsilon = 1e-6
    );
}

#[test]
fn test_molniya_reference_vectors() {
    let mut sat = record(MOLNIYA_LINE1, MOLNIYA_LINE2);
    assert_eq!(sat.method(), Method::DeepSpace);
    assert_eq!(sat.resonance(), Resonance::HalfDay);
    assert!(sat.is_simplified());

    assert_state(
        &sat.propagate(0.0),
        [2349.8948335005193, -14785.938115615325, 0.021193784148377418],
        [2.7214880955588243, -3.256811654658782, 4.498416672371417],
    );
    assert_state(
        &sat.propagate(120.0),
        [15223.917136582058, -17852.958817127146, 25280.395582242327],
        [1.0790417322899628, 0.8751873723849997, 2.485682812742269],
    );
    assert_state(
        &sat.propagate(2880.0),
        [3417.2093158646835, -16038.79510665307, 1894.749340577874],
        [2.5855158640604436, -2.596818145614585, 4.456882556194725],
    );
    assert_state(
        &sat.propagate(2760.0),
        [2776.3057426004325, 18156.985384510423, 11425.73046480594],
        [-1.9206321993110538, -0.8203707332442405, -4.181839231838337],
    );
}

#[test]
fn test_geosynchronous_reference_vectors() {
    let mut sat = record(GEO_LINE1, GEO_LINE2);
    assert_eq!(sat.method(), Method::DeepSpace);
    assert_eq!(sat.resonance(), Resonance::OneDay);

    assert_state(
        &sat.propagate(0.0),
        [42080.718522126015, -2646.863874356958, 0.8185129391349583],
        [0.19310517736662705, 3.0686882505727078, 0.00043844943148658],
    );
    assert_state(
        &sat.propagate(120.0),
        [37740.000855932245, 18802.768728017032, 3.455125837301504],
        [-1.3710352059677975, 2.7521059321041683, 0.000336882823892016],
    );
    assert_state(
        &sat.propagate(1440.0),
        [42119.962634985925, -1925.7756726303116, -0.19827433154274948],
        [0.14052120636718696, 3.071541613467431, 0.00017956116681551576],
    );
    assert_state(
        &sat.propagate(4320.0),
        [42161.3338529459, -485.7763922987801, 2.1054280160880494],
        [0.03551283238803369, 3.0745416671615278, -0.00025878415421734264],
    );
    assert_state(
        &sat.propagate(-1440.0),
        [42029.051134372115, -3368.1599081946506, 2.9572556565136208],
        [0.245704559069989, 3.0649289556918617, 0.0006622267925960434],
    );
}

#[test]
fn test_gravity_model_changes_result() {
    let tle = parse_tle(ISS_LINE1, ISS_LINE2);
    let mut wgs72 = SatelliteRecord::new(&tle, Sgp4Options::default());
    let mut wgs84 = SatelliteRecord::new(
        &tle,
        Sgp4Options {
            gravity: GravityModel::Wgs84,
            ..Default::default()
        },
    );

    let a = wgs72.propagate(60.0).position;
    let b = wgs84.propagate(60.0).position;
    assert_abs_diff_eq!(a.x, -4133.794277857076, epsilon = 1e-5);
    assert_abs_diff_eq!(b.x, -4133.7798451227845, epsilon = 1e-5);
    assert!((a - b).norm() > 1e-3);
}

#[test]
fn test_afspc_mode_changes_only_sidereal_time_near_earth() {
    let tle = parse_tle(ISS_LINE1, ISS_LINE2);
    let mut improved = SatelliteRecord::new(&tle, Sgp4Options::default());
    let mut afspc = SatelliteRecord::new(
        &tle,
        Sgp4Options {
            ops_mode: OpsMode::Afspc,
            ..Default::default()
        },
    );

    assert_relative_eq!(improved.gsto(), 3.2494915806279465, epsilon = 1e-10);
    assert_relative_eq!(afspc.gsto(), improved.gsto(), epsilon = 1e-6);
    assert_relative_eq!(
        improved.propagate(60.0).position,
        afspc.propagate(60.0).position,
        epsilon = 1e-9
    );
}

#[test]
fn test_epoch_reproduces_mean_elements() {
    for (line1, line2) in [
        (VANGUARD_LINE1, VANGUARD_LINE2),
        (ISS_LINE1, ISS_LINE2),
        (GEO_LINE1, GEO_LINE2),
    ] {
        let tle = parse_tle(line1, line2);
        let mut sat = SatelliteRecord::new(&tle, Sgp4Options::default());
        let mean = sat.propagate(0.0).mean_elements.unwrap();

        assert_relative_eq!(mean.eccentricity, tle.eccentricity, max_relative = 1e-8);
        assert_relative_eq!(mean.inclination, tle.inclination, epsilon = 1e-12);
        assert_relative_eq!(mean.mean_motion, sat.no_unkozai(), max_relative = 1e-8);
        assert_abs_diff_eq!(angle_difference(mean.raan, tle.raan), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(
            angle_difference(mean.argument_of_perigee, tle.argument_of_perigee),
            0.0,
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(
            angle_difference(mean.mean_anomaly, tle.mean_anomaly),
            0.0,
            epsilon = 1e-10
        );
    }
}

#[test]
fn test_vanguard_mean_anomaly_wraps_negative() {
    let mut sat = record(VANGUARD_LINE1, VANGUARD_LINE2);
    let mean = sat.propagate(0.0).mean_elements.unwrap();
    assert_relative_eq!(mean.mean_anomaly, -5.945875994622154, epsilon = 1e-10);
    assert_relative_eq!(mean.raan, 6.08638547138321, epsilon = 1e-12);
}

#[test]
fn test_repeated_calls_are_identical() {
    for (line1, line2) in [
        (ISS_LINE1, ISS_LINE2),
        (MOLNIYA_LINE1, MOLNIYA_LINE2),
        (GEO_LINE1, GEO_LINE2),
    ] {
        let mut sat = record(line1, line2);
        let first = sat.propagate(5000.0);
        let second = sat.propagate(5000.0);
        assert_eq!(first, second);
    }
}

#[test]
fn test_resonant_results_do_not_depend_on_call_order() {
    let times = [100.0, 2000.0, 5000.0, -3000.0, 7000.0, 1500.0];
    for (line1, line2) in [(MOLNIYA_LINE1, MOLNIYA_LINE2), (GEO_LINE1, GEO_LINE2)] {
        let mut sequential = record(line1, line2);
        for &t in &times {
            let path = sequential.propagate(t);
            let fresh = record(line1, line2).propagate(t);
            assert_relative_eq!(path.position, fresh.position, epsilon = 1e-9);
            assert_relative_eq!(path.velocity, fresh.velocity, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_deep_space_boundary_at_225_minutes() {
    let near = iss_with(|tle| tle.mean_motion = 0.027938640120406213);
    let deep = iss_with(|tle| tle.mean_motion = 0.027913815675560935);

    assert_relative_eq!(near.period_minutes(), 224.9, epsilon = 1e-6);
    assert_relative_eq!(deep.period_minutes(), 225.1, epsilon = 1e-6);
    assert_eq!(near.method(), Method::NearEarth);
    assert_eq!(deep.method(), Method::DeepSpace);
    assert_eq!(near.method().to_string(), "n");
    assert_eq!(deep.method().to_string(), "d");
}

#[test]
fn test_perigee_regimes_at_thresholds() {
    let perigee_km = |sat: &SatelliteRecord| sat.perigee_altitude() * sat.gravity().radius_earth_km;
    let below = iss_with(|tle| {
        tle.eccentricity = 0.01;
        tle.mean_motion = 0.07065649955118078;
    });
    let above = iss_with(|tle| {
        tle.eccentricity = 0.01;
        tle.mean_motion = 0.0706532550828505;
    });

    assert_relative_eq!(perigee_km(&below), 155.9, epsilon = 1e-6);
    assert_relative_eq!(perigee_km(&above), 156.1, epsilon = 1e-6);
    assert_eq!(below.perigee_regime(), PerigeeRegime::Low);
    assert_eq!(above.perigee_regime(), PerigeeRegime::Standard);
    assert!(below.is_simplified());
    assert_relative_eq!(below.cc1(), -1.951864129123441e-08, max_relative = 1e-6);
    assert_relative_eq!(above.cc1(), -1.9247390124742478e-08, max_relative = 1e-6);
    assert!((below.cc1() - above.cc1()).abs() > 1e-10);

    let very_low = iss_with(|tle| {
        tle.eccentricity = 0.01;
        tle.mean_motion = 0.07160798327972029;
    });
    let low = iss_with(|tle| {
        tle.eccentricity = 0.01;
        tle.mean_motion = 0.07160466566298865;
    });
    assert_eq!(very_low.perigee_regime(), PerigeeRegime::VeryLow);
    assert_eq!(low.perigee_regime(), PerigeeRegime::Low);
}

#[test]
fn test_decay_is_reported() {
    let mut sat = iss_with(|tle| {
        tle.inclination = 90.0 * DEG2RAD;
        tle.eccentricity = 1.0e-4;
        tle.mean_motion = 16.2 / XPDOTP;
        tle.bstar = 0.01;
    });
    assert_eq!(sat.error(), ErrorCode::None);

    let first_failure = (0..5000)
        .map(|minute| (minute, sat.propagate(minute as f64)))
        .find(|(_, result)| !result.is_ok());
    let (minute, result) = first_failure.unwrap();
    assert_eq!(result.error, ErrorCode::Decayed);
    assert_eq!(result.error.code(), 6);
    assert!((2690..=2705).contains(&minute));
    // Decayed still reports the computed state
    assert!(result.position.norm() > 6000.0);
    assert!(result.position.norm() < sat.gravity().radius_earth_km);

    let below_surface = (0..5000)
        .find(|&minute| {
            let mean = sat.propagate(minute as f64).mean_elements.unwrap();
            mean.semi_major_axis < 1.0
        })
        .unwrap();
    assert!((3095..=3105).contains(&below_surface));

    for minute in below_surface..100_000 {
        let result = sat.propagate(minute as f64);
        assert_eq!(result.error, ErrorCode::Decayed, "at {} min", minute);
        assert!(result.position.norm() > 0.0);
    }
}

#[test]
fn test_mean_eccentricity_out_of_range() {
    let mut sat = iss_with(|tle| {
        tle.bstar = 2.0;
        tle.eccentricity = 0.1;
        tle.mean_motion = 14.0 / XPDOTP;
    });
    assert!(sat.propagate(80.0).is_ok());

    let result = sat.propagate(200.0);
    assert_eq!(result.error, ErrorCode::MeanEccentricityOutOfRange);
    assert_eq!(result.error.code(), 1);
    assert_eq!(result.position, Vector3::zeros());
    assert_eq!(result.velocity, Vector3::zeros());
    assert!(result.mean_elements.is_none());
}

#[test]
fn test_negative_semi_latus_rectum() {
    let mut sat = iss_with(|tle| tle.bstar = -0.5);
    let result = sat.propagate(1340.0);
    assert_eq!(result.error, ErrorCode::SemiLatusRectumBelowZero);
    assert_eq!(result.error.code(), 4);
    assert_eq!(result.position, Vector3::zeros());
    assert!(result.mean_elements.is_some());

    match result.into_result() {
        Err(SattrackError::Propagation(code)) => {
            assert_eq!(code, ErrorCode::SemiLatusRectumBelowZero)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_mean_motion_below_zero() {
    let mut sat = record(GEO_LINE1, GEO_LINE2);
    assert_eq!(sat.resonance(), Resonance::OneDay);
    sat.resonance_state = ResonanceState {
        atime: 720.0,
        xli: sat.resonance_state.xli,
        xni: -1.0,
    };

    let result = sat.propagate(800.0);
    assert_eq!(result.error, ErrorCode::MeanMotionBelowZero);
    assert_eq!(result.error.code(), 2);
    assert_eq!(result.position, Vector3::zeros());
    assert_eq!(result.velocity, Vector3::zeros());
    assert!(result.mean_elements.is_none());
}

#[test]
fn test_perturbed_eccentricity_out_of_range() {
    // Periodics fitted to the Molniya eccentricity pull e down by ~5.9e-4,
    // more than a near-circular mean eccentricity can absorb
    let mut sat = record(MOLNIYA_LINE1, MOLNIYA_LINE2);
    sat.tle.eccentricity = 1.0e-4;

    let result = sat.propagate(0.0);
    assert_eq!(result.error, ErrorCode::PerturbedEccentricityOutOfRange);
    assert_eq!(result.error.code(), 3);
    assert_eq!(result.position, Vector3::zeros());
    assert_eq!(result.velocity, Vector3::zeros());
    let mean = result.mean_elements.unwrap();
    assert_relative_eq!(mean.eccentricity, 1.0e-4, epsilon = 1e-15);

    sat.tle.eccentricity = parse_tle(MOLNIYA_LINE1, MOLNIYA_LINE2).eccentricity;
    assert!(sat.propagate(0.0).is_ok());
}

#[test]
fn test_kepler_uses_iterate_before_last_correction() {
    // Converged: the final correction is below tolerance
    let (sin_e, cos_e) = solve_kepler(3.0, 0.5, 0.2);
    assert_relative_eq!(sin_e, -0.038831158904792905, epsilon = 1e-12);
    assert_relative_eq!(cos_e, -0.9992457861297743, epsilon = 1e-12);

    // Near-parabolic: ten iterations run out while the step is still ~5e-3
    let (sin_e, cos_e) = solve_kepler(1.0e-5, 0.9999999, 0.0);
    assert_relative_eq!(sin_e, 0.044717261148657754, epsilon = 1e-9);
    assert_relative_eq!(cos_e, 0.9989996829605917, epsilon = 1e-9);
    assert!((sin_e - 0.0398133086717077_f64.sin()).abs() > 1e-3);
}

#[test]
fn test_initialization_keeps_epoch_error() {
    let mut tle = parse_tle(MOLNIYA_LINE1, MOLNIYA_LINE2);
    tle.eccentricity = 0.99999;
    let sat = SatelliteRecord::new(&tle, Sgp4Options::default());
    assert_eq!(sat.method(), Method::DeepSpace);
    assert_eq!(sat.error(), ErrorCode::SemiLatusRectumBelowZero);
}

#[test]
fn test_error_codes() {
    let codes: Vec<u8> = [
        ErrorCode::None,
        ErrorCode::MeanEccentricityOutOfRange,
        ErrorCode::MeanMotionBelowZero,
        ErrorCode::PerturbedEccentricityOutOfRange,
        ErrorCode::SemiLatusRectumBelowZero,
        ErrorCode::Decayed,
    ]
    .iter()
    .map(ErrorCode::code)
    .collect();
    assert_eq!(codes, vec![0, 1, 2, 3, 4, 6]);
    assert_eq!(ErrorCode::Decayed.to_string(), "satellite has decayed");
}

#[test]
fn test_julian_date_entry_points_agree() {
    let mut sat = record(ISS_LINE1, ISS_LINE2);
    let tle = sat.tle().clone();

    let at_epoch = sat.propagate_jd(tle.epoch_jd, tle.epoch_jd_fraction);
    assert_eq!(at_epoch, sat.propagate(0.0));

    let later = sat.propagate_jd(tle.epoch_jd + 1.0, tle.epoch_jd_fraction);
    assert_relative_eq!(later.position, sat.propagate(1440.0).position, epsilon = 1e-9);

    let datetime = tle.epoch_datetime().unwrap() + chrono::Duration::minutes(90);
    let by_datetime = sat.propagate_datetime(&datetime);
    assert_relative_eq!(by_datetime.position, sat.propagate(90.0).position, epsilon = 1e-2);
}

#[test]
fn test_from_lines_validates() {
    assert!(SatelliteRecord::from_lines(ISS_LINE1, ISS_LINE2, Sgp4Options::default()).is_ok());

    let corrupted = ISS_LINE2.replace("51.6416", "51.6417");
    assert!(matches!(
        SatelliteRecord::from_lines(ISS_LINE1, &corrupted, Sgp4Options::default()),
        Err(SattrackError::Checksum { line: 2, .. })
    ));
}

#[test]
fn test_into_result_ok() {
    let mut sat = record(ISS_LINE1, ISS_LINE2);
    let (position, velocity) = sat.propagate(30.0).into_result().unwrap();
    assert!(position.norm() > 6600.0 && position.norm() < 6800.0);
    assert!(velocity.norm() > 7.5 && velocity.norm() < 7.8);
}
