//! TEME (True Equator Mean Equinox) to pseudo-Earth-fixed rotation
//!
//! SGP4 produces state vectors in TEME. Rotating about Z by the Greenwich
//! sidereal time gives the pseudo-Earth-fixed frame (PEF), which ignores
//! polar motion and is what a ground track or globe view needs.
//!
//! Reference: AIAA 2006-6753 (Revisiting Spacetrack Report #3)

use nalgebra::{Matrix3, Vector3};

use crate::constants::RPTIM;
use crate::time::{greenwich_sidereal_rate, greenwich_sidereal_time};

/// Rotation matrix about the Z axis (frame rotation by `angle`)
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

fn rotate_to_pef(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    gst: f64,
    rotation_rate: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    let r = rot_z(gst);
    let pos_pef = r * position;
    let omega = Vector3::new(0.0, 0.0, rotation_rate);
    let vel_pef = r * velocity - omega.cross(&pos_pef);
    (pos_pef, vel_pef)
}

/// Transform TEME position (km) and velocity (km/s) to PEF.
///
/// `gst` is the Greenwich sidereal time in radians. The velocity is
/// corrected for the nominal rotation rate of the Earth.
pub fn teme_to_pef(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    gst: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    rotate_to_pef(position, velocity, gst, RPTIM / 60.0)
}

/// Transform TEME to PEF at a UT1 Julian date, using the IAU-82 sidereal
/// time and its rate at that date.
pub fn teme_to_pef_at(
    jd_ut1: f64,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    rotate_to_pef(
        position,
        velocity,
        greenwich_sidereal_time(jd_ut1),
        greenwich_sidereal_rate(jd_ut1),
    )
}
