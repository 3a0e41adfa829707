//! Satellite tracking example using SGP4
//!
//! Parses one TLE, prints TEME state vectors over a span of time and the
//! Earth-fixed (PEF) position that a globe view would plot.
//!
//! Run with: cargo run --example satellite_tracking

use sattrack::sgp4lib::{teme_to_pef_at, SatelliteRecord, Sgp4Options};
use sattrack::time::datetime_from_julian_date;
use sattrack::tlelib::parse_tle_strict;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // ISS TLE (from September 2008)
    // In a real application, you would fetch this from Celestrak or Space-Track
    let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    let tle = parse_tle_strict(line1, line2)?;
    let mut iss = SatelliteRecord::new(&tle, Sgp4Options::default());

    println!("=== Satellite Tracking Example ===\n");
    println!("NORAD ID:   {}", tle.catalog_number);
    println!("Elements:   {}", tle);
    println!("Orbits/day: {:.2}", tle.revs_per_day());
    println!("Period:     {:.1} minutes", iss.period_minutes());
    println!("Method:     {}", iss.method());
    let radius = iss.gravity().radius_earth_km;
    println!(
        "Perigee/apogee: {:.1} / {:.1} km",
        iss.perigee_altitude() * radius,
        iss.apogee_altitude() * radius
    );
    println!();

    println!(
        "{:>8} {:>20} {:>12} {:>12} {:>12} {:>10} {:>9} {:>9}",
        "min", "UTC", "x (km)", "y (km)", "z (km)", "|v| km/s", "PEF lon", "PEF lat"
    );

    for step in 0..=12 {
        let minutes = step as f64 * 10.0;
        let state = iss.propagate(minutes);
        let (position, velocity) = state.into_result()?;

        let jd_fraction = tle.epoch_jd_fraction + minutes / 1440.0;
        let (pef, _) = teme_to_pef_at(tle.epoch_jd + jd_fraction, &position, &velocity);
        let longitude = pef.y.atan2(pef.x).to_degrees();
        let latitude = (pef.z / pef.norm()).asin().to_degrees();

        let utc = datetime_from_julian_date(tle.epoch_jd, jd_fraction)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!(
            "{:>8.1} {:>20} {:>12.3} {:>12.3} {:>12.3} {:>10.4} {:>9.3} {:>9.3}",
            minutes,
            utc,
            position.x,
            position.y,
            position.z,
            velocity.norm(),
            longitude,
            latitude
        );
    }

    Ok(())
}
