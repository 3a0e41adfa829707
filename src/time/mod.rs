//! Julian dates, calendar conversion, and Greenwich sidereal time
//!
//! The TLE epoch arrives as a two-digit year plus fractional day of year;
//! these helpers turn it into a Julian date and back, and compute the
//! Greenwich Mean Sidereal Time used to place TEME vectors in an
//! Earth-fixed frame.
//!
//! Julian dates are often carried as a `(whole, fraction)` pair so that the
//! fraction of the day keeps its full precision.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::constants::{DAY_S, DEG2RAD, J2000, TAU};

/// Days in each month of a common year
const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Convert a Gregorian calendar date and time to a Julian date.
///
/// Valid for dates between 1900 March 1 and 2100 February 28.
pub fn julian_date(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: f64) -> f64 {
    let (whole, fraction) = julian_date_split(year, month, day, hour, minute, second);
    whole + fraction
}

/// Convert a calendar date and time to a Julian date split into the
/// midnight Julian date and the fraction of the day.
pub fn julian_date_split(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
) -> (f64, f64) {
    let year = year as f64;
    let month = month as f64;
    let mut whole = 367.0 * year - ((7.0 * (year + ((month + 9.0) / 12.0).floor())) * 0.25).floor()
        + (275.0 * month / 9.0).floor()
        + day as f64
        + 1721013.5;
    let mut fraction = (second + minute as f64 * 60.0 + hour as f64 * 3600.0) / DAY_S;

    // Fold whole days out of the fraction
    if fraction.abs() > 1.0 {
        let days = fraction.floor();
        whole += days;
        fraction -= days;
    }

    (whole, fraction)
}

/// Whether `year` is a leap year for TLE epoch purposes (valid 1901-2099).
fn is_leap_year(year: i32) -> bool {
    year % 4 == 0
}

/// Convert a fractional day of year into month, day, hour, minute, second.
///
/// `days` is 1-based: `1.5` is noon on January 1.
pub fn days_to_mdhms(year: i32, days: f64) -> (u32, u32, u32, u32, f64) {
    let mut lengths = MONTH_LENGTHS;
    if is_leap_year(year) {
        lengths[1] = 29;
    }

    let day_of_year = days.floor() as u32;
    let mut month = 1;
    let mut elapsed = 0;
    while month < 12 && day_of_year > elapsed + lengths[month - 1] {
        elapsed += lengths[month - 1];
        month += 1;
    }
    let day = day_of_year - elapsed;

    let hours = (days - days.floor()) * 24.0;
    let hour = hours.floor();
    let minutes = (hours - hour) * 60.0;
    let minute = minutes.floor();
    let second = (minutes - minute) * 60.0;

    (month as u32, day, hour as u32, minute as u32, second)
}

/// Convert a Julian day number to a proleptic Gregorian (year, month, day).
///
/// See the Explanatory Supplement to the Astronomical Almanac 15.11.
fn calendar_date(jd_integer: i64) -> (i32, u32, u32) {
    let f = jd_integer + 1401 + ((4 * jd_integer + 274277) / 146097 * 3 / 4 - 38);
    let e = 4 * f + 3;
    let g = (e % 1461) / 4;
    let h = 5 * g + 2;
    let day = (h % 153) / 5 + 1;
    let month = (h / 153 + 2) % 12 + 1;
    let year = e / 1461 - 4716 + (12 + 2 - month) / 12;

    (year as i32, month as u32, day as u32)
}

/// Convert a Julian date to (year, month, day, hour, minute, second).
pub fn calendar_from_julian_date(jd: f64) -> (i32, u32, u32, u32, u32, f64) {
    let shifted = jd + 0.5;
    let day_number = shifted.floor();
    let (year, month, day) = calendar_date(day_number as i64);

    let seconds = (shifted - day_number) * DAY_S;
    let hour = (seconds / 3600.0).floor();
    let minute = ((seconds - hour * 3600.0) / 60.0).floor();
    let second = seconds - hour * 3600.0 - minute * 60.0;

    (year, month, day, hour as u32, minute as u32, second)
}

/// Convert a `chrono` timestamp (taken as UTC) to a split Julian date.
pub fn julian_date_from_datetime(dt: &NaiveDateTime) -> (f64, f64) {
    let second = dt.second() as f64 + dt.nanosecond() as f64 / 1e9;
    julian_date_split(dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute(), second)
}

/// Convert a split Julian date to a `chrono` timestamp.
///
/// Returns `None` if the date falls outside the range `chrono` represents.
pub fn datetime_from_julian_date(jd_whole: f64, jd_fraction: f64) -> Option<NaiveDateTime> {
    let (year, month, day, hour, minute, second) =
        calendar_from_julian_date(jd_whole + jd_fraction);
    let whole_seconds = second.floor();
    let nanos = ((second - whole_seconds) * 1e9).round().min(999_999_999.0) as u32;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(
        hour,
        minute,
        whole_seconds as u32,
        nanos,
    )
}

/// Greenwich Mean Sidereal Time (IAU-82) in radians, in `[0, 2π)`.
///
/// # Arguments
/// * `jd_ut1` - UT1 Julian date
pub fn greenwich_sidereal_time(jd_ut1: f64) -> f64 {
    let t = (jd_ut1 - J2000) / 36525.0;

    // GMST polynomial in seconds of time
    let seconds = -6.2e-6 * t * t * t
        + 0.093104 * t * t
        + (876600.0 * 3600.0 + 8640184.812866) * t
        + 67310.54841;

    // 360 degrees per 86400 seconds, i.e. 1/240 degree per second
    (seconds * DEG2RAD / 240.0).rem_euclid(TAU)
}

/// Rate of change of Greenwich Mean Sidereal Time in radians per second.
///
/// This is the derivative of the polynomial in [`greenwich_sidereal_time`],
/// i.e. the Earth's rotation rate relative to the mean equinox.
pub fn greenwich_sidereal_rate(jd_ut1: f64) -> f64 {
    let t = (jd_ut1 - J2000) / 36525.0;
    let seconds_per_century =
        (876600.0 * 3600.0 + 8640184.812866) + 2.0 * 0.093104 * t - 3.0 * 6.2e-6 * t * t;
    seconds_per_century * DEG2RAD / 240.0 / 36525.0 / DAY_S
}

/// Greenwich sidereal time as computed by legacy operational SGP4 code.
///
/// # Arguments
/// * `epoch_1950` - days since 1950 January 0.0 UTC
pub fn greenwich_sidereal_time_afspc(epoch_1950: f64) -> f64 {
    const C1: f64 = 1.72027916940703639e-2;
    const THGR70: f64 = 1.7321343856509374;
    const FK5R: f64 = 5.07551419432269442e-15;

    let ts70 = epoch_1950 - 7305.0;
    let ds70 = (ts70 + 1.0e-8).floor();
    let tfrac = ts70 - ds70;
    let c1p2p = C1 + TAU;

    (THGR70 + C1 * ds70 + c1p2p * tfrac + ts70 * ts70 * FK5R).rem_euclid(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_julian_date_j2000() {
        assert_eq!(julian_date(2000, 1, 1, 12, 0, 0.0), 2451545.0);
        assert_eq!(julian_date_split(2000, 1, 1, 12, 0, 0.0), (2451544.5, 0.5));
    }

    #[test]
    fn test_julian_date_known_days() {
        assert_eq!(julian_date(2020, 1, 1, 0, 0, 0.0), 2458849.5);
        assert_eq!(julian_date(1969, 7, 20, 0, 0, 0.0), 2440422.5);
        assert_eq!(julian_date(1957, 10, 4, 0, 0, 0.0), 2436115.5);
    }

    #[test]
    fn test_days_to_mdhms_leap_year() {
        // 2000 day 179.78495062 = June 27, 18:50:19.73 UTC
        let (month, day, hour, minute, second) = days_to_mdhms(2000, 179.78495062);
        assert_eq!((month, day, hour, minute), (6, 27, 18, 50));
        assert_relative_eq!(second, 19.733568, epsilon = 1e-4);
    }

    #[test]
    fn test_days_to_mdhms_common_year() {
        assert_eq!(days_to_mdhms(2006, 60.0).0, 3);
        assert_eq!(days_to_mdhms(2006, 60.0).1, 1);
        assert_eq!(days_to_mdhms(2004, 60.0).0, 2);
        assert_eq!(days_to_mdhms(2004, 60.0).1, 29);
        assert_eq!(days_to_mdhms(2006, 365.5).0, 12);
        assert_eq!(days_to_mdhms(2006, 365.5).1, 31);
    }

    #[test]
    fn test_tle_epoch_julian_date() {
        let (month, day, hour, minute, second) = days_to_mdhms(2000, 179.78495062);
        let jd = julian_date(2000, month, day, hour, minute, second);
        assert_relative_eq!(jd, 2451723.28495062, epsilon = 1e-8);
    }

    #[test]
    fn test_calendar_round_trip() {
        let jd = julian_date(2024, 2, 29, 6, 30, 15.25);
        let (year, month, day, hour, minute, second) = calendar_from_julian_date(jd);
        assert_eq!((year, month, day, hour, minute), (2024, 2, 29, 6, 30));
        assert_relative_eq!(second, 15.25, epsilon = 1e-3);
    }

    #[test]
    fn test_chrono_conversion() {
        let dt = NaiveDate::from_ymd_opt(2008, 9, 20)
            .unwrap()
            .and_hms_opt(12, 25, 40)
            .unwrap();
        let (whole, fraction) = julian_date_from_datetime(&dt);
        assert_eq!(whole, 2454729.5);
        assert_relative_eq!(fraction, (12.0 * 3600.0 + 25.0 * 60.0 + 40.0) / DAY_S);

        let back = datetime_from_julian_date(whole, fraction).unwrap();
        assert_eq!(back.date(), dt.date());
        assert_eq!(back.hour(), 12);
        assert_eq!(back.minute(), 25);
    }

    #[test]
    fn test_gmst_at_j2000() {
        let theta = greenwich_sidereal_time(J2000);
        // 67310.54841 s / 240 = 280.460618375 degrees
        assert_relative_eq!(theta.to_degrees(), 280.460618375, epsilon = 1e-8);
    }

    #[test]
    fn test_gmst_in_range() {
        for i in 0..100 {
            let theta = greenwich_sidereal_time(2440000.0 + i as f64 * 123.456);
            assert!((0.0..TAU).contains(&theta));
        }
    }

    #[test]
    fn test_gmst_advances_one_sidereal_day() {
        // Over one solar day GMST gains about 0.9856 degrees
        let a = greenwich_sidereal_time(2451545.0);
        let b = greenwich_sidereal_time(2451546.0);
        let gain = (b - a).rem_euclid(TAU).to_degrees();
        assert_relative_eq!(gain, 0.9856, epsilon = 1e-3);
    }

    #[test]
    fn test_sidereal_rate() {
        assert_relative_eq!(greenwich_sidereal_rate(J2000), 7.292115e-5, epsilon = 1e-10);
    }

    #[test]
    fn test_afspc_gmst_close_to_iau82() {
        // 2000 June 27 as days since 1950 January 0
        let jd = 2451723.28495062;
        let a = greenwich_sidereal_time(jd);
        let b = greenwich_sidereal_time_afspc(jd - crate::constants::JD_1950);
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }
}
