//! Two-Line Element set parsing
//!
//! TLE lines are fixed-width records. [`parse_tle`] reads them purely by
//! column position and never fails: a blank numeric field reads as zero and
//! an unreadable one as NaN, so garbage in produces garbage out rather than
//! an error. Use [`parse_tle_strict`] at a boundary where input should be
//! validated first.
//!
//! # Example
//!
//! ```
//! use sattrack::tlelib::parse_tle;
//!
//! let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
//! let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
//!
//! let tle = parse_tle(line1, line2);
//! assert_eq!(tle.catalog_number, "25544");
//! assert_eq!(tle.epoch_year, 2008);
//! ```

use std::fmt;
use std::ops::Range;

use chrono::NaiveDateTime;
use log::warn;

use crate::constants::{DEG2RAD, JD_1950, MINUTES_PER_DAY, XPDOTP};
use crate::time::{datetime_from_julian_date, days_to_mdhms, julian_date_split};
use crate::{Result, SattrackError};

/// Minimum length of a well-formed TLE line, including the checksum column
pub const TLE_LINE_LENGTH: usize = 69;

/// Mean orbital elements read from one Two-Line Element set.
///
/// Angles are in radians and mean motion in radians per minute. The record
/// is created once by the parser and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct TleRecord {
    /// NORAD catalog number as written in the TLE (may be alpha-5)
    pub catalog_number: String,
    /// Security classification (`U`, `C` or `S`)
    pub classification: char,
    /// International designator (launch year, number, piece)
    pub international_designator: String,
    /// Four-digit epoch year
    pub epoch_year: i32,
    /// Fractional day of year of the epoch (1-based)
    pub epoch_days: f64,
    /// Julian date of the epoch, midnight part
    pub epoch_jd: f64,
    /// Julian date of the epoch, fraction of day
    pub epoch_jd_fraction: f64,
    /// First derivative of mean motion (rad/min²)
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion (rad/min³)
    pub mean_motion_ddot: f64,
    /// B* drag term (inverse Earth radii)
    pub bstar: f64,
    /// Ephemeris type column (normally `0`)
    pub ephemeris_type: char,
    /// Element set number
    pub element_number: u32,
    /// Inclination (rad)
    pub inclination: f64,
    /// Right ascension of the ascending node (rad)
    pub raan: f64,
    /// Eccentricity
    pub eccentricity: f64,
    /// Argument of perigee (rad)
    pub argument_of_perigee: f64,
    /// Mean anomaly (rad)
    pub mean_anomaly: f64,
    /// Kozai mean motion (rad/min)
    pub mean_motion: f64,
    /// Revolution number at epoch
    pub revolution_number: u32,
}

impl TleRecord {
    /// Epoch as a single Julian date
    pub fn epoch_julian_date(&self) -> f64 {
        self.epoch_jd + self.epoch_jd_fraction
    }

    /// Epoch in days since 1950 January 0.0, the time base of the
    /// propagator's lunar/solar terms
    pub fn epoch_1950(&self) -> f64 {
        (self.epoch_jd - JD_1950) + self.epoch_jd_fraction
    }

    /// Mean motion in revolutions per day, as written in the TLE
    pub fn revs_per_day(&self) -> f64 {
        self.mean_motion * XPDOTP
    }

    /// Epoch as a calendar timestamp (UTC)
    pub fn epoch_datetime(&self) -> Option<NaiveDateTime> {
        datetime_from_julian_date(self.epoch_jd, self.epoch_jd_fraction)
    }
}

impl fmt::Display for TleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "catalog #{} epoch {}:{:.8}",
            self.catalog_number, self.epoch_year, self.epoch_days
        )
    }
}

/// A TLE with the optional name line of the 3-line format
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTle {
    pub name: Option<String>,
    pub tle: TleRecord,
}

/// Columns `range` of `line`, clipped to what the line actually holds
fn column(line: &str, range: Range<usize>) -> &str {
    let end = range.end.min(line.len());
    let start = range.start.min(end);
    line.get(start..end).unwrap_or("")
}

fn column_char(line: &str, index: usize) -> char {
    column(line, index..index + 1).chars().next().unwrap_or(' ')
}

/// Blank fields read as zero, unreadable ones as NaN
fn parse_float(field: &str) -> f64 {
    let field = field.trim();
    if field.is_empty() {
        return 0.0;
    }
    field.parse().unwrap_or(f64::NAN)
}

fn parse_uint(field: &str) -> u32 {
    field.trim().parse().unwrap_or(0)
}

/// Decode the `±NNNNN±E` notation used for B* and the second derivative of
/// mean motion: a signed mantissa with an implied leading decimal point
/// followed by a signed power-of-ten exponent.
fn parse_implied_exponent(field: &str) -> f64 {
    if field.trim().is_empty() {
        return 0.0;
    }
    let sign = match column_char(field, 0) {
        '-' => -1.0,
        _ => 1.0,
    };
    let digits = column(field, 1..6).replace(' ', "0");
    let mantissa = match format!("0.{digits}").parse::<f64>() {
        Ok(m) => m,
        Err(_) => return f64::NAN,
    };
    let exponent_field = column(field, 6..8).trim();
    let exponent = if exponent_field.is_empty() {
        0
    } else {
        match exponent_field.parse::<i32>() {
            Ok(e) => e,
            Err(_) => return f64::NAN,
        }
    };
    sign * mantissa * 10f64.powi(exponent)
}

/// Expand a two-digit TLE year: 57..=99 are 1900s, 00..=56 are 2000s
fn full_year(two_digit: i32) -> i32 {
    if two_digit < 57 {
        two_digit + 2000
    } else {
        two_digit + 1900
    }
}

/// Parse a TLE by column position.
///
/// This never fails. Short lines are read as far as they go, blank fields
/// become zero and unreadable fields become NaN.
pub fn parse_tle(line1: &str, line2: &str) -> TleRecord {
    let catalog_number = column(line1, 2..7).trim().to_string();
    let classification = column_char(line1, 7);
    let international_designator = column(line1, 9..17).trim().to_string();

    let epoch_year = full_year(column(line1, 18..20).trim().parse().unwrap_or(0));
    let epoch_days = parse_float(column(line1, 20..32));
    let (month, day, hour, minute, second) = days_to_mdhms(epoch_year, epoch_days);
    let (epoch_jd, epoch_jd_fraction) =
        julian_date_split(epoch_year, month, day, hour, minute, second);

    let ndot_revs = parse_float(column(line1, 33..43));
    let nddot_revs = parse_implied_exponent(column(line1, 44..52));
    let bstar = parse_implied_exponent(column(line1, 53..61));
    let ephemeris_type = column_char(line1, 62);
    let element_number = parse_uint(column(line1, 64..68));

    let inclination = parse_float(column(line2, 8..16)) * DEG2RAD;
    let raan = parse_float(column(line2, 17..25)) * DEG2RAD;
    let eccentricity = parse_float(&format!("0.{}", column(line2, 26..33).replace(' ', "0")));
    let argument_of_perigee = parse_float(column(line2, 34..42)) * DEG2RAD;
    let mean_anomaly = parse_float(column(line2, 43..51)) * DEG2RAD;
    let mean_motion = parse_float(column(line2, 52..63)) / XPDOTP;
    let revolution_number = parse_uint(column(line2, 63..68));

    TleRecord {
        catalog_number,
        classification,
        international_designator,
        epoch_year,
        epoch_days,
        epoch_jd,
        epoch_jd_fraction,
        mean_motion_dot: ndot_revs / (XPDOTP * MINUTES_PER_DAY),
        mean_motion_ddot: nddot_revs / (XPDOTP * MINUTES_PER_DAY * MINUTES_PER_DAY),
        bstar,
        ephemeris_type,
        element_number,
        inclination,
        raan,
        eccentricity,
        argument_of_perigee,
        mean_anomaly,
        mean_motion,
        revolution_number,
    }
}

/// Modulo-10 checksum of the first 68 columns of a TLE line.
///
/// Digits count their face value, minus signs count one, everything else
/// counts zero.
pub fn tle_checksum(line: &str) -> u32 {
    line.chars()
        .take(TLE_LINE_LENGTH - 1)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

fn check_line(line: &str, number: u8) -> Result<()> {
    if line.len() < TLE_LINE_LENGTH {
        return Err(SattrackError::TleFormat {
            line: number,
            reason: format!("expected {} columns, found {}", TLE_LINE_LENGTH, line.len()),
        });
    }
    let expected_prefix = char::from(b'0' + number);
    if !line.starts_with(expected_prefix) || column_char(line, 1) != ' ' {
        return Err(SattrackError::TleFormat {
            line: number,
            reason: format!("line must start with \"{} \"", expected_prefix),
        });
    }
    let found = column_char(line, TLE_LINE_LENGTH - 1)
        .to_digit(10)
        .ok_or_else(|| SattrackError::TleFormat {
            line: number,
            reason: "checksum column is not a digit".into(),
        })?;
    let expected = tle_checksum(line);
    if found != expected {
        return Err(SattrackError::Checksum {
            line: number,
            expected,
            found,
        });
    }
    Ok(())
}

/// Parse a TLE after validating both lines.
///
/// Checks the line numbers, the line length, the checksum of each line,
/// that both lines carry the same catalog number, and that every numeric
/// element field could be read.
pub fn parse_tle_strict(line1: &str, line2: &str) -> Result<TleRecord> {
    let line1 = line1.trim_end();
    let line2 = line2.trim_end();
    check_line(line1, 1)?;
    check_line(line2, 2)?;

    let catnum1 = column(line1, 2..7).trim();
    let catnum2 = column(line2, 2..7).trim();
    if catnum1 != catnum2 {
        return Err(SattrackError::TleFormat {
            line: 2,
            reason: format!("catalog number {} does not match line 1 ({})", catnum2, catnum1),
        });
    }

    let tle = parse_tle(line1, line2);
    let fields = [
        (1, "epoch", tle.epoch_days),
        (1, "mean motion derivative", tle.mean_motion_dot),
        (1, "mean motion second derivative", tle.mean_motion_ddot),
        (1, "B*", tle.bstar),
        (2, "inclination", tle.inclination),
        (2, "right ascension", tle.raan),
        (2, "eccentricity", tle.eccentricity),
        (2, "argument of perigee", tle.argument_of_perigee),
        (2, "mean anomaly", tle.mean_anomaly),
        (2, "mean motion", tle.mean_motion),
    ];
    for (line, name, value) in fields {
        if !value.is_finite() {
            return Err(SattrackError::TleFormat {
                line,
                reason: format!("unreadable {} field", name),
            });
        }
    }

    Ok(tle)
}

fn is_element_line(line: &str, number: char) -> bool {
    line.starts_with(number) && column_char(line, 1) == ' '
}

/// Parse a block of catalog text holding any mix of 2-line and 3-line sets.
///
/// Blank lines are ignored. A name line may carry the `0 ` prefix used by
/// some catalog sources. Sets that fail strict validation and lines that
/// belong to no set are logged and skipped.
pub fn parse_tle_catalog(text: &str) -> Vec<NamedTle> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (name, line1, line2, consumed) = if is_element_line(lines[i], '1')
            && i + 1 < lines.len()
            && is_element_line(lines[i + 1], '2')
        {
            (None, lines[i], lines[i + 1], 2)
        } else if i + 2 < lines.len()
            && is_element_line(lines[i + 1], '1')
            && is_element_line(lines[i + 2], '2')
        {
            let name = lines[i].strip_prefix("0 ").unwrap_or(lines[i]).trim();
            (Some(name.to_string()), lines[i + 1], lines[i + 2], 3)
        } else {
            warn!("Skipping unrecognized catalog line {}: {:?}", i + 1, lines[i]);
            i += 1;
            continue;
        };

        match parse_tle_strict(line1, line2) {
            Ok(tle) => sets.push(NamedTle { name, tle }),
            Err(e) => warn!(
                "Skipping element set {} at line {}: {}",
                name.as_deref().unwrap_or(column(line1, 2..7).trim()),
                i + 1,
                e
            ),
        }
        i += consumed;
    }

    sets
}
