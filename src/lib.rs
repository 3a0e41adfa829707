//! Satellite propagation from Two-Line Element sets
//!
//! `sattrack` implements the SGP4/SDP4 analytic propagators: it parses
//! NORAD Two-Line Element (TLE) sets, initializes the near-earth or
//! deep-space perturbation coefficients once per satellite, and produces
//! position/velocity state vectors in the TEME frame at arbitrary times.
//!
//! # Modules
//!
//! - [`time`] - Julian dates, calendar conversion, Greenwich sidereal time
//! - [`tlelib`] - Fixed-column TLE parsing, checksums, catalog text reading
//! - [`sgp4lib`] - Satellite records and the SGP4/SDP4 propagation step
//! - [`cataloglib`] - Parallel propagation of whole satellite catalogs
//! - [`constants`] - Gravity models and baked-in astronomical constants
//!
//! # Example
//!
//! ```no_run
//! use sattrack::sgp4lib::{SatelliteRecord, Sgp4Options};
//! use sattrack::tlelib::parse_tle;
//!
//! let line1 = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
//! let line2 = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";
//!
//! let tle = parse_tle(line1, line2);
//! let mut satrec = SatelliteRecord::new(&tle, Sgp4Options::default());
//! let state = satrec.propagate(360.0);
//! assert!(state.is_ok());
//! println!("r = {:?} km, v = {:?} km/s", state.position, state.velocity);
//! ```

pub mod cataloglib;
pub mod constants;
pub mod sgp4lib;
pub mod time;
pub mod tlelib;

use thiserror::Error;

use crate::sgp4lib::ErrorCode;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum SattrackError {
    /// Error reading a catalog file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Catalog text that could not be turned into element sets
    #[error("Data error: {0}")]
    DataError(String),

    /// A TLE line rejected by strict validation
    #[error("Invalid TLE line {line}: {reason}")]
    TleFormat { line: u8, reason: String },

    /// A TLE line whose trailing checksum digit does not match its contents
    #[error("TLE line {line} checksum mismatch: expected {expected}, found {found}")]
    Checksum { line: u8, expected: u32, found: u32 },

    /// Propagation finished with a non-`None` error code
    #[error("Propagation failed: {0}")]
    Propagation(ErrorCode),
}

/// Result type for sattrack operations
pub type Result<T> = std::result::Result<T, SattrackError>;
