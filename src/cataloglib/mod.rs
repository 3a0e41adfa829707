//! Batch propagation of a satellite catalog
//!
//! A [`Catalog`] owns one [`SatelliteRecord`] per element set read from
//! catalog text. Every record is independent, so propagation fans out over
//! a `rayon` thread pool with each worker holding exclusive access to the
//! records it propagates.

use std::fs;
use std::path::Path;

use log::{info, warn};
use rayon::prelude::*;

use crate::sgp4lib::{ErrorCode, PropagationResult, SatelliteRecord, Sgp4Options};
use crate::tlelib::{parse_tle_catalog, NamedTle};
use crate::{Result, SattrackError};

/// One satellite in a catalog
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Name line of a 3-line set, if there was one
    pub name: Option<String>,
    pub record: SatelliteRecord,
    /// Error code of the most recent propagation (initially the epoch check)
    pub last_error: ErrorCode,
}

impl CatalogEntry {
    pub fn catalog_number(&self) -> &str {
        self.record.catalog_number()
    }

    /// Name if present, otherwise the catalog number
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.catalog_number())
    }
}

/// A working set of initialized satellites
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    options: Sgp4Options,
}

impl Catalog {
    pub fn new(options: Sgp4Options) -> Self {
        Catalog {
            entries: Vec::new(),
            options,
        }
    }

    /// Build a catalog from 2-line or 3-line element text.
    ///
    /// Element sets that fail validation are skipped with a warning. Text
    /// with content but no usable set at all is an error.
    pub fn from_tle_text(text: &str, options: Sgp4Options) -> Result<Self> {
        let sets = parse_tle_catalog(text);
        if sets.is_empty() && !text.trim().is_empty() {
            return Err(SattrackError::DataError(
                "no valid element sets found".to_string(),
            ));
        }

        let mut catalog = Catalog::new(options);
        for set in sets {
            catalog.push(set);
        }
        Ok(catalog)
    }

    /// Read a catalog file
    pub fn from_file(path: impl AsRef<Path>, options: Sgp4Options) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading element sets from {:?}", path);

        let text = fs::read_to_string(path)?;
        let catalog = Self::from_tle_text(&text, options)?;

        info!("Loaded {} satellites from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Initialize and add one element set
    pub fn push(&mut self, set: NamedTle) {
        let record = SatelliteRecord::new(&set.tle, self.options);
        let last_error = record.error();
        if last_error != ErrorCode::None {
            warn!(
                "Satellite {} failed its epoch check: {}",
                record.catalog_number(),
                last_error
            );
        }
        self.entries.push(CatalogEntry {
            name: set.name,
            record,
            last_error,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn get(&self, catalog_number: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.catalog_number() == catalog_number)
    }

    pub fn options(&self) -> Sgp4Options {
        self.options
    }

    /// Propagate every satellite to a split Julian date (UTC) in parallel.
    ///
    /// Results come back in catalog order, keyed by catalog number.
    pub fn propagate_all(
        &mut self,
        jd_whole: f64,
        jd_fraction: f64,
    ) -> Vec<(String, PropagationResult)> {
        self.propagate_with(|record| record.propagate_jd(jd_whole, jd_fraction))
    }

    /// Propagate every satellite to the same offset from its own epoch
    pub fn propagate_all_since_epoch(&mut self, minutes: f64) -> Vec<(String, PropagationResult)> {
        self.propagate_with(|record| record.propagate(minutes))
    }

    fn propagate_with<F>(&mut self, step: F) -> Vec<(String, PropagationResult)>
    where
        F: Fn(&mut SatelliteRecord) -> PropagationResult + Sync,
    {
        self.entries
            .par_iter_mut()
            .map(|entry| {
                let result = step(&mut entry.record);
                entry.last_error = result.error;
                (entry.record.catalog_number().to_string(), result)
            })
            .collect()
    }

    /// Drop satellites whose last propagation reported decay.
    ///
    /// Returns the number removed.
    pub fn retain_healthy(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            let keep = entry.last_error != ErrorCode::Decayed;
            if !keep {
                info!("Dropping decayed satellite {}", entry.label());
            }
            keep
        });
        before - self.entries.len()
    }
}
