//! Propagate a whole TLE catalog in parallel
//!
//! Run with:
//!   RUST_LOG=info cargo run --example propagate_catalog -- active.tle --minutes 1440

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sattrack::cataloglib::Catalog;
use sattrack::sgp4lib::{GravityModel, Method, OpsMode, Sgp4Options};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Gravity {
    Wgs72old,
    Wgs72,
    Wgs84,
}

#[derive(Parser)]
#[command(name = "propagate_catalog")]
#[command(about = "Propagate every satellite of a TLE catalog and report error codes")]
struct Args {
    /// Catalog file with 2-line or 3-line element sets
    catalog: PathBuf,

    /// Minutes from each satellite's epoch
    #[arg(short, long, default_value = "0.0")]
    minutes: f64,

    /// Earth gravity model
    #[arg(long, default_value = "wgs72")]
    gravity: Gravity,

    /// Use the legacy AFSPC operation mode
    #[arg(long)]
    afspc: bool,

    /// Print every satellite's position
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let options = Sgp4Options {
        gravity: match args.gravity {
            Gravity::Wgs72old => GravityModel::Wgs72Old,
            Gravity::Wgs72 => GravityModel::Wgs72,
            Gravity::Wgs84 => GravityModel::Wgs84,
        },
        ops_mode: if args.afspc {
            OpsMode::Afspc
        } else {
            OpsMode::Improved
        },
    };

    let mut catalog = Catalog::from_file(&args.catalog, options)?;
    let deep_space = catalog
        .iter()
        .filter(|entry| entry.record.method() == Method::DeepSpace)
        .count();
    println!(
        "{} satellites ({} deep space), propagating {} min from epoch",
        catalog.len(),
        deep_space,
        args.minutes
    );

    let results = catalog.propagate_all_since_epoch(args.minutes);

    let mut by_code: BTreeMap<u8, usize> = BTreeMap::new();
    for (number, result) in &results {
        *by_code.entry(result.error.code()).or_default() += 1;
        if args.verbose {
            println!(
                "{:>6} {:>12.3} {:>12.3} {:>12.3}  {}",
                number, result.position.x, result.position.y, result.position.z, result.error
            );
        }
    }

    println!("Error codes:");
    for (code, count) in &by_code {
        println!("  {}: {}", code, count);
    }

    let dropped = catalog.retain_healthy();
    println!("{} decayed satellites dropped, {} remain", dropped, catalog.len());

    Ok(())
}
