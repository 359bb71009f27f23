//! Batch front end: reads a GeoJSON street network and writes the derived
//! pedestrian network as GeoJSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sidewalker_core::prelude::*;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(version, about = "Derive sidewalks and crossings from a street network")]
struct Args {
    /// GeoJSON FeatureCollection of the street network
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the pedestrian network
    #[arg(short, long)]
    output: PathBuf,

    /// TOML configuration, defaults apply to every missing key
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write statistics and removed duplicates as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Worker threads, all cores when omitted
    #[arg(long)]
    threads: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct Report<'a> {
    stats: NetworkStats,
    duplicates: &'a [DuplicateReport],
}

fn write_report(path: &Path, network: &PedestrianNetwork) -> Result<()> {
    let report = Report {
        stats: network.stats(),
        duplicates: network.duplicates(),
    };
    let text = serde_json::to_string_pretty(&report)?;
    fs::write(path, text).with_context(|| format!("Failed to write report {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize rayon thread pool")?;
    }

    let config = config::load(args.config.as_deref())?;
    tracing::info!(
        input = %args.input.display(),
        standoff_m = config.standoff_m,
        error_policy = ?config.error_policy,
        "Reading street network"
    );

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let raw = read_network_str(&text, config.error_policy)
        .with_context(|| format!("Failed to parse street network {}", args.input.display()))?;
    let network =
        create_pedestrian_network(raw, &config).context("Failed to create pedestrian network")?;

    fs::write(&args.output, network.to_geojson_string()?)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    if let Some(path) = &args.report {
        write_report(path, &network)?;
    }

    let stats = network.stats();
    tracing::info!(
        pedestrian_roads = stats.pedestrian_roads,
        sidewalks = stats.sidewalks,
        merged_sidewalks = stats.merged_sidewalks,
        crossings = stats.official_crossings + stats.regular_crossings,
        duplicates = stats.duplicates_removed,
        "Wrote {}",
        args.output.display()
    );
    network.release();
    Ok(())
}
