//! Emblem batch generator.
//!
//! Geocodes every place of the catalog, cuts its silhouette out of the
//! internal texture and composites it into the hexagonal emblem.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use blason::config::Config;
use blason::geocode::{GeocodeCache, NominatimClient};
use blason::models::Catalog;
use blason::pipeline::{AssetStore, BatchDriver, InternalAsset, PlacePipeline};
use blason::raster::GeometryRasterizer;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Generate hexagonal emblems for French departments, regions and territories")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the image assets
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory the emblems are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Places processed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Only generate these places (repeatable)
    #[arg(long)]
    only: Vec<String>,

    /// Skip the union-of-regions variants
    #[arg(long)]
    no_aggregates: bool,

    /// Write a JSON batch report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Cache geocoder responses in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, args);

    info!("Blason emblem generator");
    info!("Inputs: {}", config.paths.input_dir.display());
    info!("Output: {}", config.paths.output_dir.display());

    let mut geocoder = NominatimClient::new(config.geocoder.clone())?;
    if let Some(dir) = &config.paths.cache_dir {
        geocoder = geocoder.with_cache(GeocodeCache::open(dir)?);
    }

    let pipeline = PlacePipeline::new(
        geocoder,
        AssetStore::new(&config.paths.input_dir, config.assets.clone()),
        GeometryRasterizer::new(config.raster),
        &config.paths.output_dir,
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let driver = BatchDriver::new(pipeline, Catalog::france(), config.batch.clone())
        .with_progress(pb);
    let report = driver.run().await.context("Batch aborted")?;

    if let Some(path) = &config.paths.report {
        report.write_json(path)?;
        info!("Report written to {}", path.display());
    }

    for failure in report.failures() {
        warn!(
            "{}: {}",
            failure.display_name,
            failure.error().unwrap_or("unknown error")
        );
    }
    let fallbacks = report
        .places
        .iter()
        .filter(|p| p.internal_asset().is_some_and(InternalAsset::is_default))
        .count();
    if fallbacks > 0 {
        warn!("{} emblems used the default internal texture", fallbacks);
    }

    info!(
        "Done: {} emblems written, {} failed",
        report.succeeded, report.failed
    );

    Ok(())
}

/// Command-line values win over the configuration file
fn apply_overrides(config: &mut Config, args: Args) {
    if let Some(dir) = args.input_dir {
        config.paths.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.paths.output_dir = dir;
    }
    if let Some(path) = args.report {
        config.paths.report = Some(path);
    }
    if let Some(dir) = args.cache_dir {
        config.paths.cache_dir = Some(dir);
    }
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
    }
    if args.no_aggregates {
        config.batch.aggregates = false;
    }
    config.batch.only = args.only;
}
