//! Greentrace CLI - seasonal NDVI per vegetation community

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use greentrace_analysis::indices::scene_ndvi;
use greentrace_analysis::plot::render_chart;
use greentrace_analysis::timeseries::parse_acquisition_date;
use greentrace_analysis::zonal::aggregate;
use greentrace_core::io::{read_scene, read_sites};
use greentrace_core::scene::SpectralBand;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "greentrace")]
#[command(author, version, about = "Seasonal NDVI time series per vegetation community", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the NDVI time series for a directory of scenes
    Run {
        /// Directory of six-band scene GeoTIFFs, dates encoded as YYYYMMDD in filenames
        #[arg(long)]
        scenes: PathBuf,
        /// GeoJSON file with study-site polygons
        #[arg(long)]
        sites: PathBuf,
        /// Output CSV path for the tidy table
        #[arg(long, default_value = "ndvi_timeseries.csv")]
        out_table: PathBuf,
        /// Output PNG path for the seasonal chart
        #[arg(long, default_value = "ndvi_timeseries.png")]
        out_chart: PathBuf,
        /// Feature property holding the vegetation-community label
        #[arg(long, default_value = "community")]
        label_key: String,
        /// Sensor no-data value applied to every band
        #[arg(long)]
        nodata: Option<f64>,
        /// Chart title
        #[arg(long, default_value = "Seasonal NDVI by vegetation community")]
        title: String,
    },
    /// Show information about a scene file
    Info {
        /// Input scene file
        input: PathBuf,
        /// Sensor no-data value applied to every band
        #[arg(long)]
        nodata: Option<f64>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// List scene files in a directory, each paired with its parsed acquisition
/// date, sorted by date. Filenames carry the date; listing order never
/// matters.
fn list_scene_files(dir: &Path) -> Result<Vec<(NaiveDate, PathBuf)>> {
    let mut scenes = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Cannot read scene directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_tiff = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
            .unwrap_or(false);
        if !is_tiff {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let date = parse_acquisition_date(stem)
            .with_context(|| format!("Cannot date scene file {}", path.display()))?;
        scenes.push((date, path));
    }

    scenes.sort_by_key(|(date, _)| *date);
    Ok(scenes)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            scenes,
            sites,
            out_table,
            out_chart,
            label_key,
            nodata,
            title,
        } => {
            let start = Instant::now();

            let site_collection = read_sites(&sites, &label_key)
                .with_context(|| format!("Failed to read sites from {}", sites.display()))?;
            if site_collection.is_empty() {
                bail!("No study sites found in {}", sites.display());
            }
            info!(
                "Sites: {}",
                site_collection.names().join(", ")
            );

            let scene_files = list_scene_files(&scenes)?;
            if scene_files.is_empty() {
                bail!("No scene files found in {}", scenes.display());
            }
            info!("Scenes: {} acquisition dates", scene_files.len());

            let mut layers = Vec::with_capacity(scene_files.len());
            for (date, path) in &scene_files {
                let pb = spinner(&format!("Processing {}...", path.display()));
                let scene = read_scene(path, *date, nodata)
                    .with_context(|| format!("Failed to read scene {}", path.display()))?;
                let layer = scene_ndvi(&scene)
                    .with_context(|| format!("Failed to compute NDVI for {}", path.display()))?;
                pb.finish_and_clear();
                debug!("{}: {} x {}", date, layer.cols(), layer.rows());
                layers.push((*date, layer));
            }

            let series = aggregate(&layers, &site_collection)
                .context("Failed to aggregate NDVI over study sites")?;

            series
                .write_csv(&out_table)
                .with_context(|| format!("Failed to write {}", out_table.display()))?;
            info!("Table saved to: {}", out_table.display());

            render_chart(&series, &out_chart, &title)
                .with_context(|| format!("Failed to render {}", out_chart.display()))?;
            info!("Chart saved to: {}", out_chart.display());

            println!(
                "{} observations ({} dates x {} sites) in {:.2?}",
                series.len(),
                layers.len(),
                site_collection.len(),
                start.elapsed()
            );
        }

        Commands::Info { input, nodata } => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let date = parse_acquisition_date(stem)
                .with_context(|| format!("Cannot date scene file {}", input.display()))?;

            let pb = spinner("Reading scene...");
            let scene = read_scene(&input, date, nodata)
                .with_context(|| format!("Failed to read scene {}", input.display()))?;
            pb.finish_and_clear();

            let (rows, cols) = scene.shape();
            let bounds = scene.transform().bounds(cols, rows);

            println!("File: {}", input.display());
            println!("Acquisition date: {}", scene.date());
            println!("Dimensions: {} x {} per band", cols, rows);
            println!("Cell size: {}", scene.transform().cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = scene.crs() {
                println!("CRS: {}", crs);
            }

            println!("\nBand statistics:");
            for band in SpectralBand::ALL {
                let stats = scene.band(band).statistics();
                match (stats.min, stats.max, stats.mean) {
                    (Some(min), Some(max), Some(mean)) => println!(
                        "  {:>6}: min {:.4}  max {:.4}  mean {:.4}  valid {}",
                        band.name(),
                        min,
                        max,
                        mean,
                        stats.valid_count
                    ),
                    _ => println!("  {:>6}: no valid cells", band.name()),
                }
            }
        }
    }

    Ok(())
}
