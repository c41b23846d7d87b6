//! Riparian CLI - riparian connectivity from classified imagery

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use riparian_algorithms::imagery::{classify_vegetation, ndvi, ClassifyParams};
use riparian_algorithms::landscape::{riparian_layers, stats_from_layers, StatRecord, Watershed};
use riparian_algorithms::vector::{extract_features, Connectivity, ExtractionParams};
use riparian_core::io::{
    read_boundary, read_feature_layer, read_geotiff, write_feature_layer, write_geotiff,
    write_polygon_layer, Compression, GeoTiffOptions,
};
use riparian_core::{ClassCodes, FeatureCollection, Raster, CRS};
use riparian_parallel::Workers;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "riparian")]
#[command(author, version, about = "Riparian connectivity analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Classify NIR/red bands into vegetated / non-vegetated / background
    Classify {
        /// Near-infrared band
        #[arg(long)]
        nir: PathBuf,
        /// Red band
        #[arg(long)]
        red: PathBuf,
        /// NDVI threshold, strictly between 0 and 1
        #[arg(short, long)]
        threshold: f64,
        /// Output compression: none, lzw or deflate
        #[arg(long, default_value = "deflate")]
        compression: Compression,
        /// Output classified raster
        output: PathBuf,
    },
    /// Vectorize a classified raster into riparian features
    Extract {
        /// Classified raster
        input: PathBuf,
        /// Output GeoJSON layer
        output: PathBuf,
        /// Layer name
        #[arg(long, default_value = "riparian_features")]
        layer: String,
        #[command(flatten)]
        extraction: ExtractionArgs,
    },
    /// Compute connectivity statistics from a feature layer
    Stats {
        /// Feature layer written by `extract`
        #[arg(long)]
        features: PathBuf,
        #[command(flatten)]
        watershed: WatershedArgs,
        /// Statistics table (CSV, one row appended per run)
        table: PathBuf,
        /// Non-vegetated cells hold -1 instead of 255
        #[arg(long)]
        signed: bool,
        /// Also write vegetated, non-vegetated and dissolved layers here
        #[arg(long)]
        layers_dir: Option<PathBuf>,
    },
    /// Extract features and compute statistics in one go
    Run {
        /// Classified raster
        input: PathBuf,
        #[command(flatten)]
        watershed: WatershedArgs,
        /// Output GeoJSON feature layer
        #[arg(long)]
        features_out: PathBuf,
        /// Statistics table (CSV, one row appended per run)
        #[arg(long)]
        table: PathBuf,
        #[command(flatten)]
        extraction: ExtractionArgs,
        /// Also write vegetated, non-vegetated and dissolved layers here
        #[arg(long)]
        layers_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ExtractionArgs {
    /// Decoding workers: `auto` or a positive integer
    #[arg(short, long, default_value = "auto")]
    workers: Workers,
    /// CRS to assign when the raster has none (e.g. EPSG:32610)
    #[arg(long)]
    crs: Option<CRS>,
    /// Cell connectivity for regions: 4 or 8
    #[arg(long, default_value = "4")]
    connectivity: Connectivity,
    /// Non-vegetated cells hold -1 instead of 255
    #[arg(long)]
    signed: bool,
}

impl ExtractionArgs {
    fn params(&self) -> ExtractionParams {
        ExtractionParams {
            workers: self.workers,
            class_codes: class_codes(self.signed),
            connectivity: self.connectivity,
        }
    }
}

#[derive(Args)]
struct WatershedArgs {
    /// Watershed boundary (GeoJSON)
    #[arg(long)]
    watershed: PathBuf,
    /// Watershed name written to the statistics table
    #[arg(short, long)]
    name: String,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn class_codes(signed: bool) -> ClassCodes {
    if signed {
        ClassCodes::signed()
    } else {
        ClassCodes::default()
    }
}

fn read_band(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_classified(path: &Path, crs: Option<&CRS>) -> Result<Raster<i32>> {
    let pb = spinner("Reading classified raster...");
    let mut raster: Raster<i32> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();

    if raster.crs().is_none() {
        if let Some(crs) = crs {
            info!("Assigning CRS {} to {}", crs, path.display());
            raster.set_crs(Some(crs.clone()));
        }
    }
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_watershed(args: &WatershedArgs) -> Result<Watershed> {
    let pb = spinner("Reading watershed boundary...");
    let layer = read_boundary(&args.watershed)
        .with_context(|| format!("Failed to read watershed {}", args.watershed.display()))?;
    pb.finish_and_clear();
    if layer.geometry.0.is_empty() {
        warn!("Watershed {} has no polygons", args.watershed.display());
    }
    Ok(Watershed::from_layer(args.name.clone(), layer))
}

fn extract(input: &Path, args: &ExtractionArgs) -> Result<FeatureCollection> {
    let raster = read_classified(input, args.crs.as_ref())?;
    let pb = spinner("Extracting features...");
    let features =
        extract_features(&raster, &args.params()).context("Feature extraction failed")?;
    pb.finish_and_clear();
    Ok(features)
}

fn write_features(features: &FeatureCollection, path: &Path, layer: &str, codes: &ClassCodes) -> Result<()> {
    let pb = spinner("Writing features...");
    write_feature_layer(path, layer, features, codes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn statistics(
    features: &FeatureCollection,
    watershed: &Watershed,
    table: &Path,
    layers_dir: Option<&Path>,
    codes: &ClassCodes,
) -> Result<StatRecord> {
    let pb = spinner("Calculating riparian statistics...");
    let layers = riparian_layers(features);
    let record = stats_from_layers(watershed, &layers).context("Statistics failed")?;
    pb.finish_and_clear();

    print!("{}", record);
    for metric in record.undefined_metrics() {
        warn!("{} is undefined (zero denominator)", metric);
    }
    record
        .append_csv(table)
        .with_context(|| format!("Failed to write {}", table.display()))?;

    if let Some(dir) = layers_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_feature_layer(dir.join("vegetated.geojson"), "vegetated", &layers.vegetated, codes)?;
        write_feature_layer(
            dir.join("non_vegetated.geojson"),
            "non_vegetated",
            &layers.non_vegetated,
            codes,
        )?;
        write_polygon_layer(
            dir.join("riparian_patches.geojson"),
            "riparian_patches",
            layers.crs(),
            &layers.riparian,
        )?;
        info!("Intermediate layers written to {}", dir.display());
    }

    Ok(record)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_band(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let gt = raster.transform();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {} x {}", gt.pixel_width, gt.pixel_height.abs());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none"),
            }

            let codes = ClassCodes::default();
            println!("\nClasses:");
            for (code, count) in raster.class_histogram() {
                let label = match code {
                    Some(c) => match codes.classify(c) {
                        Some(class) => format!("{} ({})", c, class),
                        None => c.to_string(),
                    },
                    None => "non-integral".to_string(),
                };
                println!("  {:<24} {}", label, count);
            }
        }

        Commands::Classify {
            nir,
            red,
            threshold,
            compression,
            output,
        } => {
            let params = ClassifyParams::new(threshold)?;
            let nir = read_band(&nir)?;
            let red = read_band(&red)?;

            let start = Instant::now();
            let pb = spinner("Classifying vegetation...");
            let index = ndvi(&nir, &red).context("NDVI failed")?;
            let classes = classify_vegetation(&index, params, &ClassCodes::default())
                .context("Classification failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            write_geotiff(&classes, &output, Some(GeoTiffOptions { compression }))
                .context("Failed to write output")?;
            pb.finish_and_clear();
            done("Classified raster", &output, elapsed);
        }

        Commands::Extract {
            input,
            output,
            layer,
            extraction,
        } => {
            let start = Instant::now();
            let features = extract(&input, &extraction)?;
            let elapsed = start.elapsed();

            info!("{} features", features.len());
            write_features(&features, &output, &layer, &class_codes(extraction.signed))?;
            done("Feature layer", &output, elapsed);
        }

        Commands::Stats {
            features,
            watershed,
            table,
            signed,
            layers_dir,
        } => {
            let codes = class_codes(signed);
            let pb = spinner("Reading features...");
            let collection = read_feature_layer(&features, &codes)
                .with_context(|| format!("Failed to read {}", features.display()))?;
            pb.finish_and_clear();
            let watershed = read_watershed(&watershed)?;

            let start = Instant::now();
            statistics(&collection, &watershed, &table, layers_dir.as_deref(), &codes)?;
            done("Statistics", &table, start.elapsed());
        }

        Commands::Run {
            input,
            watershed,
            features_out,
            table,
            extraction,
            layers_dir,
        } => {
            let codes = class_codes(extraction.signed);
            let watershed = read_watershed(&watershed)?;

            let start = Instant::now();
            let features = extract(&input, &extraction)?;
            write_features(&features, &features_out, "riparian_features", &codes)?;
            statistics(&features, &watershed, &table, layers_dir.as_deref(), &codes)?;
            let elapsed = start.elapsed();

            done("Feature layer", &features_out, elapsed);
            done("Statistics", &table, elapsed);
        }
    }

    Ok(())
}
