use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sprawl::api::Pipeline;
use sprawl::io::geojson::{load_region, load_training_polygons};
use sprawl::io::writers::DirectorySink;
use sprawl::{AnalysisParams, DirectoryTileSource};

use super::args::CliArgs;
use super::errors::AppError;

/// First year with Sentinel-2 surface reflectance over most regions.
const FIRST_YEAR: i32 = 2017;

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn required(path: Option<PathBuf>, arg: &str) -> Result<PathBuf, AppError> {
    path.ok_or(AppError::MissingArgument {
        arg: arg.to_string(),
    })
}

/// Defaults, then the config file, then command-line overrides.
fn resolve_params(args: &CliArgs) -> Result<AnalysisParams, AppError> {
    let mut params = match &args.config {
        Some(path) => AnalysisParams::from_json_file(path)?,
        None => AnalysisParams::default(),
    };
    if let Some(years) = &args.years {
        params.years = years.clone();
    }
    if let Some(year) = args.training_year {
        params.training_year = year;
    }
    if let Some(name) = &args.region_name {
        params.region_name = name.clone();
    }
    if args.crs.is_some() {
        params.export.crs = args.crs.clone();
    }
    if args.no_export_rasters {
        params.export.rasters = false;
    }

    if params.years.is_empty() {
        return Err(AppError::NoYears);
    }
    for &year in params.years.iter().chain(std::iter::once(&params.training_year)) {
        if year < FIRST_YEAR {
            return Err(AppError::InvalidYear {
                year,
                first: FIRST_YEAR,
            });
        }
    }
    params.validate()?;
    Ok(params)
}

fn run_analysis(
    tiles: &Path,
    region_path: &Path,
    training_path: &Path,
    output_dir: &Path,
    params: &AnalysisParams,
) -> Result<(), AppError> {
    let region = load_region(region_path, &params.region_name)?;
    let training = load_training_polygons(training_path)?;
    let source = DirectoryTileSource::open(tiles)?;

    fs::create_dir_all(output_dir)?;
    let mut sink = DirectorySink::new(
        output_dir,
        params.export.drive_folder.clone(),
        params.region_name.clone(),
        params.export.crs.clone(),
    );

    let pipeline = Pipeline::new(&source, &region, params)?;
    let output = pipeline.run(&training, Some(&mut sink))?;

    println!("{}", output.model.summary());
    println!("{}", output.report.render());

    for skipped in &output.skipped {
        warn!("{} skipped: {}", skipped.year, skipped.reason);
    }
    for path in &output.exported {
        info!("Wrote {:?}", path);
    }
    info!(
        "Analysis complete: {} years reported, {} skipped",
        output.report.records.len(),
        output.skipped.len()
    );
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let params = resolve_params(&args)?;
    let tiles = required(args.tiles, "--tiles")?;
    let region = required(args.region, "--region")?;
    let training = required(args.training, "--training")?;

    info!("Tile directory: {:?}", tiles);
    info!("Output directory: {:?}", args.output_dir);

    run_analysis(&tiles, &region, &training, &args.output_dir, &params)?;
    Ok(())
}
