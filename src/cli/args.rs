use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sprawl", version, about = "SPRAWL urban growth CLI")]
pub struct CliArgs {
    /// Tile directory containing manifest.json and per-band GeoTIFFs
    #[arg(short, long)]
    pub tiles: Option<PathBuf>,

    /// Region of interest (GeoJSON Polygon, MultiPolygon, Feature or FeatureCollection)
    #[arg(short, long)]
    pub region: Option<PathBuf>,

    /// Training polygons (GeoJSON FeatureCollection with a `class` property)
    #[arg(long)]
    pub training: Option<PathBuf>,

    /// Output directory for the growth table and raster exports
    #[arg(short, long, default_value = "sprawl_out")]
    pub output_dir: PathBuf,

    /// JSON file with analysis parameters; missing fields use the defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Years to analyse, comma separated (e.g. 2018,2019,2020)
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<i32>>,

    /// Year whose composite provides the training samples
    #[arg(long)]
    pub training_year: Option<i32>,

    /// Region name used in the report and table names
    #[arg(long)]
    pub region_name: Option<String>,

    /// Projection written to .prj files next to exported rasters (WKT or EPSG:XXXX)
    #[arg(long)]
    pub crs: Option<String>,

    /// Only export the growth table
    #[arg(long, default_value_t = false)]
    pub no_export_rasters: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
