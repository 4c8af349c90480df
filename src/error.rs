//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, TIFF, JSON, CSV and GeoJSON errors, and provides semantic variants
//! for missing imagery, geometry problems and classifier/report failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No usable imagery for {year} (window {start} .. {end})")]
    MissingImagery {
        year: i32,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Tile {tile} does not match the analysis grid: {reason}")]
    GridMismatch { tile: String, reason: String },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Not enough training samples: {0}")]
    InsufficientSamples(String),

    #[error("Zonal reduction needs {needed} pixels, budget is {budget}")]
    PixelBudgetExceeded { needed: u64, budget: u64 },

    #[error("No year produced a result; nothing to report")]
    EmptyReport,

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    pub fn processing<E: std::fmt::Display>(e: E) -> Self {
        Error::Processing(e.to_string())
    }
}
