use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid year: {year}. Sentinel-2 surface reflectance starts in {first}")]
    InvalidYear { year: i32, first: i32 },

    #[error("No years to analyse")]
    NoYears,

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sprawl(#[from] sprawl::Error),
}
