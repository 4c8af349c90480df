#![doc = r#"
SPRAWL: Sentinel-2 urban growth mapping.

This crate turns a stack of Sentinel-2 surface-reflectance tiles into yearly
land-cover maps and an urban growth report for a region of interest. For each
year it builds a cloud-masked seasonal median composite (1 October to 30 April),
derives spectral indices (NDVI, NDBI, MNDWI, BUI, DUI), classifies every pixel
with a random forest trained on labelled polygons, applies water/vegetation
override rules and a majority filter, and sums the urban area. It powers the
SPRAWL CLI and can be embedded in your own Rust applications.

Stability
---------
The public library API is experimental in initial releases and may evolve.

Requirements
------------
- Rust 2024 edition toolchain.
- Tiles as single-band GeoTIFFs in a projected metric CRS, indexed by a
  `manifest.json` (see [`io::source::DirectoryTileSource`]).

Quick start: run the full analysis
----------------------------------
```rust,no_run
use std::path::Path;
use sprawl::api::Pipeline;
use sprawl::io::geojson::{load_region, load_training_polygons};
use sprawl::io::writers::DirectorySink;
use sprawl::{AnalysisParams, DirectoryTileSource};

fn main() -> sprawl::Result<()> {
    let params = AnalysisParams::default();
    let region = load_region(Path::new("/data/uae.geojson"), &params.region_name)?;
    let training = load_training_polygons(Path::new("/data/training.geojson"))?;
    let source = DirectoryTileSource::open(Path::new("/data/tiles"))?;
    let mut sink = DirectorySink::new(Path::new("/out"), "Capstone_Results", "UAE", None);

    let output = Pipeline::new(&source, &region, &params)?.run(&training, Some(&mut sink))?;
    println!("{}", output.model.summary());
    println!("{}", output.report.render());
    Ok(())
}
```

Step by step
------------
```rust,no_run
use sprawl::api::Pipeline;
use sprawl::core::classifier::ClassPolygons;
use sprawl::{AnalysisParams, MemoryTileSource, Region};

fn yearly_areas(
    source: &MemoryTileSource,
    region: &Region,
    training: &[ClassPolygons],
) -> sprawl::Result<()> {
    let params = AnalysisParams {
        years: vec![2018, 2021, 2024],
        ..AnalysisParams::default()
    };
    let pipeline = Pipeline::new(source, region, &params)?;
    let model = pipeline.train(training)?;
    println!("{}", model.validation.render());

    let outcomes = pipeline.run_years(&model.forest);
    for skipped in &outcomes.skipped {
        eprintln!("{} skipped: {}", skipped.year, skipped.reason);
    }
    let report = pipeline.build_report(&outcomes)?;
    println!("{}", report.render());
    Ok(())
}
```

Error handling
--------------
All public functions return `sprawl::Result<T>`; match on `sprawl::Error` to handle
specific cases. A year without imagery fails that year only (`Error::MissingImagery`)
and is skipped by the year loop; training failures abort the run.

Useful modules
--------------
- [`api`]: high-level, ergonomic entry points.
- [`core`]: parameters, raster and region model, processing stages, classifier, report.
- [`types`]: enums (`Band`, `LandClass`, `ExportTarget`).
- [`io`]: tile sources, GeoJSON loading and GeoTIFF/CSV writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::AnalysisParams;
pub use crate::core::raster::{ClassifiedRaster, Composite, GeoTransform, Grid, Tile};
pub use crate::core::region::{Polygon, Region, rectangle};
pub use crate::core::report::{GrowthReport, YearRecord, YearResult};
pub use error::{Error, Result};
pub use types::{Band, ExportTarget, LandClass};

// Sources and sinks
pub use io::source::{DirectoryTileSource, MemoryTileSource, RasterSource};
pub use io::writers::{DirectorySink, ExportSink};

// Classifier
pub use crate::core::classifier::{ConfusionMatrix, PixelClassifier, RandomForest};

// High-level API re-exports
pub use api::{AnalysisOutput, Pipeline, SkippedYear, TrainedModel, YearOutcomes, run_analysis};
