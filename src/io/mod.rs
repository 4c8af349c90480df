//! I/O layer: tile sources (in-memory or a GeoTIFF directory with a
//! manifest), GeoJSON region and training-polygon loading, and `writers`
//! for GeoTIFF/CSV exports with world files and metadata sidecars.
pub mod geojson;
pub mod geotiff;

pub mod source;
pub use source::{DirectoryTileSource, MemoryTileSource, RasterSource};

pub mod writers;
