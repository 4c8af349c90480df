pub mod csv;
pub mod metadata;
pub mod sink;
pub mod tiff;
pub mod worldfile;

pub use sink::{DirectorySink, ExportSink, RasterExport};
