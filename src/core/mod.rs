//! Core analysis building blocks: parameters, the raster and region model,
//! compositing and classification stages, the random forest and the growth
//! report. These are internal primitives consumed by the high-level `api`
//! module.
pub mod classifier;
pub mod params;
pub mod processing;
pub mod raster;
pub mod region;
pub mod report;
