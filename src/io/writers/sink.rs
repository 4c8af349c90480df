//! Export destinations for the growth table and classified rasters.
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::raster::ClassifiedRaster;
use crate::core::report::GrowthReport;
use crate::error::{Error, Result};
use crate::io::writers::csv::write_growth_csv;
use crate::io::writers::metadata::{RasterExportMeta, create_metadata_sidecar};
use crate::io::writers::tiff::write_tiff_classes;
use crate::io::writers::worldfile::{write_prj_file, write_world_file};
use crate::types::ExportTarget;

/// One raster export request.
#[derive(Debug, Clone)]
pub struct RasterExport<'a> {
    pub description: String,
    pub raster: &'a ClassifiedRaster,
    pub target: ExportTarget,
    /// Output pixel size in metres; the raster is resampled when it differs
    pub scale: f64,
    pub years: Vec<i32>,
    pub land_cover: bool,
}

pub trait ExportSink {
    fn export_table(&mut self, description: &str, report: &GrowthReport) -> Result<PathBuf>;

    fn export_raster(&mut self, export: &RasterExport<'_>) -> Result<PathBuf>;
}

/// Writes exports under a local directory:
/// `drive/<description>.csv`, `assets/<description>.tif` and
/// `drive/<folder>/<description>.tif`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    drive_folder: String,
    region_name: String,
    crs: Option<String>,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(
        root: &Path,
        drive_folder: impl Into<String>,
        region_name: impl Into<String>,
        crs: Option<String>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            drive_folder: drive_folder.into(),
            region_name: region_name.into(),
            crs,
            written: Vec::new(),
        }
    }

    /// Every file written so far, side files included.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn raster_dir(&self, target: ExportTarget) -> PathBuf {
        match target {
            ExportTarget::Asset => self.root.join("assets"),
            ExportTarget::Drive => self.root.join("drive").join(&self.drive_folder),
        }
    }
}

impl ExportSink for DirectorySink {
    fn export_table(&mut self, description: &str, report: &GrowthReport) -> Result<PathBuf> {
        let dir = self.root.join("drive");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.csv", description));
        write_growth_csv(&path, report)?;
        info!("Export task written: {}", description);
        self.written.push(path.clone());
        Ok(path)
    }

    fn export_raster(&mut self, export: &RasterExport<'_>) -> Result<PathBuf> {
        if !(export.scale > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "export.raster_scale",
                value: export.scale.to_string(),
            });
        }
        let dir = self.raster_dir(export.target);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.tif", export.description));

        let resampled;
        let raster = if (export.raster.grid.resolution() - export.scale).abs() > 1e-9 {
            resampled = export
                .raster
                .resampled(&export.raster.grid.rescaled(export.scale)?);
            &resampled
        } else {
            export.raster
        };

        write_tiff_classes(&path, raster)?;
        self.written.push(path.clone());
        self.written
            .push(write_world_file(&path, &raster.grid.transform)?);
        if let Some(crs) = self.crs.as_deref().filter(|c| !c.is_empty()) {
            self.written.push(write_prj_file(&path, crs)?);
        }
        let meta = RasterExportMeta {
            description: export.description.clone(),
            region: self.region_name.clone(),
            target: export.target,
            scale: export.scale,
            years: export.years.clone(),
            land_cover: export.land_cover,
            geotransform: raster.grid.transform,
            crs: self.crs.clone(),
        };
        self.written.push(create_metadata_sidecar(&path, &meta)?);

        info!(
            "Exported {} to {} at {} m",
            export.description, export.target, export.scale
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::{GeoTransform, Grid};
    use crate::io::geotiff::read_band;
    use ndarray::Array2;

    fn raster() -> ClassifiedRaster {
        ClassifiedRaster {
            year: 2024,
            grid: Grid::new(GeoTransform::new(0.0, 40.0, 10.0, -10.0), 4, 4),
            data: Array2::from_elem((4, 4), 0),
        }
    }

    #[test]
    fn raster_export_writes_side_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), "Capstone_Results", "UAE", Some("EPSG:32640".into()));
        let r = raster();
        let path = sink
            .export_raster(&RasterExport {
                description: "Urban_Growth_2018_2024".to_string(),
                raster: &r,
                target: ExportTarget::Drive,
                scale: 10.0,
                years: vec![2018, 2024],
                land_cover: false,
            })
            .unwrap();
        assert_eq!(
            path,
            dir.path().join("drive/Capstone_Results/Urban_Growth_2018_2024.tif")
        );
        assert!(path.with_extension("tfw").is_file());
        assert!(path.with_extension("prj").is_file());
        assert!(path.with_extension("json").is_file());
        assert_eq!(sink.written().len(), 4);
    }

    #[test]
    fn coarser_scale_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), "out", "UAE", None);
        let r = raster();
        let path = sink
            .export_raster(&RasterExport {
                description: "LC_2024_Final".to_string(),
                raster: &r,
                target: ExportTarget::Asset,
                scale: 20.0,
                years: vec![2024],
                land_cover: true,
            })
            .unwrap();
        let band = read_band(&path).unwrap();
        assert_eq!(band.data.dim(), (2, 2));
        assert!(!path.with_extension("prj").exists());
    }

    #[test]
    fn table_goes_to_drive_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), "out", "UAE", None);
        let report = GrowthReport::build("UAE", 100.0, [(2018, 1.0)]).unwrap();
        let path = sink.export_table("UAE_Urban_Growth_2018_2018", &report).unwrap();
        assert_eq!(path, dir.path().join("drive/UAE_Urban_Growth_2018_2018.csv"));
        assert!(path.is_file());
    }
}
