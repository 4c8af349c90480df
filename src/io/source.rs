//! Where tiles come from: an in-memory list or a directory of GeoTIFFs
//! described by a `manifest.json`.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::processing::composite::DateWindow;
use crate::core::raster::{GeoTransform, Tile};
use crate::core::region::Region;
use crate::error::{Error, Result};
use crate::io::geotiff::read_band;
use crate::types::Band;

/// Supplies the tiles overlapping a region within a date window.
pub trait RasterSource: Send + Sync {
    fn tiles(&self, region: &Region, window: &DateWindow) -> Result<Vec<Tile>>;
}

fn overlaps(tile: &Tile, region: &Region, window: &DateWindow) -> bool {
    window.contains(tile.acquired) && region.intersects_bounds(tile.footprint())
}

/// Tiles held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTileSource {
    tiles: Vec<Tile>,
}

impl MemoryTileSource {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn push(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl RasterSource for MemoryTileSource {
    fn tiles(&self, region: &Region, window: &DateWindow) -> Result<Vec<Tile>> {
        Ok(self
            .tiles
            .iter()
            .filter(|t| overlaps(t, region, window))
            .cloned()
            .collect())
    }
}

/// One tile entry of `manifest.json`. Band paths are relative to the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub acquired: NaiveDate,
    pub bands: BTreeMap<Band, PathBuf>,
    /// GDAL-order transform; overrides the GeoTIFF tags when present
    #[serde(default)]
    pub geotransform: Option<[f64; 6]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub tiles: Vec<ManifestEntry>,
}

/// A directory of single-band GeoTIFFs indexed by `manifest.json`.
#[derive(Debug, Clone)]
pub struct DirectoryTileSource {
    root: PathBuf,
    manifest: Manifest,
}

impl DirectoryTileSource {
    pub const MANIFEST: &'static str = "manifest.json";

    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(Self::MANIFEST);
        if !path.is_file() {
            return Err(Error::MissingArgument {
                arg: format!("{}", path.display()),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        info!("Opened tile manifest {:?} ({} tiles)", path, manifest.tiles.len());
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn band_path(&self, entry: &ManifestEntry, band: Band) -> Result<PathBuf> {
        entry
            .bands
            .get(&band)
            .map(|p| self.root.join(p))
            .ok_or_else(|| Error::GridMismatch {
                tile: entry.id.clone(),
                reason: format!("manifest lists no {} band", band),
            })
    }

    fn load(&self, entry: &ManifestEntry) -> Result<Tile> {
        let mut layers = Vec::with_capacity(Band::REFLECTANCE.len());
        let mut transform = entry.geotransform.map(GeoTransform::from_gdal).transpose()?;
        for band in Band::REFLECTANCE {
            let decoded = read_band(self.band_path(entry, band)?)?;
            if transform.is_none() {
                transform = decoded.transform;
            }
            layers.push(decoded.data);
        }
        let transform = transform.ok_or_else(|| Error::GridMismatch {
            tile: entry.id.clone(),
            reason: "no georeferencing in manifest or GeoTIFF tags".to_string(),
        })?;

        let shape = layers[0].dim();
        if let Some(bad) = layers.iter().position(|l| l.dim() != shape) {
            return Err(Error::GridMismatch {
                tile: entry.id.clone(),
                reason: format!(
                    "{} is {:?}, expected {:?}",
                    Band::REFLECTANCE[bad],
                    layers[bad].dim(),
                    shape
                ),
            });
        }
        let views: Vec<_> = layers.iter().map(|l| l.view()).collect();
        let reflectance: Array3<f32> = ndarray::stack(Axis(0), &views).map_err(Error::processing)?;

        let scl_band = read_band(self.band_path(entry, Band::Scl)?)?;
        let scl: Array2<u8> = scl_band
            .data
            .mapv(|v| if v.is_finite() { v.clamp(0.0, 255.0) as u8 } else { 0 });

        Tile::new(entry.id.clone(), entry.acquired, transform, reflectance, scl)
    }
}

impl RasterSource for DirectoryTileSource {
    fn tiles(&self, region: &Region, window: &DateWindow) -> Result<Vec<Tile>> {
        let mut tiles = Vec::new();
        for entry in &self.manifest.tiles {
            if !window.contains(entry.acquired) {
                continue;
            }
            let tile = self.load(entry)?;
            if region.intersects_bounds(tile.footprint()) {
                tiles.push(tile);
            } else {
                debug!(tile = %entry.id, "tile does not overlap the region");
            }
        }
        Ok(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::CompositeParams;
    use crate::core::region::rectangle;
    use crate::io::writers::tiff::write_tiff_f32;

    fn region() -> Region {
        Region::new("r", vec![rectangle(0.0, 0.0, 40.0, 40.0).unwrap()]).unwrap()
    }

    fn tile(id: &str, date: NaiveDate, origin_x: f64) -> Tile {
        Tile::new(
            id,
            date,
            GeoTransform::new(origin_x, 40.0, 10.0, -10.0),
            Array3::from_elem((5, 4, 4), 0.1),
            Array2::from_elem((4, 4), 4),
        )
        .unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::for_year(2018, &CompositeParams::default()).unwrap()
    }

    #[test]
    fn memory_source_filters_date_and_footprint() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let source = MemoryTileSource::new(vec![
            tile("in", d(2018, 12, 1), 0.0),
            tile("late", d(2019, 5, 1), 0.0),
            tile("far", d(2018, 12, 1), 10_000.0),
        ]);
        let got = source.tiles(&region(), &window()).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "in");
    }

    #[test]
    fn directory_source_reads_manifest_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let gt = GeoTransform::new(0.0, 40.0, 10.0, -10.0);
        let mut bands = BTreeMap::new();
        for band in Band::SELECTED {
            let name = format!("{}.tif", band);
            let value = if band == Band::Scl { 8.0 } else { band.index() as f32 };
            write_tiff_f32(&dir.path().join(&name), &Array2::from_elem((4, 4), value), &gt).unwrap();
            bands.insert(band, PathBuf::from(name));
        }
        let manifest = Manifest {
            tiles: vec![ManifestEntry {
                id: "S2_T1".to_string(),
                acquired: NaiveDate::from_ymd_opt(2019, 1, 15).unwrap(),
                bands,
                geotransform: None,
            }],
        };
        std::fs::write(
            dir.path().join(DirectoryTileSource::MANIFEST),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let source = DirectoryTileSource::open(dir.path()).unwrap();
        let tiles = source.tiles(&region(), &window()).unwrap();
        assert_eq!(tiles.len(), 1);
        let t = &tiles[0];
        assert_eq!(t.transform, gt);
        assert_eq!(t.reflectance[[4, 0, 0]], 4.0);
        assert_eq!(t.scl[[3, 3]], 8);
    }

    #[test]
    fn missing_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirectoryTileSource::open(dir.path()),
            Err(Error::MissingArgument { .. })
        ));
    }
}
