//! In-memory raster model: georeferencing, the analysis grid, source tiles,
//! annual composites and classified land-cover rasters.
use chrono::NaiveDate;
use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{Error, Result};
use crate::types::{Band, LandClass};

/// North-up affine transform (no rotation terms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// GDAL coefficient order: [x0, dx, rx, y0, ry, dy]
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(gt: [f64; 6]) -> Result<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(Error::InvalidArgument {
                arg: "geotransform",
                value: format!("{:?} (rotated transforms are not supported)", gt),
            });
        }
        Ok(Self::new(gt[0], gt[3], gt[1], gt[5]))
    }

    /// Ground area of one pixel in square map units.
    pub fn pixel_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (row, col) of a map coordinate.
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.origin_y) / self.pixel_height,
            (x - self.origin_x) / self.pixel_width,
        )
    }

    fn same_resolution(&self, other: &GeoTransform) -> bool {
        let tol = 1e-6 * self.pixel_width.abs().max(1.0);
        (self.pixel_width - other.pixel_width).abs() < tol
            && (self.pixel_height - other.pixel_height).abs() < tol
    }
}

/// A georeferenced pixel lattice shared by every raster of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize) -> Self {
        Self {
            transform,
            rows,
            cols,
        }
    }

    /// Snap a bounding box (min_x, min_y, max_x, max_y) outward onto a lattice of `resolution`.
    pub fn covering(bounds: (f64, f64, f64, f64), resolution: f64) -> Result<Self> {
        if !(resolution > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "resolution",
                value: resolution.to_string(),
            });
        }
        let (min_x, min_y, max_x, max_y) = bounds;
        if !(max_x > min_x && max_y > min_y) {
            return Err(Error::InvalidGeometry(format!(
                "degenerate bounds {:?}",
                bounds
            )));
        }
        let origin_x = (min_x / resolution).floor() * resolution;
        let origin_y = (max_y / resolution).ceil() * resolution;
        let cols = ((max_x - origin_x) / resolution).ceil().max(1.0) as usize;
        let rows = ((origin_y - min_y) / resolution).ceil().max(1.0) as usize;
        Ok(Self::new(
            GeoTransform::new(origin_x, origin_y, resolution, -resolution),
            rows,
            cols,
        ))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolution(&self) -> f64 {
        self.transform.pixel_width.abs()
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let t = &self.transform;
        let x1 = t.origin_x + self.cols as f64 * t.pixel_width;
        let y1 = t.origin_y + self.rows as f64 * t.pixel_height;
        (
            t.origin_x.min(x1),
            t.origin_y.min(y1),
            t.origin_x.max(x1),
            t.origin_y.max(y1),
        )
    }

    /// Pixel containing a map coordinate, if it falls inside the grid.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (r, c) = self.transform.to_pixel(x, y);
        if r < 0.0 || c < 0.0 {
            return None;
        }
        let (r, c) = (r.floor() as usize, c.floor() as usize);
        if r < self.rows && c < self.cols {
            Some((r, c))
        } else {
            None
        }
    }

    /// Same extent resampled to a coarser (or finer) pixel size.
    pub fn rescaled(&self, scale: f64) -> Result<Self> {
        if !(scale > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "scale",
                value: scale.to_string(),
            });
        }
        let width = self.cols as f64 * self.transform.pixel_width.abs();
        let height = self.rows as f64 * self.transform.pixel_height.abs();
        let cols = (width / scale - 1e-9).ceil().max(1.0) as usize;
        let rows = (height / scale - 1e-9).ceil().max(1.0) as usize;
        Ok(Grid::new(
            GeoTransform::new(self.transform.origin_x, self.transform.origin_y, scale, -scale),
            rows,
            cols,
        ))
    }
}

/// One acquisition: five surface-reflectance bands plus the scene classification.
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: String,
    pub acquired: NaiveDate,
    pub transform: GeoTransform,
    /// Shape (5, rows, cols) in `Band::REFLECTANCE` order
    pub reflectance: Array3<f32>,
    pub scl: Array2<u8>,
}

impl Tile {
    pub fn new(
        id: impl Into<String>,
        acquired: NaiveDate,
        transform: GeoTransform,
        reflectance: Array3<f32>,
        scl: Array2<u8>,
    ) -> Result<Self> {
        let id = id.into();
        let (n, rows, cols) = reflectance.dim();
        if n != Band::REFLECTANCE.len() {
            return Err(Error::GridMismatch {
                tile: id,
                reason: format!("expected {} reflectance bands, got {}", Band::REFLECTANCE.len(), n),
            });
        }
        if scl.dim() != (rows, cols) {
            return Err(Error::GridMismatch {
                tile: id,
                reason: format!(
                    "SCL shape {:?} differs from reflectance shape {:?}",
                    scl.dim(),
                    (rows, cols)
                ),
            });
        }
        Ok(Self {
            id,
            acquired,
            transform,
            reflectance,
            scl,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.scl.dim()
    }

    pub fn footprint(&self) -> (f64, f64, f64, f64) {
        let (rows, cols) = self.shape();
        Grid::new(self.transform, rows, cols).bounds()
    }

    /// Integer (row, col) offset of this tile's origin on `grid`.
    pub fn offset_on(&self, grid: &Grid) -> Result<(isize, isize)> {
        if !grid.transform.same_resolution(&self.transform) {
            return Err(Error::GridMismatch {
                tile: self.id.clone(),
                reason: format!(
                    "pixel size {}x{} differs from grid {}x{}",
                    self.transform.pixel_width,
                    self.transform.pixel_height,
                    grid.transform.pixel_width,
                    grid.transform.pixel_height
                ),
            });
        }
        let (r, c) = grid
            .transform
            .to_pixel(self.transform.origin_x, self.transform.origin_y);
        Ok((r.round() as isize, c.round() as isize))
    }
}

/// Annual median composite; invalid pixels are NaN.
#[derive(Debug, Clone)]
pub struct Composite {
    pub year: i32,
    pub grid: Grid,
    /// Shape (bands, rows, cols) in `Band::ALL` order
    pub data: Array3<f32>,
}

impl Composite {
    pub fn band(&self, band: Band) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), band.index())
    }

    /// Copy the classifier features of one pixel into `out`.
    /// Returns false when any feature is invalid.
    pub fn features_at(&self, row: usize, col: usize, out: &mut [f32]) -> bool {
        debug_assert_eq!(out.len(), Band::FEATURES.len());
        for (slot, band) in out.iter_mut().zip(Band::FEATURES) {
            let v = self.data[[band.index(), row, col]];
            if !v.is_finite() {
                return false;
            }
            *slot = v;
        }
        true
    }

    /// Pixels whose reflectance bands are all valid.
    pub fn valid_pixel_count(&self) -> usize {
        let mut n = 0;
        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                if Band::REFLECTANCE
                    .iter()
                    .all(|b| self.data[[b.index(), row, col]].is_finite())
                {
                    n += 1;
                }
            }
        }
        n
    }
}

/// Single-band land-cover raster of class ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRaster {
    pub year: i32,
    pub grid: Grid,
    pub data: Array2<u8>,
}

impl ClassifiedRaster {
    pub const NODATA: u8 = 255;

    pub fn count(&self, class: LandClass) -> usize {
        self.data.iter().filter(|&&v| v == class.id()).count()
    }

    pub fn class_at(&self, row: usize, col: usize) -> Option<LandClass> {
        LandClass::from_id(self.data[[row, col]])
    }

    /// Nearest-neighbour resample onto `target`.
    pub fn resampled(&self, target: &Grid) -> ClassifiedRaster {
        let mut data = Array2::from_elem(target.shape(), Self::NODATA);
        for ((row, col), v) in data.indexed_iter_mut() {
            let (x, y) = target.transform.pixel_center(row, col);
            if let Some((r, c)) = self.grid.locate(x, y) {
                *v = self.data[[r, c]];
            }
        }
        ClassifiedRaster {
            year: self.year,
            grid: *target,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn covering_snaps_outward() {
        let g = Grid::covering((5.0, 3.0, 47.0, 29.0), 10.0).unwrap();
        assert_eq!(g.transform.origin_x, 0.0);
        assert_eq!(g.transform.origin_y, 30.0);
        assert_eq!(g.cols, 5);
        assert_eq!(g.rows, 3);
        assert_eq!(g.transform.pixel_area(), 100.0);
    }

    #[test]
    fn locate_and_center_agree() {
        let g = Grid::covering((0.0, 0.0, 100.0, 100.0), 10.0).unwrap();
        let (x, y) = g.transform.pixel_center(2, 7);
        assert_eq!(g.locate(x, y), Some((2, 7)));
        assert_eq!(g.locate(-1.0, 50.0), None);
        assert_eq!(g.locate(50.0, 101.0), None);
    }

    #[test]
    fn tile_offset_and_mismatch() {
        let grid = Grid::covering((0.0, 0.0, 100.0, 100.0), 10.0).unwrap();
        let day = NaiveDate::from_ymd_opt(2018, 11, 2).unwrap();
        let tile = Tile::new(
            "t",
            day,
            GeoTransform::new(20.0, 80.0, 10.0, -10.0),
            Array3::zeros((5, 2, 2)),
            Array2::zeros((2, 2)),
        )
        .unwrap();
        assert_eq!(tile.offset_on(&grid).unwrap(), (2, 2));

        let coarse = Tile::new(
            "c",
            day,
            GeoTransform::new(0.0, 100.0, 20.0, -20.0),
            Array3::zeros((5, 2, 2)),
            Array2::zeros((2, 2)),
        )
        .unwrap();
        assert!(matches!(coarse.offset_on(&grid), Err(Error::GridMismatch { .. })));
    }

    #[test]
    fn tile_rejects_wrong_band_count() {
        let day = NaiveDate::from_ymd_opt(2018, 11, 2).unwrap();
        let res = Tile::new(
            "t",
            day,
            GeoTransform::new(0.0, 0.0, 10.0, -10.0),
            Array3::zeros((4, 2, 2)),
            Array2::zeros((2, 2)),
        );
        assert!(res.is_err());
    }

    #[test]
    fn resample_nearest() {
        let grid = Grid::covering((0.0, 0.0, 40.0, 40.0), 10.0).unwrap();
        let mut data = Array2::from_elem(grid.shape(), 2u8);
        data[[0, 0]] = 0;
        let raster = ClassifiedRaster { year: 2018, grid, data };
        let coarse = grid.rescaled(20.0).unwrap();
        assert_eq!(coarse.shape(), (2, 2));
        let out = raster.resampled(&coarse);
        // centre of coarse (0,0) is (10,30): fine pixel (1,1)
        assert_eq!(out.data[[0, 0]], 2);
        assert_eq!(out.data[[1, 1]], 2);
    }
}
