//! Region-of-interest geometry in projected (metric) coordinates.
//!
//! A region is a `geo` multipolygon with optional holes. Everything the
//! pipeline produces is clipped to it, and its planar area is the denominator
//! of the "% of region" report column.
use geo::{Area, BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};
use ndarray::{Array2, Zip};

use crate::core::raster::Grid;
use crate::error::{Error, Result};

pub use geo::Polygon;

/// Axis-aligned rectangle polygon, handy for synthetic regions.
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Polygon<f64>> {
    if !(min_x < max_x && min_y < max_y) {
        return Err(Error::InvalidGeometry(format!(
            "empty rectangle ({min_x}, {min_y}) .. ({max_x}, {max_y})"
        )));
    }
    Ok(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }).to_polygon())
}

fn check_polygon(polygon: &Polygon<f64>) -> Result<()> {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(Error::InvalidGeometry("non-finite coordinate".into()));
        }
        // rings are closed, so the last coordinate repeats the first
        let distinct = ring.0.len().saturating_sub(1);
        if distinct < 3 {
            return Err(Error::InvalidGeometry(format!(
                "ring with {} distinct vertices",
                distinct
            )));
        }
    }
    Ok(())
}

/// Named multipolygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    extent: Rect<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon<f64>>) -> Result<Self> {
        if polygons.is_empty() {
            return Err(Error::InvalidGeometry("region has no polygons".into()));
        }
        for polygon in &polygons {
            check_polygon(polygon)?;
        }
        let geometry = MultiPolygon::new(polygons);
        let extent = geometry
            .bounding_rect()
            .ok_or_else(|| Error::InvalidGeometry("region has no extent".into()))?;
        Ok(Self {
            name: name.into(),
            geometry,
            extent,
        })
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.geometry.0
    }

    /// `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (min, max) = (self.extent.min(), self.extent.max());
        (min.x, min.y, max.x, max.y)
    }

    /// Interior test; points on a boundary are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (min, max) = (self.extent.min(), self.extent.max());
        if x < min.x || x > max.x || y < min.y || y > max.y {
            return false;
        }
        self.geometry.contains(&Point::new(x, y))
    }

    /// Planar area in square metres.
    pub fn area_m2(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn area_km2(&self) -> f64 {
        self.area_m2() / 1e6
    }

    /// True when the region's extent and `other` overlap with non-zero area.
    pub fn intersects_bounds(&self, other: (f64, f64, f64, f64)) -> bool {
        let b = self.bounds();
        b.0 < other.2 && other.0 < b.2 && b.1 < other.3 && other.1 < b.3
    }

    /// Pixel-centre rasterisation of the region onto `grid`.
    pub fn mask(&self, grid: &Grid) -> Array2<bool> {
        let mut mask = Array2::from_elem(grid.shape(), false);
        Zip::indexed(&mut mask).par_for_each(|(row, col), inside| {
            let (x, y) = grid.transform.pixel_center(row, col);
            *inside = self.contains(x, y);
        });
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;

    fn square_with_hole() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]),
            vec![LineString::from(vec![(40.0, 40.0), (60.0, 40.0), (60.0, 60.0), (40.0, 60.0)])],
        )
    }

    #[test]
    fn area_subtracts_holes() {
        let r = Region::new("r", vec![square_with_hole()]).unwrap();
        assert_relative_eq!(r.area_m2(), 10_000.0 - 400.0);
        assert_relative_eq!(r.area_km2(), 0.0096);
    }

    #[test]
    fn contains_respects_holes() {
        let r = Region::new("r", vec![square_with_hole()]).unwrap();
        assert!(r.contains(10.0, 10.0));
        assert!(!r.contains(50.0, 50.0));
        assert!(!r.contains(150.0, 50.0));
    }

    #[test]
    fn multipolygon_bounds_and_area() {
        let r = Region::new(
            "r",
            vec![
                rectangle(0.0, 0.0, 10.0, 10.0).unwrap(),
                rectangle(20.0, -5.0, 30.0, 5.0).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(r.bounds(), (0.0, -5.0, 30.0, 10.0));
        assert_relative_eq!(r.area_m2(), 200.0);
        assert!(r.contains(25.0, 0.0));
        assert!(!r.contains(15.0, 5.0));
        assert_eq!(r.polygons().len(), 2);
    }

    #[test]
    fn mask_uses_pixel_centres() {
        let region = Region::new("r", vec![rectangle(0.0, 0.0, 20.0, 40.0).unwrap()]).unwrap();
        let grid = Grid::covering((0.0, 0.0, 40.0, 40.0), 10.0).unwrap();
        let mask = region.mask(&grid);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 8);
        assert!(mask[[0, 0]] && mask[[3, 1]]);
        assert!(!mask[[0, 2]]);
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        let sliver = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]), vec![]);
        assert!(Region::new("sliver", vec![sliver]).is_err());
        assert!(Region::new("empty", vec![]).is_err());
        assert!(rectangle(0.0, 0.0, 0.0, 10.0).is_err());
    }
}
