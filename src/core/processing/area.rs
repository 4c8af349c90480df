//! Urban area aggregation over the region.
use rayon::prelude::*;

use crate::core::params::AreaParams;
use crate::core::raster::ClassifiedRaster;
use crate::core::region::Region;
use crate::error::{Error, Result};
use crate::types::LandClass;

/// Sums the ground area of Urban pixels inside a region.
///
/// `Ok(None)` means the region held no valid pixel, so no area can be
/// reported for that raster.
pub trait AreaReducer: Send + Sync {
    fn urban_area_m2(&self, raster: &ClassifiedRaster, region: &Region) -> Result<Option<f64>>;
}

/// Reduce on a coarser grid: each cell takes the class at its centre
/// (nearest neighbour) and contributes its full area when Urban and inside
/// the region.
#[derive(Debug, Clone)]
pub struct CoarseGridReducer {
    pub scale: f64,
    pub max_pixels: u64,
}

impl CoarseGridReducer {
    pub fn new(params: &AreaParams) -> Self {
        Self {
            scale: params.scale,
            max_pixels: params.max_pixels,
        }
    }
}

impl AreaReducer for CoarseGridReducer {
    fn urban_area_m2(&self, raster: &ClassifiedRaster, region: &Region) -> Result<Option<f64>> {
        let coarse = raster.grid.rescaled(self.scale)?;
        let needed = coarse.len() as u64;
        if needed > self.max_pixels {
            return Err(Error::PixelBudgetExceeded {
                needed,
                budget: self.max_pixels,
            });
        }
        let cell_area = coarse.transform.pixel_area();
        let urban = LandClass::Urban.id();

        let (valid, urban_cells) = (0..coarse.rows)
            .into_par_iter()
            .map(|row| {
                let mut valid = 0u64;
                let mut urban_cells = 0u64;
                for col in 0..coarse.cols {
                    let (x, y) = coarse.transform.pixel_center(row, col);
                    if !region.contains(x, y) {
                        continue;
                    }
                    let Some((r, c)) = raster.grid.locate(x, y) else {
                        continue;
                    };
                    let class = raster.data[[r, c]];
                    if class == ClassifiedRaster::NODATA {
                        continue;
                    }
                    valid += 1;
                    if class == urban {
                        urban_cells += 1;
                    }
                }
                (valid, urban_cells)
            })
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        if valid == 0 {
            return Ok(None);
        }
        Ok(Some(urban_cells as f64 * cell_area))
    }
}

/// Urban area in km², or None when nothing valid fell inside the region.
pub fn urban_area_km2(
    reducer: &dyn AreaReducer,
    raster: &ClassifiedRaster,
    region: &Region,
) -> Result<Option<f64>> {
    Ok(reducer.urban_area_m2(raster, region)?.map(|m2| m2 / 1e6))
}
