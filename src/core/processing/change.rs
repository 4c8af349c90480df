use ndarray::{Array2, Zip};

use crate::core::raster::ClassifiedRaster;
use crate::error::{Error, Result};
use crate::types::LandClass;

/// Value of a pixel that became Urban between the two years.
pub const NEW_URBAN: u8 = 1;

/// Self-masked map of pixels Urban in `last` but not in `base`.
///
/// Only new urban pixels are valid (`NEW_URBAN`); everything else, including
/// pixels that are no-data in either year, is no-data. The result is tagged
/// with the later year.
pub fn new_urban(base: &ClassifiedRaster, last: &ClassifiedRaster) -> Result<ClassifiedRaster> {
    if base.grid != last.grid {
        return Err(Error::GridMismatch {
            tile: format!("LC_{}", last.year),
            reason: format!("grid differs from LC_{}", base.year),
        });
    }
    let urban = LandClass::Urban.id();
    let mut data = Array2::from_elem(base.grid.shape(), ClassifiedRaster::NODATA);
    Zip::from(&mut data)
        .and(&base.data)
        .and(&last.data)
        .par_for_each(|out, &before, &after| {
            if before != ClassifiedRaster::NODATA && before != urban && after == urban {
                *out = NEW_URBAN;
            }
        });
    Ok(ClassifiedRaster {
        year: last.year,
        grid: last.grid,
        data,
    })
}
