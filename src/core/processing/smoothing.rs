use ndarray::{Array2, Zip};

use crate::core::raster::ClassifiedRaster;
use crate::types::LandClass;

/// Square majority (mode) filter over class ids.
///
/// The window spans `radius` pixels on each side and is truncated at the
/// raster edge. No-data pixels are neither counted nor filled. Ties go to
/// the lowest class id.
pub fn mode_filter(raster: &ClassifiedRaster, radius: usize) -> ClassifiedRaster {
    if radius == 0 {
        return raster.clone();
    }
    let (rows, cols) = raster.data.dim();
    let src = &raster.data;
    let mut out = Array2::from_elem((rows, cols), ClassifiedRaster::NODATA);

    Zip::indexed(&mut out).par_for_each(|(row, col), o| {
        let centre = src[[row, col]];
        if LandClass::from_id(centre).is_none() {
            *o = centre;
            return;
        }
        let r0 = row.saturating_sub(radius);
        let r1 = (row + radius).min(rows - 1);
        let c0 = col.saturating_sub(radius);
        let c1 = (col + radius).min(cols - 1);

        let mut counts = [0u32; LandClass::COUNT];
        for r in r0..=r1 {
            for c in c0..=c1 {
                let v = src[[r, c]] as usize;
                if v < LandClass::COUNT {
                    counts[v] += 1;
                }
            }
        }
        let mut best = 0;
        for (i, &n) in counts.iter().enumerate() {
            if n > counts[best] {
                best = i;
            }
        }
        *o = best as u8;
    });

    ClassifiedRaster {
        year: raster.year,
        grid: raster.grid,
        data: out,
    }
}
