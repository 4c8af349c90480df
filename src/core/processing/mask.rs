use ndarray::{Array2, Zip};

use crate::core::raster::Tile;

/// Sentinel-2 L2A scene classification codes dropped before compositing.
pub const CLOUD_SHADOW: u8 = 3;
pub const CLOUD_MEDIUM_PROBABILITY: u8 = 8;
pub const CLOUD_HIGH_PROBABILITY: u8 = 9;
pub const THIN_CIRRUS: u8 = 10;

pub const DEFAULT_MASKED_CODES: [u8; 4] = [
    CLOUD_SHADOW,
    CLOUD_MEDIUM_PROBABILITY,
    CLOUD_HIGH_PROBABILITY,
    THIN_CIRRUS,
];

/// Per-pixel validity of a tile: false where the SCL code is in `masked_codes`.
pub fn cloud_mask(tile: &Tile, masked_codes: &[u8]) -> Array2<bool> {
    tile.scl.mapv(|code| !masked_codes.contains(&code))
}

/// Apply `cloud_mask` in place, setting masked reflectance to NaN.
///
/// The SCL band keeps its codes; callers decide whether masked codes take
/// part in later reductions (the composite builder skips them).
pub fn mask_clouds(tile: &mut Tile, masked_codes: &[u8]) -> usize {
    let valid = cloud_mask(tile, masked_codes);
    let masked = valid.iter().filter(|&&v| !v).count();
    for mut band in tile.reflectance.outer_iter_mut() {
        Zip::from(&mut band).and(&valid).for_each(|v, &ok| {
            if !ok {
                *v = f32::NAN;
            }
        });
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::GeoTransform;
    use chrono::NaiveDate;
    use ndarray::{Array3, array};

    fn tile_with_scl(scl: Array2<u8>) -> Tile {
        let (r, c) = scl.dim();
        Tile::new(
            "t",
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            GeoTransform::new(0.0, 0.0, 10.0, -10.0),
            Array3::from_elem((5, r, c), 1000.0),
            scl,
        )
        .unwrap()
    }

    #[test]
    fn masks_only_cloud_and_shadow_codes() {
        let scl = array![[3u8, 4, 8], [9, 10, 11], [0, 5, 6]];
        let mut tile = tile_with_scl(scl);
        let masked = mask_clouds(&mut tile, &DEFAULT_MASKED_CODES);
        assert_eq!(masked, 4);
        let b2 = tile.reflectance.index_axis(ndarray::Axis(0), 0);
        assert!(b2[[0, 0]].is_nan());
        assert_eq!(b2[[0, 1]], 1000.0);
        assert!(b2[[0, 2]].is_nan());
        assert!(b2[[1, 0]].is_nan());
        assert!(b2[[1, 1]].is_nan());
        // code 11 (snow) and 0 (no data) pass through
        assert_eq!(b2[[1, 2]], 1000.0);
        assert_eq!(b2[[2, 0]], 1000.0);
    }

    #[test]
    fn mask_is_idempotent() {
        let mut tile = tile_with_scl(array![[3u8, 4], [4, 9]]);
        mask_clouds(&mut tile, &DEFAULT_MASKED_CODES);
        let once = tile.reflectance.clone();
        mask_clouds(&mut tile, &DEFAULT_MASKED_CODES);
        let same = once
            .iter()
            .zip(tile.reflectance.iter())
            .all(|(a, b)| (a.is_nan() && b.is_nan()) || a == b);
        assert!(same);
    }
}
