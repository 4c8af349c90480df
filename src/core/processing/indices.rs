//! Spectral indices appended to every composite.
//!
//! All normalized differences propagate invalid input and zero denominators as
//! NaN, so downstream stages see those pixels as missing rather than as 0.
use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::core::raster::Composite;
use crate::types::Band;

#[inline]
pub fn normalized_difference_px(a: f32, b: f32) -> f32 {
    if !a.is_finite() || !b.is_finite() {
        return f32::NAN;
    }
    let sum = a + b;
    if sum.abs() < 1e-10 {
        return f32::NAN;
    }
    (a - b) / sum
}

/// Normalized difference: (a - b) / (a + b)
pub fn normalized_difference(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f32> {
    let mut out = Array2::from_elem(a.dim(), f32::NAN);
    Zip::from(&mut out)
        .and(&a)
        .and(&b)
        .par_for_each(|o, &a, &b| *o = normalized_difference_px(a, b));
    out
}

/// NDVI = (NIR - Red) / (NIR + Red)
pub fn ndvi(nir: ArrayView2<f32>, red: ArrayView2<f32>) -> Array2<f32> {
    normalized_difference(nir, red)
}

/// NDBI = (SWIR - NIR) / (SWIR + NIR)
pub fn ndbi(swir: ArrayView2<f32>, nir: ArrayView2<f32>) -> Array2<f32> {
    normalized_difference(swir, nir)
}

/// MNDWI = (Green - SWIR) / (Green + SWIR)
pub fn mndwi(green: ArrayView2<f32>, swir: ArrayView2<f32>) -> Array2<f32> {
    normalized_difference(green, swir)
}

/// BUI = NDBI - NDVI
pub fn built_up_index(ndbi: &Array2<f32>, ndvi: &Array2<f32>) -> Array2<f32> {
    ndbi - ndvi
}

/// DUI = 1.5 NDBI - NDVI - 0.5 MNDWI
///
/// Weighted toward built-up signal and against water, which separates
/// settlements from bright desert sand better than NDBI alone.
pub fn desert_urban_index(
    ndbi: &Array2<f32>,
    ndvi: &Array2<f32>,
    mndwi: &Array2<f32>,
) -> Array2<f32> {
    let mut out = Array2::from_elem(ndbi.dim(), f32::NAN);
    Zip::from(&mut out)
        .and(ndbi)
        .and(ndvi)
        .and(mndwi)
        .for_each(|o, &b, &v, &w| *o = 1.5 * b - v - 0.5 * w);
    out
}

/// Fill the five index bands of a composite from its reflectance bands.
pub fn add_indices(composite: &mut Composite) {
    let ndvi = ndvi(composite.band(Band::B8), composite.band(Band::B4));
    let ndbi = ndbi(composite.band(Band::B11), composite.band(Band::B8));
    let mndwi = mndwi(composite.band(Band::B3), composite.band(Band::B11));
    let bui = built_up_index(&ndbi, &ndvi);
    let dui = desert_urban_index(&ndbi, &ndvi, &mndwi);

    for (band, values) in [
        (Band::Ndvi, ndvi),
        (Band::Ndbi, ndbi),
        (Band::Mndwi, mndwi),
        (Band::Bui, bui),
        (Band::Dui, dui),
    ] {
        composite
            .data
            .index_axis_mut(Axis(0), band.index())
            .assign(&values);
    }
}
