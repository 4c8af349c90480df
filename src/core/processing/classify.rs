//! Per-year land-cover classification: model prediction, spectral override
//! rules, majority smoothing and region clip.
use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::classifier::PixelClassifier;
use crate::core::params::OverrideParams;
use crate::core::processing::smoothing::mode_filter;
use crate::core::raster::{ClassifiedRaster, Composite};
use crate::error::{Error, Result};
use crate::types::{Band, LandClass};

/// Run the model on every pixel. Pixels with any invalid input become no-data.
pub fn predict_composite(model: &dyn PixelClassifier, composite: &Composite) -> Result<ClassifiedRaster> {
    let bands = model.bands();
    if bands.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "classifier.bands",
            value: "[]".to_string(),
        });
    }
    let views: Vec<_> = bands.iter().map(|&b| composite.band(b)).collect();
    let mut data = Array2::from_elem(composite.grid.shape(), ClassifiedRaster::NODATA);

    Zip::indexed(&mut data).par_for_each(|(row, col), out| {
        let mut features = Vec::with_capacity(views.len());
        for view in &views {
            let v = view[[row, col]];
            if !v.is_finite() {
                return;
            }
            features.push(v);
        }
        *out = model.predict(&features).id();
    });

    Ok(ClassifiedRaster {
        year: composite.year,
        grid: composite.grid,
        data,
    })
}

/// Force high-NDVI pixels to Vegetation, then high-MNDWI pixels to Water.
///
/// Water is applied last, so a pixel above both thresholds ends up Water.
/// Returns how many pixels were changed to Vegetation and to Water.
pub fn apply_overrides(
    raster: &mut ClassifiedRaster,
    composite: &Composite,
    params: &OverrideParams,
) -> (usize, usize) {
    let ndvi = composite.band(Band::Ndvi);
    let mndwi = composite.band(Band::Mndwi);
    let mut vegetation = 0;
    let mut water = 0;

    Zip::from(&mut raster.data)
        .and(&ndvi)
        .and(&mndwi)
        .for_each(|class, &ndvi, &mndwi| {
            if *class == ClassifiedRaster::NODATA {
                return;
            }
            // NaN compares false, so invalid indices never trigger a rule
            let mut forced = *class;
            if ndvi > params.vegetation_ndvi {
                forced = LandClass::Vegetation.id();
            }
            if mndwi > params.water_mndwi {
                forced = LandClass::Water.id();
            }
            if forced != *class {
                if forced == LandClass::Water.id() {
                    water += 1;
                } else {
                    vegetation += 1;
                }
                *class = forced;
            }
        });
    (vegetation, water)
}

/// Set every pixel outside `region_mask` to no-data.
pub fn clip_classes(raster: &mut ClassifiedRaster, region_mask: &Array2<bool>) {
    Zip::from(&mut raster.data)
        .and(region_mask)
        .for_each(|class, &inside| {
            if !inside {
                *class = ClassifiedRaster::NODATA;
            }
        });
}

/// Final land-cover map of one year.
pub fn classify_year(
    model: &dyn PixelClassifier,
    composite: &Composite,
    region_mask: &Array2<bool>,
    params: &OverrideParams,
) -> Result<ClassifiedRaster> {
    let mut raw = predict_composite(model, composite)?;
    let (vegetation, water) = apply_overrides(&mut raw, composite, params);
    debug!(year = composite.year, vegetation, water, "override rules applied");
    let mut smoothed = mode_filter(&raw, params.smoothing_radius);
    clip_classes(&mut smoothed, region_mask);
    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::{GeoTransform, Grid};
    use ndarray::Array3;

    /// Calls everything Urban.
    struct AllUrban(Vec<Band>);

    impl PixelClassifier for AllUrban {
        fn bands(&self) -> &[Band] {
            &self.0
        }

        fn predict(&self, _features: &[f32]) -> LandClass {
            LandClass::Urban
        }
    }

    fn composite(ndvi: &[f32], mndwi: &[f32]) -> Composite {
        let cols = ndvi.len();
        let grid = Grid::new(GeoTransform::new(0.0, 10.0, 10.0, -10.0), 1, cols);
        let mut data = Array3::from_elem((Band::ALL.len(), 1, cols), 0.2f32);
        for c in 0..cols {
            data[[Band::Ndvi.index(), 0, c]] = ndvi[c];
            data[[Band::Mndwi.index(), 0, c]] = mndwi[c];
        }
        Composite {
            year: 2019,
            grid,
            data,
        }
    }

    fn model() -> AllUrban {
        AllUrban(Band::FEATURES.to_vec())
    }

    #[test]
    fn override_precedence() {
        let c = composite(&[0.5, 0.0, 0.5, 0.0], &[0.0, 0.3, 0.3, 0.0]);
        let mut r = predict_composite(&model(), &c).unwrap();
        let counts = apply_overrides(&mut r, &c, &OverrideParams::default());
        assert_eq!(r.data.row(0).to_vec(), vec![1, 3, 3, 0]);
        assert_eq!(counts, (1, 2));
    }

    #[test]
    fn thresholds_are_strict() {
        let c = composite(&[0.35, 0.36], &[0.1, 0.0]);
        let mut r = predict_composite(&model(), &c).unwrap();
        apply_overrides(&mut r, &c, &OverrideParams::default());
        assert_eq!(r.data.row(0).to_vec(), vec![0, 1]);
    }

    #[test]
    fn overrides_are_idempotent() {
        let c = composite(&[0.5, 0.0, 0.5, 0.1], &[0.0, 0.3, 0.3, -0.2]);
        let mut r = predict_composite(&model(), &c).unwrap();
        apply_overrides(&mut r, &c, &OverrideParams::default());
        let once = r.clone();
        assert_eq!(apply_overrides(&mut r, &c, &OverrideParams::default()), (0, 0));
        assert_eq!(r, once);
    }

    #[test]
    fn invalid_pixels_stay_nodata() {
        let c = composite(&[f32::NAN, 0.9], &[0.9, 0.0]);
        let mut r = predict_composite(&model(), &c).unwrap();
        apply_overrides(&mut r, &c, &OverrideParams::default());
        assert_eq!(r.data[[0, 0]], ClassifiedRaster::NODATA);
        assert_eq!(r.data[[0, 1]], LandClass::Vegetation.id());
    }

    #[test]
    fn classify_year_clips_to_region() {
        let c = composite(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]);
        let mask = Array2::from_shape_vec((1, 3), vec![true, true, false]).unwrap();
        let params = OverrideParams {
            smoothing_radius: 0,
            ..OverrideParams::default()
        };
        let r = classify_year(&model(), &c, &mask, &params).unwrap();
        assert_eq!(r.data.row(0).to_vec(), vec![0, 0, ClassifiedRaster::NODATA]);
        assert_eq!(r.year, 2019);
    }
}
