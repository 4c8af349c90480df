use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Full analysis configuration, suitable for JSON config files.
///
/// `Default` reproduces the UAE 2018-2024 analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Region name used in the report header
    pub region_name: String,
    /// Years to classify, in any order; the report sorts them
    pub years: Vec<i32>,
    /// Composite used for sampling training pixels
    pub training_year: i32,
    pub composite: CompositeParams,
    pub sampling: SamplingParams,
    pub forest: ForestParams,
    pub overrides: OverrideParams,
    pub area: AreaParams,
    pub export: ExportParams,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            region_name: "UAE".to_string(),
            years: (2018..=2024).collect(),
            training_year: 2018,
            composite: CompositeParams::default(),
            sampling: SamplingParams::default(),
            forest: ForestParams::default(),
            overrides: OverrideParams::default(),
            area: AreaParams::default(),
            export: ExportParams::default(),
        }
    }
}

impl AnalysisParams {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject values no run can use: empty year lists, non-positive scales,
    /// fractions outside (0, 1] and an empty forest.
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(Error::MissingArgument {
                arg: "years".to_string(),
            });
        }
        let scales = [
            ("composite.resolution", self.composite.resolution),
            ("sampling.scale", self.sampling.scale),
            ("area.scale", self.area.scale),
            ("export.raster_scale", self.export.raster_scale),
        ];
        for (arg, value) in scales {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(arg, value));
            }
        }
        let fractions = [
            ("sampling.train_fraction", self.sampling.train_fraction),
            ("forest.bag_fraction", self.forest.bag_fraction),
        ];
        for (arg, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(arg, value));
            }
        }
        if self.forest.n_trees == 0 {
            return Err(invalid("forest.n_trees", 0));
        }
        if self.forest.min_leaf_population == 0 {
            return Err(invalid("forest.min_leaf_population", 0));
        }
        Ok(())
    }
}

fn invalid(arg: &'static str, value: impl ToString) -> Error {
    Error::InvalidArgument {
        arg,
        value: value.to_string(),
    }
}

/// Seasonal window and grid of the annual composites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Window start (month, day) in the composite year
    pub start_month_day: (u32, u32),
    /// Window end (month, day) in the following year, exclusive
    pub end_month_day: (u32, u32),
    /// Analysis grid resolution in metres
    pub resolution: f64,
    /// Scene-classification codes treated as cloud or shadow
    pub masked_scl_codes: Vec<u8>,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            start_month_day: (10, 1),
            end_month_day: (4, 30),
            resolution: 10.0,
            masked_scl_codes: crate::core::processing::mask::DEFAULT_MASKED_CODES.to_vec(),
        }
    }
}

/// Training-sample collection and train/validation split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Sampling grid spacing in metres
    pub scale: f64,
    pub seed: u64,
    pub urban: usize,
    pub vegetation: usize,
    pub bare_soil: usize,
    pub water: usize,
    /// Fraction of the pool assigned to training
    pub train_fraction: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            seed: 42,
            urban: 800,
            vegetation: 600,
            bare_soil: 1000,
            water: 400,
            train_fraction: 0.7,
        }
    }
}

impl SamplingParams {
    pub fn count_for(&self, class: crate::types::LandClass) -> usize {
        use crate::types::LandClass;
        match class {
            LandClass::Urban => self.urban,
            LandClass::Vegetation => self.vegetation,
            LandClass::BareSoil => self.bare_soil,
            LandClass::Water => self.water,
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Minimum number of samples in each leaf
    pub min_leaf_population: usize,
    /// Fraction of the training set drawn (without replacement) per tree
    pub bag_fraction: f64,
    /// Features tried per split; None means floor(sqrt(n_features))
    pub variables_per_split: Option<usize>,
    /// Depth cap; None grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            min_leaf_population: 5,
            bag_fraction: 0.7,
            variables_per_split: None,
            max_depth: None,
            seed: 42,
        }
    }
}

/// Thresholds of the two post-classification override rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideParams {
    pub water_mndwi: f32,
    pub vegetation_ndvi: f32,
    /// Radius of the square mode filter; 0 disables smoothing
    pub smoothing_radius: usize,
}

impl Default for OverrideParams {
    fn default() -> Self {
        Self {
            water_mndwi: 0.1,
            vegetation_ndvi: 0.35,
            smoothing_radius: 1,
        }
    }
}

/// Urban area aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaParams {
    /// Computation scale in metres
    pub scale: f64,
    pub max_pixels: u64,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            scale: 100.0,
            max_pixels: 10_000_000_000_000,
        }
    }
}

/// Table and raster exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    pub table_description: Option<String>,
    pub rasters: bool,
    /// Export scale in metres for land-cover and change rasters
    pub raster_scale: f64,
    pub drive_folder: String,
    /// Projection written next to exported rasters (WKT or EPSG:XXXX)
    pub crs: Option<String>,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            table_description: None,
            rasters: true,
            raster_scale: 10.0,
            drive_folder: "Capstone_Results".to_string(),
            crs: None,
        }
    }
}

impl ExportParams {
    /// Table description, derived from region and year span when not configured.
    pub fn table_name(&self, region: &str, first: i32, last: i32) -> String {
        self.table_description
            .clone()
            .unwrap_or_else(|| format!("{}_Urban_Growth_{}_{}", region, first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let p = AnalysisParams::default();
        assert_eq!(p.years, vec![2018, 2019, 2020, 2021, 2022, 2023, 2024]);
        assert_eq!(p.forest.n_trees, 100);
        assert_eq!(p.sampling.seed, 42);
        assert_eq!(p.area.scale, 100.0);
        assert_eq!(p.composite.masked_scl_codes, vec![3, 8, 9, 10]);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let p: AnalysisParams =
            serde_json::from_str(r#"{"years": [2020, 2021], "forest": {"n_trees": 10}}"#).unwrap();
        assert_eq!(p.years, vec![2020, 2021]);
        assert_eq!(p.forest.n_trees, 10);
        assert_eq!(p.forest.min_leaf_population, 5);
        assert_eq!(p.region_name, "UAE");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        assert!(AnalysisParams::default().validate().is_ok());

        let mut p = AnalysisParams::default();
        p.sampling.train_fraction = 1.5;
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidArgument { arg: "sampling.train_fraction", .. })
        ));

        let mut p = AnalysisParams::default();
        p.area.scale = 0.0;
        assert!(matches!(p.validate(), Err(Error::InvalidArgument { arg: "area.scale", .. })));

        let mut p = AnalysisParams::default();
        p.years.clear();
        assert!(matches!(p.validate(), Err(Error::MissingArgument { .. })));

        // the whole set goes to training, validation is simply empty
        let mut p = AnalysisParams::default();
        p.sampling.train_fraction = 1.0;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn table_name_defaults_to_region_and_span() {
        let e = ExportParams::default();
        assert_eq!(e.table_name("UAE", 2018, 2024), "UAE_Urban_Growth_2018_2024");
    }
}
