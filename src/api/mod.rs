//! High-level library API: build composites, train and validate the land-cover
//! model, classify every year, aggregate urban area and hand the growth report
//! and rasters to an export sink. Prefer these entrypoints over the low-level
//! processing modules when integrating SPRAWL.
use std::path::PathBuf;

use ndarray::Array2;
use tracing::{info, warn};

use crate::core::classifier::sampling::{class_histogram, collect_samples, split_samples};
use crate::core::classifier::{ClassPolygons, ConfusionMatrix, PixelClassifier, RandomForest};
use crate::core::params::AnalysisParams;
use crate::core::processing::area::{AreaReducer, CoarseGridReducer, urban_area_km2};
use crate::core::processing::change::new_urban;
use crate::core::processing::classify::classify_year;
use crate::core::processing::composite::annual_composite;
use crate::core::raster::{ClassifiedRaster, Composite, Grid};
use crate::core::region::Region;
use crate::core::report::{GrowthReport, YearResult};
use crate::error::{Error, Result};
use crate::io::source::RasterSource;
use crate::io::writers::{ExportSink, RasterExport};
use crate::types::{Band, ExportTarget, LandClass};

/// Fitted model plus its held-out assessment.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub forest: RandomForest,
    pub validation: ConfusionMatrix,
    pub class_histogram: [usize; LandClass::COUNT],
    pub training_samples: usize,
    pub validation_samples: usize,
}

impl TrainedModel {
    /// Sample counts followed by the accuracy block.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== TRAINING DATA ===\n");
        out.push_str(&format!(
            "Total training samples: {}\n",
            self.training_samples + self.validation_samples
        ));
        for class in LandClass::ALL {
            out.push_str(&format!(
                "  {}: {}\n",
                class.label(),
                self.class_histogram[class.id() as usize]
            ));
        }
        out.push_str(&format!("Training set: {}\n", self.training_samples));
        out.push_str(&format!("Validation set: {}\n", self.validation_samples));
        out.push_str("\n=== VALIDATION RESULTS ===\n");
        out.push_str(&self.validation.render());
        out
    }
}

/// A year dropped from the report, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedYear {
    pub year: i32,
    pub reason: String,
}

/// Accumulator folded over the serial year loop.
#[derive(Debug, Clone, Default)]
pub struct YearOutcomes {
    pub results: Vec<YearResult>,
    pub skipped: Vec<SkippedYear>,
}

impl YearOutcomes {
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    fn record(mut self, year: i32, outcome: Result<Option<YearResult>>) -> Self {
        match outcome {
            Ok(Some(result)) => {
                info!(
                    "{} urban area: {:.2} km²",
                    result.year, result.urban_area_km2
                );
                self.results.push(result);
            }
            Ok(None) => {
                warn!(year, "area is null, skipping year");
                self.skipped.push(SkippedYear {
                    year,
                    reason: "no valid pixels inside the region".to_string(),
                });
            }
            Err(e) => {
                warn!(year, error = %e, "year failed, skipping");
                self.skipped.push(SkippedYear {
                    year,
                    reason: e.to_string(),
                });
            }
        }
        self
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub model: TrainedModel,
    pub report: GrowthReport,
    pub skipped: Vec<SkippedYear>,
    pub exported: Vec<PathBuf>,
}

/// Urban growth analysis over one region and one tile source.
pub struct Pipeline<'a> {
    source: &'a dyn RasterSource,
    region: &'a Region,
    params: &'a AnalysisParams,
    grid: Grid,
    mask: Array2<bool>,
    reducer: Box<dyn AreaReducer + 'a>,
}

impl<'a> Pipeline<'a> {
    /// Lay the analysis grid over the region at the composite resolution.
    pub fn new(
        source: &'a dyn RasterSource,
        region: &'a Region,
        params: &'a AnalysisParams,
    ) -> Result<Self> {
        params.validate()?;
        let grid = Grid::covering(region.bounds(), params.composite.resolution)?;
        let mask = region.mask(&grid);
        info!(
            "Analysis grid {}x{} at {} m over {}",
            grid.rows, grid.cols, params.composite.resolution, region.name
        );
        Ok(Self {
            source,
            region,
            params,
            grid,
            mask,
            reducer: Box::new(CoarseGridReducer::new(&params.area)),
        })
    }

    /// Replace the default coarse-grid area reducer.
    pub fn with_reducer(mut self, reducer: Box<dyn AreaReducer + 'a>) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn composite(&self, year: i32) -> Result<Composite> {
        annual_composite(
            self.source,
            self.region,
            &self.grid,
            &self.mask,
            year,
            &self.params.composite,
        )
    }

    /// Sample the training-year composite, split, fit and assess the forest.
    pub fn train(&self, training: &[ClassPolygons]) -> Result<TrainedModel> {
        let year = self.params.training_year;
        info!("=== TRAINING DATA PREPARATION ({} REFERENCE) ===", year);
        let composite = self.composite(year)?;
        let pool = collect_samples(&composite, training, &self.params.sampling)?;
        let histogram = class_histogram(&pool);

        let (train_set, validation_set) = split_samples(
            pool,
            self.params.sampling.train_fraction,
            self.params.sampling.seed,
        );
        info!(
            "Training set: {}, validation set: {}",
            train_set.len(),
            validation_set.len()
        );

        let forest = RandomForest::fit(&train_set, &Band::FEATURES, &self.params.forest)?;
        let validation = forest.assess(&validation_set);
        match (validation.accuracy(), validation.kappa()) {
            (Some(acc), Some(kappa)) => info!("Overall accuracy {:.4}, kappa {:.4}", acc, kappa),
            _ => warn!("validation statistics undefined (empty or single-class validation set)"),
        }

        Ok(TrainedModel {
            forest,
            validation,
            class_histogram: histogram,
            training_samples: train_set.len(),
            validation_samples: validation_set.len(),
        })
    }

    /// Classify one year and measure its urban area.
    /// `Ok(None)` when the area reduction found no valid pixel.
    pub fn process_year(&self, model: &dyn PixelClassifier, year: i32) -> Result<Option<YearResult>> {
        info!("Processing {}...", year);
        let composite = self.composite(year)?;
        let classified = classify_year(model, &composite, &self.mask, &self.params.overrides)?;
        let area = urban_area_km2(self.reducer.as_ref(), &classified, self.region)?;
        Ok(area.map(|urban_area_km2| YearResult {
            year,
            urban_area_km2,
            classified,
        }))
    }

    /// Process the configured years one after another; failures skip the year.
    pub fn run_years(&self, model: &dyn PixelClassifier) -> YearOutcomes {
        self.params
            .years
            .iter()
            .fold(YearOutcomes::default(), |acc, &year| {
                acc.record(year, self.process_year(model, year))
            })
    }

    pub fn build_report(&self, outcomes: &YearOutcomes) -> Result<GrowthReport> {
        GrowthReport::build(
            &self.params.region_name,
            self.region.area_km2(),
            outcomes.results.iter().map(|r| (r.year, r.urban_area_km2)),
        )
    }

    /// Write the growth table and, when enabled, the land-cover and change rasters.
    pub fn export(
        &self,
        report: &GrowthReport,
        outcomes: &YearOutcomes,
        sink: &mut dyn ExportSink,
    ) -> Result<Vec<PathBuf>> {
        let export = &self.params.export;
        let (base_year, last_year) = (report.base_year(), report.last_year());
        let mut written = vec![sink.export_table(
            &export.table_name(&self.params.region_name, base_year, last_year),
            report,
        )?];
        if !export.rasters {
            return Ok(written);
        }

        let raster_of = |year: i32| -> Result<&ClassifiedRaster> {
            outcomes
                .results
                .iter()
                .find(|r| r.year == year)
                .map(|r| &r.classified)
                .ok_or_else(|| Error::Processing(format!("no classified raster for {}", year)))
        };
        let base = raster_of(base_year)?;
        let last = raster_of(last_year)?;

        let mut final_years = vec![base_year];
        if last_year != base_year {
            final_years.push(last_year);
        }
        for year in final_years {
            written.push(sink.export_raster(&RasterExport {
                description: format!("LC_{}_Final", year),
                raster: raster_of(year)?,
                target: ExportTarget::Asset,
                scale: export.raster_scale,
                years: vec![year],
                land_cover: true,
            })?);
        }

        if last_year != base_year {
            let change = new_urban(base, last)?;
            let description = format!("Urban_Growth_{}_{}", base_year, last_year);
            for (target, name) in [
                (ExportTarget::Asset, description.clone()),
                (ExportTarget::Drive, format!("{}_Figure", description)),
            ] {
                written.push(sink.export_raster(&RasterExport {
                    description: name,
                    raster: &change,
                    target,
                    scale: export.raster_scale,
                    years: vec![base_year, last_year],
                    land_cover: false,
                })?);
            }
        }
        Ok(written)
    }

    /// Train, classify every year, report and export.
    ///
    /// Fails only when training fails or no year produced an area; single
    /// years that fail are listed in `AnalysisOutput::skipped`.
    pub fn run(
        &self,
        training: &[ClassPolygons],
        sink: Option<&mut dyn ExportSink>,
    ) -> Result<AnalysisOutput> {
        let model = self.train(training)?;
        info!("=== PROCESSING YEARS {:?} ===", self.params.years);
        let outcomes = self.run_years(&model.forest);
        info!(
            "processed={} skipped={}",
            outcomes.processed(),
            outcomes.skipped.len()
        );
        let report = self.build_report(&outcomes)?;
        let exported = match sink {
            Some(sink) => self.export(&report, &outcomes, sink)?,
            None => Vec::new(),
        };
        Ok(AnalysisOutput {
            model,
            report,
            skipped: outcomes.skipped,
            exported,
        })
    }
}

/// One-shot convenience wrapper around [`Pipeline::run`].
pub fn run_analysis(
    source: &dyn RasterSource,
    region: &Region,
    training: &[ClassPolygons],
    params: &AnalysisParams,
    sink: Option<&mut dyn ExportSink>,
) -> Result<AnalysisOutput> {
    Pipeline::new(source, region, params)?.run(training, sink)
}
