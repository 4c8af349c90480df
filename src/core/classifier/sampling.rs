//! Training-sample collection from labelled polygons and the seeded
//! train/validation split.
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::core::params::SamplingParams;
use crate::core::raster::Composite;
use crate::core::region::Region;
use crate::error::{Error, Result};
use crate::types::{Band, LandClass};

/// One labelled pixel; `features` follow `Band::FEATURES` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f32>,
    pub class: LandClass,
}

impl Sample {
    pub fn label(&self) -> &'static str {
        self.class.label()
    }
}

/// Hand-digitised polygons for one land-cover class.
#[derive(Debug, Clone)]
pub struct ClassPolygons {
    pub class: LandClass,
    pub area: Region,
}

/// Draw up to `n` valid pixels from `polygons` on a `scale`-metre lattice.
///
/// Candidates are lattice cell centres inside the polygons whose composite
/// features are all valid; they are shuffled with `seed` and the first `n`
/// kept, so identical inputs always yield identical samples.
pub fn sample_polygons(
    composite: &Composite,
    polygons: &Region,
    class: LandClass,
    n: usize,
    scale: f64,
    seed: u64,
) -> Result<Vec<Sample>> {
    if !(scale > 0.0) {
        return Err(Error::InvalidArgument {
            arg: "sampling.scale",
            value: scale.to_string(),
        });
    }
    let (min_x, min_y, max_x, max_y) = polygons.bounds();
    let first_col = (min_x / scale).floor() as i64;
    let last_col = (max_x / scale).ceil() as i64;
    let first_row = (min_y / scale).floor() as i64;
    let last_row = (max_y / scale).ceil() as i64;

    let mut features = vec![0.0f32; Band::FEATURES.len()];
    let mut candidates = Vec::new();
    // north to south, west to east
    for j in (first_row..last_row).rev() {
        let y = (j as f64 + 0.5) * scale;
        for i in first_col..last_col {
            let x = (i as f64 + 0.5) * scale;
            if !polygons.contains(x, y) {
                continue;
            }
            let Some((row, col)) = composite.grid.locate(x, y) else {
                continue;
            };
            if composite.features_at(row, col, &mut features) {
                candidates.push(features.clone());
            }
        }
    }

    let available = candidates.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let (chosen, _) = candidates.partial_shuffle(&mut rng, n.min(available));
    if available < n {
        warn!(
            class = class.label(),
            requested = n,
            available,
            "fewer valid pixels than requested samples"
        );
    }

    Ok(chosen
        .iter()
        .map(|f| Sample {
            features: f.clone(),
            class,
        })
        .collect())
}

/// Sample every class and concatenate the pools in class order.
pub fn collect_samples(
    composite: &Composite,
    polygons: &[ClassPolygons],
    params: &SamplingParams,
) -> Result<Vec<Sample>> {
    let mut pool = Vec::new();
    for cp in polygons {
        let n = params.count_for(cp.class);
        let samples = sample_polygons(composite, &cp.area, cp.class, n, params.scale, params.seed)?;
        info!(class = cp.class.label(), samples = samples.len(), "collected training samples");
        pool.extend(samples);
    }
    if pool.is_empty() {
        return Err(Error::InsufficientSamples(
            "no valid pixels inside any training polygon".to_string(),
        ));
    }
    let histogram = class_histogram(&pool);
    info!(total = pool.len(), ?histogram, "Class distribution");
    Ok(pool)
}

/// Split by a seeded uniform random column: `< train_fraction` trains, the rest validates.
pub fn split_samples(samples: Vec<Sample>, train_fraction: f64, seed: u64) -> (Vec<Sample>, Vec<Sample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut training = Vec::with_capacity((samples.len() as f64 * train_fraction) as usize + 1);
    let mut validation = Vec::new();
    for sample in samples {
        let random: f64 = rng.gen_range(0.0..1.0);
        if random < train_fraction {
            training.push(sample);
        } else {
            validation.push(sample);
        }
    }
    (training, validation)
}

/// Sample count per class id.
pub fn class_histogram(samples: &[Sample]) -> [usize; LandClass::COUNT] {
    let mut counts = [0usize; LandClass::COUNT];
    for s in samples {
        counts[s.class.id() as usize] += 1;
    }
    counts
}
