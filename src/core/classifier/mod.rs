pub mod forest;
pub mod sampling;
pub mod validation;

use crate::types::{Band, LandClass};

pub use forest::RandomForest;
pub use sampling::{ClassPolygons, Sample};
pub use validation::ConfusionMatrix;

/// A trained per-pixel land-cover model.
pub trait PixelClassifier: Send + Sync {
    /// Input bands, in the order `predict` expects its features.
    fn bands(&self) -> &[Band];

    fn predict(&self, features: &[f32]) -> LandClass;

    /// Predict every sample and pair the result with its reference class.
    fn assess(&self, samples: &[Sample]) -> ConfusionMatrix {
        ConfusionMatrix::from_pairs(
            samples
                .iter()
                .map(|s| (s.class, self.predict(&s.features))),
        )
    }
}
