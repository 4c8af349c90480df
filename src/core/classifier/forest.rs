//! CART decision trees with Gini impurity, bagged into a seeded random forest.
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use super::PixelClassifier;
use super::sampling::Sample;
use crate::core::params::ForestParams;
use crate::error::{Error, Result};
use crate::types::{Band, LandClass};

type ClassCounts = [usize; LandClass::COUNT];

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        class: LandClass,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

/// Options shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
struct TreeOptions {
    min_leaf: usize,
    mtry: usize,
    max_depth: usize,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

fn counts_of(samples: &[Sample], idx: &[usize]) -> ClassCounts {
    let mut counts = [0usize; LandClass::COUNT];
    for &i in idx {
        counts[samples[i].class.id() as usize] += 1;
    }
    counts
}

fn gini(counts: &ClassCounts, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Most frequent class; ties go to the lowest class id.
fn majority(counts: &ClassCounts) -> LandClass {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    LandClass::ALL[best]
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

impl DecisionTree {
    fn fit(samples: &[Sample], bag: Vec<usize>, opts: TreeOptions, rng: &mut StdRng) -> Self {
        let n_features = samples.first().map_or(0, |s| s.features.len());
        let mut tree = DecisionTree {
            nodes: Vec::new(),
            n_features,
        };
        tree.nodes.push(Node::Leaf {
            class: LandClass::Urban,
        });

        // (node slot, sample indices, depth)
        let mut stack = vec![(0usize, bag, 0usize)];
        while let Some((slot, idx, depth)) = stack.pop() {
            let counts = counts_of(samples, &idx);
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let split = if pure || idx.len() < 2 * opts.min_leaf || depth >= opts.max_depth {
                None
            } else {
                best_split(samples, &idx, &counts, opts, n_features, rng)
            };

            match split {
                None => {
                    tree.nodes[slot] = Node::Leaf {
                        class: majority(&counts),
                    };
                }
                Some(s) => {
                    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
                        .iter()
                        .partition(|&&i| samples[i].features[s.feature] <= s.threshold);
                    let left = tree.nodes.len();
                    let right = left + 1;
                    let placeholder = Node::Leaf {
                        class: LandClass::Urban,
                    };
                    tree.nodes.push(placeholder.clone());
                    tree.nodes.push(placeholder);
                    tree.nodes[slot] = Node::Split {
                        feature: s.feature,
                        threshold: s.threshold,
                        left,
                        right,
                    };
                    stack.push((right, right_idx, depth + 1));
                    stack.push((left, left_idx, depth + 1));
                }
            }
        }
        tree
    }

    pub fn predict(&self, features: &[f32]) -> LandClass {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Lowest weighted child impurity over `mtry` random features, honouring the
/// minimum leaf population on both sides.
fn best_split(
    samples: &[Sample],
    idx: &[usize],
    parent: &ClassCounts,
    opts: TreeOptions,
    n_features: usize,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n = idx.len();
    let parent_impurity = gini(parent, n);
    let mut best: Option<BestSplit> = None;
    let mut order: Vec<usize> = idx.to_vec();

    for feature in index::sample(rng, n_features, opts.mtry.min(n_features)).into_iter() {
        order.sort_by(|&a, &b| {
            samples[a].features[feature].total_cmp(&samples[b].features[feature])
        });

        let mut left = [0usize; LandClass::COUNT];
        let mut right = *parent;
        for k in 0..n - 1 {
            let class = samples[order[k]].class.id() as usize;
            left[class] += 1;
            right[class] -= 1;

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < opts.min_leaf || n_right < opts.min_leaf {
                continue;
            }
            let here = samples[order[k]].features[feature];
            let next = samples[order[k + 1]].features[feature];
            if here == next {
                continue;
            }

            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / n as f64;
            if impurity < parent_impurity - 1e-12
                && best.as_ref().is_none_or(|b| impurity < b.impurity)
            {
                let mut threshold = here + (next - here) / 2.0;
                // guard against the midpoint rounding up to `next`
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }
    best
}

/// Majority-vote ensemble of bagged decision trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    bands: Vec<Band>,
}

impl RandomForest {
    /// Train on `samples` whose features are ordered like `bands`.
    ///
    /// Per-tree seeds are drawn up front from `params.seed`, so the trained
    /// forest does not depend on how rayon schedules the trees.
    pub fn fit(samples: &[Sample], bands: &[Band], params: &ForestParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InsufficientSamples(
                "cannot train a forest on an empty training set".to_string(),
            ));
        }
        if params.n_trees == 0 {
            return Err(Error::InvalidArgument {
                arg: "forest.n_trees",
                value: "0".to_string(),
            });
        }
        if !(params.bag_fraction > 0.0 && params.bag_fraction <= 1.0) {
            return Err(Error::InvalidArgument {
                arg: "forest.bag_fraction",
                value: params.bag_fraction.to_string(),
            });
        }
        if let Some(bad) = samples.iter().find(|s| s.features.len() != bands.len()) {
            return Err(Error::InvalidArgument {
                arg: "samples",
                value: format!(
                    "sample has {} features, expected {}",
                    bad.features.len(),
                    bands.len()
                ),
            });
        }

        let n_features = bands.len();
        let default_mtry = ((n_features as f64).sqrt().floor() as usize).max(1);
        let opts = TreeOptions {
            min_leaf: params.min_leaf_population.max(1),
            mtry: params.variables_per_split.unwrap_or(default_mtry).clamp(1, n_features.max(1)),
            max_depth: params.max_depth.unwrap_or(usize::MAX),
        };
        let bag_size = ((samples.len() as f64 * params.bag_fraction).round() as usize)
            .clamp(1, samples.len());

        let mut master = StdRng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.n_trees).map(|_| master.next_u64()).collect();

        let trees: Vec<DecisionTree> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let bag = index::sample(&mut rng, samples.len(), bag_size).into_vec();
                DecisionTree::fit(samples, bag, opts, &mut rng)
            })
            .collect();

        let nodes: usize = trees.iter().map(DecisionTree::node_count).sum();
        debug!(trees = trees.len(), nodes, mtry = opts.mtry, bag_size, "forest grown");
        info!(
            "Trained random forest: {} trees on {} samples, {} features",
            trees.len(),
            samples.len(),
            n_features
        );

        Ok(Self {
            trees,
            bands: bands.to_vec(),
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Vote tally per class id.
    pub fn votes(&self, features: &[f32]) -> ClassCounts {
        let mut votes = [0usize; LandClass::COUNT];
        for tree in &self.trees {
            votes[tree.predict(features).id() as usize] += 1;
        }
        votes
    }
}

impl PixelClassifier for RandomForest {
    fn bands(&self) -> &[Band] {
        &self.bands
    }

    fn predict(&self, features: &[f32]) -> LandClass {
        majority(&self.votes(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f32, y: f32, class: LandClass) -> Sample {
        Sample {
            features: vec![x, y],
            class,
        }
    }

    /// Two well-separated clusters per class on a 2-D plane.
    fn quadrants() -> Vec<Sample> {
        let mut out = Vec::new();
        for i in 0..20 {
            let d = i as f32 * 0.01;
            out.push(sample(0.1 + d, 0.1 + d, LandClass::Urban));
            out.push(sample(0.9 - d, 0.1 + d, LandClass::Vegetation));
            out.push(sample(0.1 + d, 0.9 - d, LandClass::BareSoil));
            out.push(sample(0.9 - d, 0.9 - d, LandClass::Water));
        }
        out
    }

    fn params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            min_leaf_population: 2,
            bag_fraction: 0.7,
            variables_per_split: Some(2),
            max_depth: None,
            seed: 42,
        }
    }

    const BANDS: [Band; 2] = [Band::Ndvi, Band::Mndwi];

    #[test]
    fn gini_of_pure_and_even_nodes() {
        assert_eq!(gini(&[10, 0, 0, 0], 10), 0.0);
        assert!((gini(&[5, 5, 0, 0], 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn majority_breaks_ties_towards_lowest_id() {
        assert_eq!(majority(&[3, 3, 0, 0]), LandClass::Urban);
        assert_eq!(majority(&[0, 2, 5, 5]), LandClass::BareSoil);
    }

    #[test]
    fn forest_separates_quadrants() {
        let forest = RandomForest::fit(&quadrants(), &BANDS, &params(25)).unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&[0.15, 0.15]), LandClass::Urban);
        assert_eq!(forest.predict(&[0.85, 0.15]), LandClass::Vegetation);
        assert_eq!(forest.predict(&[0.15, 0.85]), LandClass::BareSoil);
        assert_eq!(forest.predict(&[0.85, 0.85]), LandClass::Water);
    }

    #[test]
    fn same_seed_same_forest() {
        let data = quadrants();
        let a = RandomForest::fit(&data, &BANDS, &params(10)).unwrap();
        let b = RandomForest::fit(&data, &BANDS, &params(10)).unwrap();
        for x in 0..10 {
            for y in 0..10 {
                let f = [x as f32 / 10.0, y as f32 / 10.0];
                assert_eq!(a.votes(&f), b.votes(&f));
            }
        }
    }

    #[test]
    fn leaves_respect_min_population() {
        // with min leaf 30 on 40 bagged samples no split is possible
        let data = quadrants();
        let p = ForestParams {
            min_leaf_population: 30,
            bag_fraction: 0.5,
            ..params(3)
        };
        let forest = RandomForest::fit(&data, &BANDS, &p).unwrap();
        assert!(forest.trees.iter().all(|t| t.node_count() == 1));
    }

    #[test]
    fn pure_training_set_gives_single_leaf() {
        let data: Vec<Sample> = (0..10).map(|i| sample(i as f32, 0.0, LandClass::Water)).collect();
        let forest = RandomForest::fit(&data, &BANDS, &params(3)).unwrap();
        assert_eq!(forest.predict(&[100.0, 100.0]), LandClass::Water);
        assert!(forest.trees.iter().all(|t| t.node_count() == 1));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(RandomForest::fit(&[], &BANDS, &params(3)).is_err());
        let wrong = vec![Sample {
            features: vec![1.0],
            class: LandClass::Urban,
        }];
        assert!(RandomForest::fit(&wrong, &BANDS, &params(3)).is_err());
        let zero = ForestParams {
            n_trees: 0,
            ..params(3)
        };
        assert!(RandomForest::fit(&quadrants(), &BANDS, &zero).is_err());
    }
}
