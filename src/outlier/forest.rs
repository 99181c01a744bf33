//! Isolation-forest outlier ensemble
//!
//! Fits an ensemble of randomized binary partition trees over the feature
//! matrix. Each tree recursively splits a uniformly random dimension at a
//! uniformly random cut; anomalous points end up isolated after fewer
//! splits, giving them shorter average path lengths and scores near 1.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::EngineError;
use crate::models::PARAMETER_COUNT;

/// Default number of trees in the ensemble
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Default expected proportion of anomalous readings
pub const DEFAULT_CONTAMINATION: f64 = 0.03;

/// Maximum rows subsampled per tree
const MAX_TREE_SAMPLES: usize = 256;

/// Euler-Mascheroni constant, for the average-path-length normalizer
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One feature row in the fixed parameter order
pub type FeatureRow = [f64; PARAMETER_COUNT];

/// Tuning for the outlier ensemble
#[derive(Debug, Clone)]
pub struct ForestParams {
    /// Number of partition trees
    pub tree_count: usize,
    /// Expected proportion of anomalies; sets the decision threshold
    pub contamination: f64,
    /// RNG seed for reproducible forests; fresh entropy when unset
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            tree_count: DEFAULT_TREE_COUNT,
            contamination: DEFAULT_CONTAMINATION,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        dimension: usize,
        cut: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    root: Node,
}

impl Tree {
    fn grow(rows: Vec<FeatureRow>, rng: &mut ChaCha20Rng, height_limit: usize) -> Self {
        Self {
            root: grow_node(rows, rng, 0, height_limit),
        }
    }

    /// Splits traversed to isolate the row, plus the usual adjustment for
    /// the leaf's remaining population.
    fn path_length(&self, row: &FeatureRow) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    dimension,
                    cut,
                    left,
                    right,
                } => {
                    depth += 1.0;
                    node = if row[*dimension] < *cut { left } else { right };
                }
            }
        }
    }
}

fn grow_node(rows: Vec<FeatureRow>, rng: &mut ChaCha20Rng, depth: usize, height_limit: usize) -> Node {
    if rows.len() <= 1 || depth >= height_limit {
        return Node::Leaf { size: rows.len() };
    }

    // Only dimensions with spread can be split
    let splittable: Vec<(usize, f64, f64)> = (0..PARAMETER_COUNT)
        .filter_map(|dim| {
            let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, row| {
                (acc.0.min(row[dim]), acc.1.max(row[dim]))
            });
            (min < max).then_some((dim, min, max))
        })
        .collect();

    if splittable.is_empty() {
        // All rows identical in every dimension
        return Node::Leaf { size: rows.len() };
    }

    let (dimension, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let cut = rng.gen_range(min..max);
    let (left, right): (Vec<FeatureRow>, Vec<FeatureRow>) =
        rows.into_iter().partition(|row| row[dimension] < cut);

    Node::Split {
        dimension,
        cut,
        left: Box::new(grow_node(left, rng, depth + 1, height_limit)),
        right: Box::new(grow_node(right, rng, depth + 1, height_limit)),
    }
}

/// A fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Tree>,
    /// Path-length normalizer for the per-tree subsample size
    normalizer: f64,
    /// Score above which a row is labeled an outlier
    threshold: f64,
}

impl IsolationForest {
    /// Fit a forest over the feature rows.
    ///
    /// Each tree grows on a random subsample of up to 256 rows (without
    /// replacement) to a height cap of `ceil(log2(subsample))`. The decision
    /// threshold is calibrated on the training scores so that roughly
    /// `contamination` of the training rows land above it.
    pub fn fit(rows: &[FeatureRow], params: &ForestParams) -> Result<Self, EngineError> {
        if !(params.contamination > 0.0 && params.contamination < 0.5) {
            return Err(EngineError::InvalidConfiguration(format!(
                "contamination must be in (0, 0.5), got {}",
                params.contamination
            )));
        }
        if params.tree_count == 0 {
            return Err(EngineError::InvalidConfiguration(
                "tree_count must be positive".to_string(),
            ));
        }
        if rows.len() < 2 {
            return Err(EngineError::InsufficientData {
                required: 2,
                actual: rows.len(),
            });
        }

        let mut rng = match params.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };

        let sample_size = rows.len().min(MAX_TREE_SAMPLES);
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees: Vec<Tree> = (0..params.tree_count)
            .map(|_| {
                let subsample: Vec<FeatureRow> = sample(&mut rng, rows.len(), sample_size)
                    .into_iter()
                    .map(|i| rows[i])
                    .collect();
                Tree::grow(subsample, &mut rng, height_limit)
            })
            .collect();

        let mut forest = Self {
            trees,
            normalizer: average_path_length(sample_size),
            threshold: 0.0,
        };

        let mut training_scores: Vec<f64> = rows.iter().map(|row| forest.score(row)).collect();
        forest.threshold = quantile(&mut training_scores, 1.0 - params.contamination);
        Ok(forest)
    }

    /// Continuous isolation score in (0, 1); higher isolates faster
    pub fn score(&self, row: &FeatureRow) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(row))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / self.normalizer)
    }

    /// Binary label against the calibrated threshold
    pub fn is_outlier(&self, row: &FeatureRow) -> bool {
        self.score(row) > self.threshold
    }

    /// The calibrated decision threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of trees in the ensemble
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// Expected path length of an unsuccessful search in a binary tree over
/// `n` points: `2 H(n-1) - 2 (n-1)/n`.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Linearly interpolated quantile; `q` in [0, 1]. Sorts in place.
fn quantile(values: &mut [f64], q: f64) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let position = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let weight = position - lower as f64;
        values[lower] * (1.0 - weight) + values[upper] * weight
    }
}
