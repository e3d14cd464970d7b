//! Configuration builder for forest training.

use crate::dataset::EncodedDataset;
use crate::error::ForestError;
use crate::result::TrainingReport;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `round(sqrt(columns_per_row))`, clamped to the feature count.
    Sqrt,
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

/// How raw text is turned into tokens in sequence mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TokenUnit {
    /// Every character is a token.
    Char,
    /// Whitespace-separated words are tokens.
    Word,
}

/// Window settings for sequence mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SequenceConfig {
    /// Number of prior tokens that feed each prediction.
    pub length: usize,
    /// Tokenization unit.
    pub unit: TokenUnit,
}

impl SequenceConfig {
    /// Create a sequence window configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidSequenceLength`] if `length` is zero.
    pub fn new(length: usize, unit: TokenUnit) -> Result<Self, ForestError> {
        if length == 0 {
            return Err(ForestError::InvalidSequenceLength { length });
        }
        Ok(Self { length, unit })
    }
}

/// How training and prediction input is encoded into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InputMode {
    /// Comma-separated numeric features followed by a string label.
    Tabular,
    /// Token sequences where prior tokens predict the next one.
    Sequence(SequenceConfig),
}

/// Configuration for cross-validated forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default                 |
/// |----------------------|-------------------------|
/// | `n_folds`            | 5                       |
/// | `max_depth`          | 10                      |
/// | `max_features`       | `Sqrt`                  |
/// | `bootstrap_fraction` | 2/3                     |
/// | `seed`               | 42                      |
/// | `workers`            | `None` (derived)        |
/// | `mode`               | `Tabular`               |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) trees_per_fold: usize,
    pub(crate) n_folds: usize,
    pub(crate) max_depth: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) seed: u64,
    pub(crate) workers: Option<usize>,
    pub(crate) mode: InputMode,
}

impl ForestConfig {
    /// Create a new config that grows `trees_per_fold` trees in every fold.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `trees_per_fold` is zero.
    pub fn new(trees_per_fold: usize) -> Result<Self, ForestError> {
        if trees_per_fold == 0 {
            return Err(ForestError::InvalidTreeCount { trees_per_fold });
        }
        Ok(Self {
            trees_per_fold,
            n_folds: 5,
            max_depth: 10,
            max_features: MaxFeatures::Sqrt,
            bootstrap_fraction: 2.0 / 3.0,
            seed: 42,
            workers: None,
            mode: InputMode::Tabular,
        })
    }

    // --- Setters ---

    /// Set the number of cross-validation folds.
    #[must_use]
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Set the maximum tree depth. The root split is depth 1; `0` and `1`
    /// both give a single split with two leaves.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the bootstrap fraction (proportion of the training rows drawn per tree).
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the number of tree-building workers per fold.
    #[must_use]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Set the input mode recorded with the trained model.
    #[must_use]
    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees grown per fold.
    #[must_use]
    pub fn trees_per_fold(&self) -> usize {
        self.trees_per_fold
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the bootstrap fraction.
    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the worker override, if any.
    #[must_use]
    pub fn workers(&self) -> Option<usize> {
        self.workers
    }

    /// Return the input mode.
    #[must_use]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Cross-validate and train a forest on an encoded dataset.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                           |
    /// |-------------------------------------------|------------------------------------------------|
    /// | [`ForestError::InvalidFoldCount`]         | `n_folds` < 2                                  |
    /// | [`ForestError::TooFewRowsForFolds`]       | fewer rows than folds                          |
    /// | [`ForestError::InvalidBootstrapFraction`] | bootstrap_fraction is not in (0.0, 1.0]        |
    /// | [`ForestError::InvalidMaxFeatures`]       | resolved max_features is outside [1, n_features] |
    /// | [`ForestError::WorkerPool`]               | a tree worker stopped early                    |
    pub fn fit(&self, dataset: &EncodedDataset) -> Result<TrainingReport, ForestError> {
        crate::forest::train(self, dataset)
    }
}
