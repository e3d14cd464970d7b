//! Training result types.

use crate::config::InputMode;
use crate::dataset::EncodedDataset;
use crate::forest::Forest;
use crate::serialize::Model;

/// Held-out score of one cross-validation fold.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FoldScore {
    /// Zero-based fold index.
    pub fold: usize,
    /// Percentage of held-out rows predicted correctly.
    pub accuracy: f64,
    /// Rows the fold's trees were trained on.
    pub n_train: usize,
    /// Held-out rows scored.
    pub n_test: usize,
}

/// Metadata about the training run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingMetadata {
    /// Number of encoded rows.
    pub n_rows: usize,
    /// Number of feature columns.
    pub n_features: usize,
    /// Number of distinct labels.
    pub n_classes: usize,
    /// Number of cross-validation folds.
    pub n_folds: usize,
    /// Trees grown in each fold.
    pub trees_per_fold: usize,
    /// Resolved max_features value used.
    pub max_features_resolved: usize,
}

/// Result of cross-validated training.
#[derive(Debug)]
pub struct TrainingReport {
    forest: Forest,
    fold_scores: Vec<FoldScore>,
    metadata: TrainingMetadata,
    mode: InputMode,
}

impl TrainingReport {
    pub(crate) fn new(
        forest: Forest,
        fold_scores: Vec<FoldScore>,
        metadata: TrainingMetadata,
        mode: InputMode,
    ) -> Self {
        Self {
            forest,
            fold_scores,
            metadata,
            mode,
        }
    }

    /// Borrow the trained forest.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Consume the report and return the trained forest.
    #[must_use]
    pub fn into_forest(self) -> Forest {
        self.forest
    }

    /// Per-fold scores, ordered by fold index.
    #[must_use]
    pub fn fold_scores(&self) -> &[FoldScore] {
        &self.fold_scores
    }

    /// Mean held-out accuracy across folds, in percent.
    #[must_use]
    pub fn mean_accuracy(&self) -> f64 {
        if self.fold_scores.is_empty() {
            return 0.0;
        }
        self.fold_scores.iter().map(|s| s.accuracy).sum::<f64>() / self.fold_scores.len() as f64
    }

    /// Population standard deviation of fold accuracies.
    #[must_use]
    pub fn std_accuracy(&self) -> f64 {
        if self.fold_scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean_accuracy();
        let var = self
            .fold_scores
            .iter()
            .map(|s| (s.accuracy - mean).powi(2))
            .sum::<f64>()
            / self.fold_scores.len() as f64;
        var.sqrt()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Input mode the training config was built with.
    #[must_use]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Assemble the persistable model from this report and the dataset it
    /// was trained on.
    #[must_use]
    pub fn to_model(&self, dataset: &EncodedDataset) -> Model {
        Model {
            forest: self.forest.clone(),
            dictionary: dataset.dictionary().clone(),
            schema: dataset.schema(),
            mode: self.mode,
        }
    }
}
