//! Cross-validated forest training.
//!
//! Folds train in parallel on rayon; within a fold, trees are grown by the
//! bounded pool in [`crate::pool`].

use std::sync::{Mutex, PoisonError};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::ForestConfig;
use crate::dataset::{EncodedDataset, Row, Schema, label_of};
use crate::dictionary::ClassIndex;
use crate::error::ForestError;
use crate::pool::{self, TreeJob, TreeTask};
use crate::predict::{accuracy_metric, bagging_predict};
use crate::result::{FoldScore, TrainingMetadata, TrainingReport};
use crate::split::resolve_max_features;
use crate::tree::{DecisionTree, TreeParams};

/// A trained ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Forest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
}

/// Split `0..n_rows` into `n_folds` disjoint shuffled folds.
///
/// Every fold gets `n_rows / n_folds` rows; the remainder goes to the last.
pub fn partition_folds(n_rows: usize, n_folds: usize, rng: &mut impl Rng) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n_rows).collect();
    order.shuffle(rng);
    let fold_size = n_rows / n_folds.max(1);
    let mut folds = Vec::with_capacity(n_folds);
    let mut rest = order.as_slice();
    for fold in 0..n_folds {
        let take = if fold + 1 == n_folds { rest.len() } else { fold_size };
        let (head, tail) = rest.split_at(take);
        folds.push(head.to_vec());
        rest = tail;
    }
    folds
}

/// Draw `draw_count` row indices from `train` with replacement.
pub fn bootstrap_sample(train: &[usize], draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    if train.is_empty() {
        return Vec::new();
    }
    (0..draw_count)
        .map(|_| train[rng.gen_range(0..train.len())])
        .collect()
}

/// Bootstrap size for a training subset: `ceil(fraction * n_train)`, at least 1.
pub(crate) fn draw_count(n_train: usize, fraction: f64) -> usize {
    ((n_train as f64 * fraction).ceil() as usize).max(1)
}

/// Fold partition and per-fold seeds derived from the master seed.
pub(crate) fn fold_plan(seed: u64, n_rows: usize, n_folds: usize) -> (Vec<Vec<usize>>, Vec<u64>) {
    let mut master = ChaCha8Rng::seed_from_u64(seed);
    let partition_seed: u64 = master.r#gen();
    let fold_seeds: Vec<u64> = (0..n_folds).map(|_| master.r#gen()).collect();
    let folds = partition_folds(n_rows, n_folds, &mut ChaCha8Rng::seed_from_u64(partition_seed));
    (folds, fold_seeds)
}

/// Settings shared by every fold of a run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FoldSettings {
    pub(crate) params: TreeParams,
    pub(crate) trees_per_fold: usize,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) workers: usize,
}

/// Train one fold's trees on `train` and score them on `test`.
#[instrument(skip_all, fields(fold = fold, n_train = train.len(), n_test = test.len()))]
pub(crate) fn run_fold(
    fold: usize,
    train: &[usize],
    test: &[usize],
    rows: &[Row],
    schema: Schema,
    settings: FoldSettings,
    seed: u64,
) -> Result<(Vec<DecisionTree>, FoldScore), ForestError> {
    let mut fold_rng = ChaCha8Rng::seed_from_u64(seed);
    let jobs: Vec<TreeJob> = (0..settings.trees_per_fold)
        .map(|job| TreeJob {
            job,
            seed: fold_rng.r#gen(),
        })
        .collect();
    let task = TreeTask {
        rows,
        train,
        schema,
        params: settings.params,
        draw_count: draw_count(train.len(), settings.bootstrap_fraction),
    };
    let trees = pool::grow_trees(fold, jobs, settings.workers, task)?;

    let actual = test
        .iter()
        .map(|&i| ClassIndex::from_value(label_of(&rows[i], schema)))
        .collect::<Result<Vec<_>, _>>()?;
    let predicted = test
        .iter()
        .map(|&i| bagging_predict(&trees, &rows[i]).ok_or(ForestError::EmptyForest))
        .collect::<Result<Vec<_>, _>>()?;
    let accuracy = accuracy_metric(&actual, &predicted);

    debug!(fold, accuracy, n_trees = trees.len(), "fold scored");
    Ok((
        trees,
        FoldScore {
            fold,
            accuracy,
            n_train: train.len(),
            n_test: test.len(),
        },
    ))
}

/// Cross-validate and train the forest.
#[instrument(skip_all, fields(
    trees_per_fold = config.trees_per_fold,
    n_folds = config.n_folds,
    n_rows = dataset.len(),
))]
pub(crate) fn train(
    config: &ForestConfig,
    dataset: &EncodedDataset,
) -> Result<TrainingReport, ForestError> {
    // --- Validate config ---
    if config.trees_per_fold == 0 {
        return Err(ForestError::InvalidTreeCount {
            trees_per_fold: config.trees_per_fold,
        });
    }
    if config.n_folds < 2 {
        return Err(ForestError::InvalidFoldCount {
            n_folds: config.n_folds,
        });
    }
    if !(config.bootstrap_fraction > 0.0 && config.bootstrap_fraction <= 1.0) {
        return Err(ForestError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }
    let n_rows = dataset.len();
    if n_rows < config.n_folds {
        return Err(ForestError::TooFewRowsForFolds {
            n_rows,
            n_folds: config.n_folds,
        });
    }

    let schema = dataset.schema();
    let rows = dataset.rows();
    let max_features_resolved = resolve_max_features(config.max_features, schema)?;
    let settings = FoldSettings {
        params: TreeParams {
            max_depth: config.max_depth,
            max_features: max_features_resolved,
        },
        trees_per_fold: config.trees_per_fold,
        bootstrap_fraction: config.bootstrap_fraction,
        workers: pool::worker_count(config.n_folds, config.trees_per_fold, config.workers),
    };

    info!(
        n_rows,
        n_features = schema.n_features(),
        n_classes = dataset.dictionary().len(),
        max_features = max_features_resolved,
        workers_per_fold = settings.workers,
        "training forest"
    );

    let (folds, fold_seeds) = fold_plan(config.seed, n_rows, config.n_folds);

    let fold_trees: Mutex<Vec<(usize, Vec<DecisionTree>)>> = Mutex::new(Vec::new());
    let fold_scores: Mutex<Vec<FoldScore>> = Mutex::new(Vec::new());

    (0..config.n_folds)
        .into_par_iter()
        .try_for_each(|fold| -> Result<(), ForestError> {
            let test = &folds[fold];
            let train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != fold)
                .flat_map(|(_, indices)| indices.iter().copied())
                .collect();
            let (trees, score) =
                run_fold(fold, &train, test, rows, schema, settings, fold_seeds[fold])?;
            fold_trees
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((fold, trees));
            fold_scores
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(score);
            Ok(())
        })?;

    let mut fold_trees = fold_trees.into_inner().unwrap_or_else(PoisonError::into_inner);
    let mut fold_scores = fold_scores.into_inner().unwrap_or_else(PoisonError::into_inner);
    fold_trees.sort_by_key(|(fold, _)| *fold);
    fold_scores.sort_by_key(|score| score.fold);

    let forest = Forest {
        trees: fold_trees.into_iter().flat_map(|(_, trees)| trees).collect(),
        n_features: schema.n_features(),
    };
    let metadata = TrainingMetadata {
        n_rows,
        n_features: schema.n_features(),
        n_classes: dataset.dictionary().len(),
        n_folds: config.n_folds,
        trees_per_fold: config.trees_per_fold,
        max_features_resolved,
    };
    let report = TrainingReport::new(forest, fold_scores, metadata, config.mode);

    info!(
        n_trees = report.forest().n_trees(),
        mean_accuracy = report.mean_accuracy(),
        std_accuracy = report.std_accuracy(),
        "forest training complete"
    );
    Ok(report)
}
