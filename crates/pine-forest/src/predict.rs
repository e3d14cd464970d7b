//! Prediction methods for the forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::dictionary::ClassIndex;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::tree::DecisionTree;

/// Most frequent item; ties go to the item seen first.
pub(crate) fn majority<T: PartialEq + Copy>(items: impl IntoIterator<Item = T>) -> Option<T> {
    let mut tally: Vec<(T, usize)> = Vec::new();
    for item in items {
        match tally.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, count)) => *count += 1,
            None => tally.push((item, 1)),
        }
    }
    let mut best: Option<(T, usize)> = None;
    for (item, count) in tally {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((item, count));
        }
    }
    best.map(|(item, _)| item)
}

/// Majority vote of every tree's prediction for `row`.
///
/// Ties go to the class predicted first. Returns `None` when `trees` is empty.
#[must_use]
pub fn bagging_predict(trees: &[DecisionTree], row: &[f64]) -> Option<ClassIndex> {
    majority(trees.iter().map(|tree| tree.predict_one(row)))
}

/// Percentage of positions where `predicted` matches `actual`.
///
/// Returns 0.0 for empty input.
#[must_use]
pub fn accuracy_metric(actual: &[ClassIndex], predicted: &[ClassIndex]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    correct as f64 / actual.len() as f64 * 100.0
}

impl Forest {
    /// Predict the class for one feature row by majority vote.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::PredictionFeatureMismatch`] | `row.len() != n_features` |
    /// | [`ForestError::EmptyForest`] | the forest holds no trees |
    pub fn predict(&self, row: &[f64]) -> Result<ClassIndex, ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        bagging_predict(&self.trees, row).ok_or(ForestError::EmptyForest)
    }

    /// Predict a batch of rows in parallel.
    ///
    /// # Errors
    ///
    /// Fails on the first row [`Forest::predict`] rejects.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<ClassIndex>, ForestError> {
        rows.into_par_iter().map(|row| self.predict(row)).collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Trees in fold order, then job order within each fold.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::{accuracy_metric, bagging_predict, majority};
    use crate::dictionary::ClassIndex;
    use crate::error::ForestError;
    use crate::forest::Forest;
    use crate::node::{FeatureIndex, Node, NodeIndex};
    use crate::tree::DecisionTree;

    fn stump(threshold: f64, below: usize, above: usize) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: FeatureIndex::new(0),
                    threshold,
                    left: NodeIndex::new(1),
                    right: NodeIndex::new(2),
                },
                Node::Leaf {
                    class: ClassIndex::new(below),
                },
                Node::Leaf {
                    class: ClassIndex::new(above),
                },
            ],
            n_features: 1,
        }
    }

    // --- majority ---

    #[test]
    fn majority_picks_most_frequent() {
        assert_eq!(majority([0, 0, 1, 0]), Some(0));
        assert_eq!(majority([2, 1, 1]), Some(1));
    }

    #[test]
    fn majority_tie_goes_to_first_seen() {
        assert_eq!(majority([3, 1, 1, 3]), Some(3));
        assert_eq!(majority([1, 3, 3, 1]), Some(1));
    }

    #[test]
    fn majority_of_nothing() {
        assert_eq!(majority(Vec::<usize>::new()), None);
    }

    // --- bagging_predict ---

    #[test]
    fn bagging_votes_across_trees() {
        // Predictions for x = 5.0: [0, 0, 1, 0].
        let trees = vec![
            stump(6.0, 0, 1),
            stump(7.0, 0, 1),
            stump(4.0, 0, 1),
            stump(9.0, 0, 1),
        ];
        assert_eq!(bagging_predict(&trees, &[5.0]), Some(ClassIndex::new(0)));
    }

    #[test]
    fn bagging_empty_is_none() {
        assert_eq!(bagging_predict(&[], &[1.0]), None);
    }

    // --- Forest ---

    #[test]
    fn forest_rejects_wrong_width() {
        let forest = Forest {
            trees: vec![stump(1.0, 0, 1)],
            n_features: 1,
        };
        let err = forest.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 1, got: 2 }
        ));
    }

    #[test]
    fn empty_forest_rejected() {
        let forest = Forest {
            trees: vec![],
            n_features: 1,
        };
        assert!(matches!(forest.predict(&[1.0]), Err(ForestError::EmptyForest)));
    }

    #[test]
    fn batch_matches_individual() {
        let forest = Forest {
            trees: vec![stump(2.0, 0, 1), stump(3.0, 0, 1), stump(8.0, 0, 1)],
            n_features: 1,
        };
        let rows: Vec<Vec<f64>> = (0..10).map(|x| vec![f64::from(x)]).collect();
        let batch = forest.predict_batch(&rows).unwrap();
        for (row, predicted) in rows.iter().zip(&batch) {
            assert_eq!(forest.predict(row).unwrap(), *predicted);
        }
    }

    // --- accuracy_metric ---

    #[test]
    fn accuracy_is_a_percentage() {
        let actual = [0, 1, 1, 0].map(ClassIndex::new);
        let predicted = [0, 1, 0, 0].map(ClassIndex::new);
        assert!((accuracy_metric(&actual, &predicted) - 75.0).abs() < 1e-12);
    }

    #[test]
    fn accuracy_of_nothing_is_zero() {
        assert!(accuracy_metric(&[], &[]).abs() < f64::EPSILON);
    }
}
