use rand::Rng;

use crate::config::MaxFeatures;
use crate::dataset::{Row, Schema, label_of};
use crate::error::ForestError;
use crate::node::FeatureIndex;

/// Lane count for [`count_equal`].
const LANES: usize = 8;

/// Count the elements of `values` exactly equal to `target`.
///
/// This is the innermost loop of split evaluation. Values are processed in
/// fixed-width chunks with branch-free accumulation so the compiler can
/// vectorize the comparison.
#[must_use]
pub fn count_equal(target: f64, values: &[f64]) -> usize {
    let mut chunks = values.chunks_exact(LANES);
    let mut lanes = [0usize; LANES];
    for chunk in &mut chunks {
        for (lane, &value) in lanes.iter_mut().zip(chunk) {
            *lane += usize::from(value == target);
        }
    }
    let tail: usize = chunks
        .remainder()
        .iter()
        .map(|&value| usize::from(value == target))
        .sum();
    lanes.iter().sum::<usize>() + tail
}

/// Reusable buffers for partitioning a subset around a candidate threshold.
///
/// Owned by one tree build. Every buffer is cleared, never reallocated,
/// between candidates, so capacity grows to the largest subset once and
/// is then reused for the rest of the build.
#[derive(Debug, Default)]
pub struct SplitScratch {
    left: Vec<usize>,
    right: Vec<usize>,
    left_labels: Vec<f64>,
    right_labels: Vec<f64>,
    classes: Vec<(f64, usize)>,
}

impl SplitScratch {
    /// Create empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch buffers sized for subsets of up to `n_rows` rows.
    #[must_use]
    pub fn with_capacity(n_rows: usize) -> Self {
        Self {
            left: Vec::with_capacity(n_rows),
            right: Vec::with_capacity(n_rows),
            left_labels: Vec::with_capacity(n_rows),
            right_labels: Vec::with_capacity(n_rows),
            classes: Vec::new(),
        }
    }

    fn partition(
        &mut self,
        rows: &[Row],
        subset: &[usize],
        feature: FeatureIndex,
        threshold: f64,
        schema: Schema,
    ) {
        self.left.clear();
        self.right.clear();
        self.left_labels.clear();
        self.right_labels.clear();
        for &i in subset {
            let row = &rows[i];
            if row[feature.index()] < threshold {
                self.left.push(i);
                self.left_labels.push(label_of(row, schema));
            } else {
                self.right.push(i);
                self.right_labels.push(label_of(row, schema));
            }
        }
    }

    /// Tally the subset's label column as `(label, rows carrying it)` in
    /// first-appearance order.
    fn collect_classes(&mut self, rows: &[Row], subset: &[usize], schema: Schema) {
        self.classes.clear();
        for &i in subset {
            let label = label_of(&rows[i], schema);
            match self.classes.iter_mut().find(|(class, _)| *class == label) {
                Some((_, count)) => *count += 1,
                None => self.classes.push((label, 1)),
            }
        }
    }

    /// Gini score of the current partition, summed over both sides.
    ///
    /// Every row of the subset contributes its label's `p * (1 - p)` on
    /// each side, so a label carried by `k` rows counts `k` times.
    fn gini(&self) -> f64 {
        side_gini(&self.classes, &self.left_labels) + side_gini(&self.classes, &self.right_labels)
    }
}

fn side_gini(classes: &[(f64, usize)], labels: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let size = labels.len() as f64;
    classes
        .iter()
        .map(|&(class, rows)| {
            let p = count_equal(class, labels) as f64 / size;
            rows as f64 * p * (1.0 - p)
        })
        .sum()
}

/// Best split found for a subset.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// Feature used for the split.
    pub feature: FeatureIndex,
    /// Rows with `row[feature] < threshold` went left.
    pub threshold: f64,
    /// Row indices going to the left child, in subset order.
    pub left: Vec<usize>,
    /// Row indices going to the right child, in subset order.
    pub right: Vec<usize>,
    /// Summed Gini score of the two sides (lower is better).
    pub gini: f64,
}

/// Find the lowest-Gini split of `subset` among the `candidates` features.
///
/// Every row's value on a candidate feature is tried as the threshold, in
/// candidate order then subset order. Ties keep the earliest candidate.
/// Returns `None` only when `subset` or `candidates` is empty.
pub fn find_best_split(
    rows: &[Row],
    subset: &[usize],
    candidates: &[FeatureIndex],
    schema: Schema,
    scratch: &mut SplitScratch,
) -> Option<SplitResult> {
    if subset.is_empty() || candidates.is_empty() {
        return None;
    }
    scratch.collect_classes(rows, subset, schema);

    let mut best_gini = f64::INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;
    for &feature in candidates {
        for &i in subset {
            let threshold = rows[i][feature.index()];
            scratch.partition(rows, subset, feature, threshold, schema);
            let gini = scratch.gini();
            if gini < best_gini {
                best_gini = gini;
                best = Some((feature, threshold));
            }
        }
    }

    let (feature, threshold) = best?;
    scratch.partition(rows, subset, feature, threshold, schema);
    Some(SplitResult {
        feature,
        threshold,
        left: scratch.left.clone(),
        right: scratch.right.clone(),
        gini: best_gini,
    })
}

/// Draw `m` distinct feature indices from `0..n_features` in draw order.
///
/// Partial Fisher-Yates: only the first `m` positions are shuffled.
pub fn select_features(n_features: usize, m: usize, rng: &mut impl Rng) -> Vec<FeatureIndex> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = m.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order[..take].iter().map(|&f| FeatureIndex::new(f)).collect()
}

/// Resolve a [`MaxFeatures`] strategy to a concrete count for `schema`.
///
/// # Errors
///
/// Returns [`ForestError::InvalidMaxFeatures`] when the count is zero or
/// exceeds the number of features.
pub fn resolve_max_features(max_features: MaxFeatures, schema: Schema) -> Result<usize, ForestError> {
    let n_features = schema.n_features();
    let m = match max_features {
        MaxFeatures::Sqrt => {
            let root = (schema.columns_per_row() as f64).sqrt().round() as usize;
            root.clamp(1, n_features)
        }
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if m == 0 || m > n_features {
        return Err(ForestError::InvalidMaxFeatures {
            max_features: m,
            n_features,
        });
    }
    Ok(m)
}
