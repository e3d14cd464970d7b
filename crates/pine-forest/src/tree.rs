use rand::Rng;
use tracing::debug;

use crate::{
    ForestError,
    dataset::{Row, Schema, label_of},
    dictionary::ClassIndex,
    node::{Node, NodeIndex},
    predict::majority,
    split::{SplitScratch, find_best_split, select_features},
};

/// Growth limits for a single tree.
///
/// | Parameter      | Meaning                                             |
/// |----------------|-----------------------------------------------------|
/// | `max_depth`    | depth at which both sides of a split become leaves  |
/// | `max_features` | resolved number of candidate features per split     |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// The root split is depth 1; `0` and `1` both stop after the root.
    pub max_depth: usize,
    /// Number of features sampled at every split.
    pub max_features: usize,
}

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

struct Builder<'a, R> {
    rows: &'a [Row],
    schema: Schema,
    params: TreeParams,
    rng: &'a mut R,
    scratch: SplitScratch,
    arena: Vec<Node>,
}

impl<R: Rng> Builder<'_, R> {
    fn push(&mut self, node: Node) -> NodeIndex {
        let idx = NodeIndex::new(self.arena.len());
        self.arena.push(node);
        idx
    }

    fn majority_of(&self, subset: &[usize]) -> Result<Option<ClassIndex>, ForestError> {
        majority(subset.iter().map(|&i| label_of(&self.rows[i], self.schema)))
            .map(ClassIndex::from_value)
            .transpose()
    }

    /// Split `subset` and attach its children. Returns the new node's index.
    fn grow_node(&mut self, subset: &[usize], depth: usize) -> Result<NodeIndex, ForestError> {
        let candidates = select_features(
            self.schema.n_features(),
            self.params.max_features,
            &mut *self.rng,
        );
        let Some(split) =
            find_best_split(self.rows, subset, &candidates, self.schema, &mut self.scratch)
        else {
            let class = self.majority_of(subset)?.ok_or(ForestError::EmptyDataset)?;
            return Ok(self.push(Node::Leaf { class }));
        };

        // Reserve the parent slot so children land at larger indices.
        let node_idx = self.push(Node::Leaf {
            class: ClassIndex::new(0),
        });

        let left_class = self.majority_of(&split.left)?;
        let right_class = self.majority_of(&split.right)?;
        let (left, right) = if depth >= self.params.max_depth
            || split.left.is_empty()
            || split.right.is_empty()
        {
            let left = self.leaf(left_class.or(right_class))?;
            let right = self.leaf(right_class.or(left_class))?;
            (left, right)
        } else {
            let left = self.child(&split.left, depth, left_class)?;
            let right = self.child(&split.right, depth, right_class)?;
            (left, right)
        };

        self.arena[node_idx.index()] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        Ok(node_idx)
    }

    fn child(
        &mut self,
        subset: &[usize],
        depth: usize,
        class: Option<ClassIndex>,
    ) -> Result<NodeIndex, ForestError> {
        if subset.len() <= 1 {
            self.leaf(class)
        } else {
            self.grow_node(subset, depth + 1)
        }
    }

    fn leaf(&mut self, class: Option<ClassIndex>) -> Result<NodeIndex, ForestError> {
        let class = class.ok_or(ForestError::EmptyDataset)?;
        Ok(self.push(Node::Leaf { class }))
    }
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `subset` (duplicates allowed).
    ///
    /// The root is always split, even when `subset` is pure. Each side then
    /// becomes a leaf holding its majority class when the depth limit is
    /// reached, when the other side is empty, or when it holds at most one
    /// row. Otherwise the side is split again, pure or not.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `subset` is empty |
    /// | [`ForestError::InvalidMaxFeatures`] | `params.max_features` is 0 or above the feature count |
    /// | [`ForestError::InvalidClassValue`] | a label slot is not a class index |
    pub fn grow(
        rows: &[Row],
        subset: &[usize],
        schema: Schema,
        params: &TreeParams,
        rng: &mut impl Rng,
    ) -> Result<Self, ForestError> {
        if subset.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = schema.n_features();
        if params.max_features == 0 || params.max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: params.max_features,
                n_features,
            });
        }

        let mut builder = Builder {
            rows,
            schema,
            params: *params,
            rng,
            scratch: SplitScratch::with_capacity(subset.len()),
            arena: Vec::new(),
        };
        builder.grow_node(subset, 1)?;

        let tree = Self {
            nodes: builder.arena,
            n_features,
        };
        debug!(
            n_rows = subset.len(),
            n_nodes = tree.n_nodes(),
            depth = tree.depth(),
            "decision tree built"
        );
        Ok(tree)
    }

    /// Predict the class for one row.
    ///
    /// Starting from the root, goes left when `row[feature] < threshold`
    /// and right otherwise. `row` must hold at least the model's features;
    /// a trailing label slot is ignored.
    #[must_use]
    pub fn predict_one(&self, row: &[f64]) -> ClassIndex {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature.index()] < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single split with two leaves has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// All nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Number of features the tree expects.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Check arena structure: children exist and follow their parent, the
    /// root has no parent and every other node has exactly one.
    pub(crate) fn is_well_formed(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let mut parents = vec![0usize; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            else {
                continue;
            };
            if feature.index() >= self.n_features {
                return false;
            }
            for child in [left.index(), right.index()] {
                if child <= i || child >= self.nodes.len() {
                    return false;
                }
                parents[child] += 1;
            }
        }
        parents[0] == 0 && parents[1..].iter().all(|&count| count == 1)
    }
}
