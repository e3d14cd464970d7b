//! Random forest classification over text-encoded rows.
//!
//! Encodes tabular or token-sequence input into fixed-width numeric rows,
//! cross-validates a bagged forest of Gini-split decision trees with
//! per-fold worker pools, predicts by majority vote, and stores the model
//! in a versioned bincode file with a readable JSON export.

mod config;
mod dataset;
mod dictionary;
mod encode;
mod error;
mod forest;
mod node;
mod pool;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{ForestConfig, InputMode, MaxFeatures, SequenceConfig, TokenUnit};
pub use dataset::{EncodedDataset, Row, Schema};
pub use dictionary::{ClassIndex, Dictionary};
pub use encode::{
    encode, encode_prediction, encode_sequence, encode_sequence_seed, encode_tabular,
    join_tokens, parse_feature_row, tokenize,
};
pub use error::{ErrorKind, ForestError};
pub use forest::{Forest, bootstrap_sample, partition_folds};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use predict::{accuracy_metric, bagging_predict};
pub use result::{FoldScore, TrainingMetadata, TrainingReport};
pub use serialize::{FORMAT_VERSION, Model};
pub use split::{
    SplitResult, SplitScratch, count_equal, find_best_split, resolve_max_features,
    select_features,
};
pub use tree::{DecisionTree, TreeParams};
