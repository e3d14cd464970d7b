use std::path::PathBuf;

/// Broad classification of a [`ForestError`].
///
/// Every kind is fatal for the operation that produced it; nothing is
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input data is malformed (bad numbers, inconsistent widths, empty).
    InputFormat,
    /// A logic or configuration defect surfaced at run time.
    InvariantViolation,
    /// A configuration value is out of its valid range.
    Configuration,
    /// The model file could not be created, read or decoded.
    Resource,
}

/// Errors from encoding, training, prediction and model storage.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when trees_per_fold is zero.
    #[error("trees_per_fold must be at least 1, got {trees_per_fold}")]
    InvalidTreeCount {
        /// The invalid trees_per_fold value provided.
        trees_per_fold: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of feature columns in the dataset.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when the sequence window length is zero.
    #[error("sequence length must be at least 1, got {length}")]
    InvalidSequenceLength {
        /// The invalid window length.
        length: usize,
    },

    /// Returned when there are fewer rows than folds.
    #[error("dataset has {n_rows} rows, need at least {n_folds} for {n_folds}-fold cross-validation")]
    TooFewRowsForFolds {
        /// Number of encoded rows.
        n_rows: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when prediction is attempted with no trees.
    #[error("forest has no trees")]
    EmptyForest,

    /// Returned when the input contains no rows.
    #[error("input contains no rows")]
    EmptyDataset,

    /// Returned when rows have no feature column in front of the label.
    #[error("rows have {columns} column(s), need at least one feature plus the label")]
    ZeroFeatures {
        /// Number of columns found in the first row.
        columns: usize,
    },

    /// Returned when a feature field is not a finite number.
    #[error("row {row}, column {column}: cannot parse \"{raw}\" as a finite number")]
    InvalidNumber {
        /// One-based input line of the offending row.
        row: usize,
        /// Zero-based column index of the offending field.
        column: usize,
        /// The raw field text.
        raw: String,
    },

    /// Returned when a row has a different field count than the first row.
    #[error("row {row} has {got} columns, expected {expected}")]
    InconsistentRowWidth {
        /// One-based input line of the offending row.
        row: usize,
        /// Column count fixed by the first row.
        expected: usize,
        /// Column count of this row.
        got: usize,
    },

    /// Returned when a prediction row does not match the model's feature count.
    #[error("prediction input has {got} fields, expected {expected} features")]
    PredictionFeatureMismatch {
        /// The number of features the model expects.
        expected: usize,
        /// The number of fields provided.
        got: usize,
    },

    /// Returned when the CSV reader rejects a record.
    #[error("malformed CSV input")]
    Csv {
        /// The underlying CSV error.
        #[from]
        source: csv::Error,
    },

    /// Returned when a class index was never assigned by the dictionary.
    #[error("class index {index} is not in the dictionary ({len} labels)")]
    UnknownClassIndex {
        /// The unresolved class index.
        index: usize,
        /// Number of labels in the dictionary.
        len: usize,
    },

    /// Returned when a label slot does not hold a non-negative integer.
    #[error("label slot holds {value}, which is not a class index")]
    InvalidClassValue {
        /// The raw slot value.
        value: f64,
    },

    /// Returned when a sequence recency weight falls outside (0, 1].
    #[error("sequence weight {weight} is outside (0, 1]")]
    WeightOutOfRange {
        /// The computed weight.
        weight: f64,
    },

    /// Returned when the tree worker pool stops before delivering every tree.
    #[error("tree worker pool failed in fold {fold}: {reason}")]
    WorkerPool {
        /// The fold whose pool failed.
        fold: usize,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a decoded model is internally inconsistent.
    #[error("corrupt model: {reason}")]
    CorruptModel {
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// Returned when the readable export cannot be produced.
    #[error("failed to render model export")]
    Export {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

impl ForestError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::EmptyDataset
            | ForestError::ZeroFeatures { .. }
            | ForestError::InvalidNumber { .. }
            | ForestError::InconsistentRowWidth { .. }
            | ForestError::PredictionFeatureMismatch { .. }
            | ForestError::Csv { .. } => ErrorKind::InputFormat,

            ForestError::UnknownClassIndex { .. }
            | ForestError::InvalidClassValue { .. }
            | ForestError::WeightOutOfRange { .. }
            | ForestError::WorkerPool { .. } => ErrorKind::InvariantViolation,

            ForestError::InvalidTreeCount { .. }
            | ForestError::InvalidFoldCount { .. }
            | ForestError::InvalidMaxFeatures { .. }
            | ForestError::InvalidBootstrapFraction { .. }
            | ForestError::InvalidSequenceLength { .. }
            | ForestError::TooFewRowsForFolds { .. }
            | ForestError::EmptyForest => ErrorKind::Configuration,

            ForestError::SerializeModel { .. }
            | ForestError::DeserializeModel { .. }
            | ForestError::WriteModel { .. }
            | ForestError::ReadModel { .. }
            | ForestError::IncompatibleModelVersion { .. }
            | ForestError::CorruptModel { .. }
            | ForestError::Export { .. } => ErrorKind::Resource,
        }
    }
}
