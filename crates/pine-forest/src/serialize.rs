//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::InputMode;
use crate::dataset::Schema;
use crate::dictionary::Dictionary;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::node::Node;

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Everything prediction needs: the trees, the label dictionary, the row
/// layout and the input mode used while training.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    /// The trained ensemble.
    pub forest: Forest,
    /// Label dictionary built while encoding the training data.
    pub dictionary: Dictionary,
    /// Row layout shared by training and prediction.
    pub schema: Schema,
    /// How input text is encoded into rows.
    pub mode: InputMode,
}

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the forest.
    n_trees: usize,
    /// Number of distinct labels.
    n_labels: usize,
    /// The serialized model.
    model: Model,
}

/// Readable export written next to the binary model.
#[derive(serde::Serialize)]
struct ModelExport<'a> {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    labels: &'a [String],
    model: &'a Model,
}

impl Model {
    /// Encode the model into its versioned binary form.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::SerializeModel`] when bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ForestError> {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.forest.n_trees(),
            n_labels: self.dictionary.len(),
            model: self.clone(),
        };
        bincode::serialize(&envelope).map_err(|e| ForestError::SerializeModel { source: e })
    }

    /// Decode a model produced by [`Model::to_bytes`].
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ForestError::CorruptModel`] | the decoded model is inconsistent |
    pub fn from_bytes(bytes: &[u8], origin: impl AsRef<Path>) -> Result<Self, ForestError> {
        let origin = origin.as_ref();
        let envelope: ModelEnvelope =
            bincode::deserialize(bytes).map_err(|e| ForestError::DeserializeModel {
                path: origin.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: origin.to_path_buf(),
            });
        }

        let model = envelope.model;
        model.check(envelope.n_trees, envelope.n_labels)?;
        Ok(model)
    }

    fn check(&self, n_trees: usize, n_labels: usize) -> Result<(), ForestError> {
        let corrupt = |reason: String| Err(ForestError::CorruptModel { reason });
        if !self.dictionary.is_consistent() || self.dictionary.len() != n_labels {
            return corrupt("label dictionary maps disagree".to_string());
        }
        if self.forest.n_trees() != n_trees {
            return corrupt(format!(
                "header lists {n_trees} trees, found {}",
                self.forest.n_trees()
            ));
        }
        if self.forest.n_features() != self.schema.n_features() {
            return corrupt(format!(
                "forest expects {} features, schema has {}",
                self.forest.n_features(),
                self.schema.n_features()
            ));
        }
        if let Some(i) = self.forest.trees().iter().position(|t| {
            !t.is_well_formed()
                || t.nodes().iter().any(|node| match node {
                    Node::Leaf { class } => class.index() >= self.dictionary.len(),
                    Node::Split { .. } => false,
                })
        }) {
            return corrupt(format!("tree {i} is malformed"));
        }
        Ok(())
    }

    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.forest.n_trees(),
            n_labels = self.dictionary.len(),
            "model saved"
        );
        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ForestError::CorruptModel`] | the decoded model is inconsistent |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        let model = Self::from_bytes(&bytes, path)?;

        debug!(
            n_trees = model.forest.n_trees(),
            n_features = model.schema.n_features(),
            n_labels = model.dictionary.len(),
            "model loaded"
        );
        Ok(model)
    }

    /// Render the readable JSON export.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Export`] when JSON rendering fails.
    pub fn to_json_pretty(&self) -> Result<String, ForestError> {
        let export = ModelExport {
            format_version: FORMAT_VERSION,
            n_trees: self.forest.n_trees(),
            n_features: self.schema.n_features(),
            labels: self.dictionary.labels(),
            model: self,
        };
        serde_json::to_string_pretty(&export).map_err(|e| ForestError::Export { source: e })
    }
}
