//! Training file reader.

use std::path::{Path, PathBuf};

use pine_forest::{Dictionary, EncodedDataset, InputMode, encode};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a training file and encodes it into rows.
///
/// Tabular files hold one record per line, numeric features followed by a
/// string label, with no header. Sequence files are free text split into
/// tokens.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::Encode`] | Contents cannot be encoded in the requested mode |
pub struct TrainingFileReader {
    path: PathBuf,
}

impl TrainingFileReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Path this reader was created with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and encode it per `mode`, interning labels into
    /// `dictionary`.
    #[instrument(skip(self, dictionary), fields(path = %self.path.display()))]
    pub fn read(
        &self,
        mode: InputMode,
        dictionary: &mut Dictionary,
    ) -> Result<EncodedDataset, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(n_bytes = text.len(), "read training file");

        let dataset = encode(&text, mode, dictionary).map_err(|e| IoError::Encode {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            n_rows = dataset.len(),
            n_features = dataset.schema().n_features(),
            n_labels = dictionary.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}
