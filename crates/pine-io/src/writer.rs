//! Readable JSON export of a trained model.

use std::fs;
use std::path::{Path, PathBuf};

use pine_forest::Model;
use tracing::{info, instrument};

use crate::IoError;

/// Writes the readable JSON export of a [`Model`].
///
/// By default the export sits next to the binary model with its extension
/// replaced by `.json`, so `forest.bin` exports to `forest.json`.
pub struct ExportWriter {
    output: PathBuf,
}

impl ExportWriter {
    /// Export to an explicit path.
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
        }
    }

    /// Export next to the binary model at `model_path`.
    pub fn beside(model_path: &Path) -> Self {
        Self {
            output: model_path.with_extension("json"),
        }
    }

    /// Destination path of the export.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Render `model` and write it, returning the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Export`] | JSON rendering failed |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all, fields(path = %self.output.display()))]
    pub fn write(&self, model: &Model) -> Result<&Path, IoError> {
        let json = model
            .to_json_pretty()
            .map_err(|e| IoError::Export { source: e })?;
        fs::write(&self.output, &json).map_err(|e| IoError::WriteFile {
            path: self.output.clone(),
            source: e,
        })?;

        info!(size_bytes = json.len(), "model export written");
        Ok(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beside_replaces_extension() {
        let writer = ExportWriter::beside(Path::new("/models/forest.bin"));
        assert_eq!(writer.output(), Path::new("/models/forest.json"));
    }

    #[test]
    fn beside_adds_extension_when_missing() {
        let writer = ExportWriter::beside(Path::new("forest"));
        assert_eq!(writer.output(), Path::new("forest.json"));
    }

    #[test]
    fn explicit_path_is_kept() {
        let writer = ExportWriter::new(Path::new("out/readable.txt"));
        assert_eq!(writer.output(), Path::new("out/readable.txt"));
    }
}
