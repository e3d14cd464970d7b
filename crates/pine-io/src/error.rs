//! I/O error types for pine-io.

use std::path::PathBuf;

use pine_forest::ForestError;

/// Errors from reading training files and writing exports.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file contents cannot be encoded into rows.
    #[error("cannot encode {path}")]
    Encode {
        /// Path to the training file.
        path: PathBuf,
        /// Underlying encoder error.
        source: ForestError,
    },

    /// Returned when the export cannot be rendered.
    #[error("cannot render model export")]
    Export {
        /// Underlying rendering error.
        source: ForestError,
    },

    /// Returned when an output file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
