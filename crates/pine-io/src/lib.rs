//! Training file input and readable model export for pine.

mod error;
mod reader;
mod writer;

pub use error::IoError;
pub use reader::TrainingFileReader;
pub use writer::ExportWriter;
