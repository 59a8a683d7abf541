//! Batch error types.

use std::path::PathBuf;

use mtc_formats::FormatError;
use mtc_parser::ParseError;

/// Error returned by the conversion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The source document could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Format resolution or generation failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A file or directory could not be read or written.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The registry manifest could not be serialized.
    #[error("failed to serialize registry manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
