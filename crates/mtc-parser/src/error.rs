//! Parser error types.

use std::path::PathBuf;

/// Error returned when a markdown document cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The markdown event stream was malformed.
    #[error("failed to walk markdown: {0}")]
    Walk(String),
}
