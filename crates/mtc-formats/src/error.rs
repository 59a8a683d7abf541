//! Format generation error types.

use std::path::PathBuf;

/// Error returned by the format registry and generators.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A requested format name is not registered.
    #[error("unknown format: {name} (available: {})", .available.join(", "))]
    UnknownFormat {
        /// The requested name.
        name: String,
        /// Sorted names of all registered formats.
        available: Vec<String>,
    },

    /// The format list was empty after trimming.
    #[error("no formats resolved")]
    NoFormats,

    /// A required identifier could not be resolved from the model.
    #[error("{format}: {field} is required (set {field} in front matter or provide base_url)")]
    MissingIdentifier {
        /// Format name (e.g., "mddl").
        format: &'static str,
        /// Identifier field (e.g., "doctype").
        field: &'static str,
    },

    /// The generated document failed validation before serialization.
    #[error("{format}: invalid document: {message}")]
    Validation {
        /// Format name.
        format: &'static str,
        /// What is wrong with the document.
        message: String,
    },

    /// An asset could not be read while inlining it.
    #[error("failed to read asset {}: {source}", .path.display())]
    Asset {
        /// Resolved asset path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
