//! CLI error types.

use mtc_batch::BatchError;
use mtc_config::ConfigError;
use mtc_formats::FormatError;
use mtc_parser::ParseError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("{0}")]
    Failed(String),
}
