//! Format generator trait and shared generation settings.

use crate::{FormatError, ParsedCredential};

/// Settings shared by all generators for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Base URL for asset URLs and identifier derivation.
    pub base_url: Option<String>,
    /// Default locale for display entries.
    pub language: String,
    /// Embed images as `data:` URIs instead of URL + integrity pairs.
    pub inline_images: bool,
}

impl GeneratorConfig {
    /// Base URL without trailing slash, if configured and non-empty.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            language: "en-US".to_owned(),
            inline_images: false,
        }
    }
}

/// A generator for one credential metadata format.
///
/// Implementations are stateless and shared across conversions, so they must
/// be `Send + Sync`.
pub trait FormatGenerator: Send + Sync {
    /// Format identifier used on the command line and in `formats.<name>` blocks.
    fn name(&self) -> &'static str;

    /// Human-readable description of the format.
    fn description(&self) -> &'static str;

    /// Output file extension without the leading dot.
    fn file_extension(&self) -> &'static str;

    /// Derive the format-specific identifier (vct, doctype, W3C type).
    ///
    /// Returns `None` when no identifier can be resolved.
    fn derive_identifier(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Option<String>;

    /// Generate the serialized document.
    fn generate(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Result<Vec<u8>, FormatError>;
}
