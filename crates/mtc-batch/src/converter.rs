//! Single-document conversion pipeline.
//!
//! Parses a markdown document into a [`ParsedCredential`] and runs each
//! requested format generator over it. A failing format never stops the
//! remaining formats.

use std::path::Path;

use mtc_formats::{FormatError, FormatRegistry, GeneratorConfig, ParsedCredential};
use mtc_parser::{MarkdownParser, ParseError};

/// Result of running one format generator.
#[derive(Debug)]
pub struct FormatOutput {
    /// Format name (e.g. `vctm`).
    pub format: String,
    /// Output file extension, `None` if the format is not registered.
    pub extension: Option<&'static str>,
    /// Serialized document or the generation error.
    pub result: Result<Vec<u8>, FormatError>,
}

impl FormatOutput {
    /// Output file name for `base` (`<base>.<extension>`).
    #[must_use]
    pub fn file_name(&self, base: &str) -> Option<String> {
        self.extension.map(|ext| format!("{base}.{ext}"))
    }
}

/// A converted document: the credential model plus one output per format.
#[derive(Debug)]
pub struct Conversion {
    pub credential: ParsedCredential,
    /// Outputs in the order the formats were requested.
    pub outputs: Vec<FormatOutput>,
}

impl Conversion {
    /// Names of formats that generated successfully.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .filter(|output| output.result.is_ok())
            .map(|output| output.format.as_str())
    }

    /// Formats that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FormatError)> {
        self.outputs
            .iter()
            .filter_map(|output| Some((output.format.as_str(), output.result.as_ref().err()?)))
    }

    /// Whether every requested format generated successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Converts markdown documents into credential metadata documents.
///
/// Borrows the format registry; generator settings are fixed for the
/// converter's lifetime.
pub struct Converter<'r> {
    registry: &'r FormatRegistry,
    parser: MarkdownParser,
    config: GeneratorConfig,
    default_vct: Option<String>,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r FormatRegistry, config: GeneratorConfig) -> Self {
        Self {
            registry,
            parser: MarkdownParser::new(),
            config,
            default_vct: None,
        }
    }

    /// Use `vct` for documents that do not declare one in front matter.
    #[must_use]
    pub fn with_default_vct(mut self, vct: Option<String>) -> Self {
        self.default_vct = vct.filter(|v| !v.is_empty());
        self
    }

    #[must_use]
    pub fn registry(&self) -> &'r FormatRegistry {
        self.registry
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Parse a markdown file and generate every requested format.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the document cannot be read or walked.
    /// Format failures are reported per output instead.
    pub fn convert_file(&self, path: &Path, formats: &[String]) -> Result<Conversion, ParseError> {
        let credential = self.parser.parse_to_credential(path)?;
        Ok(self.convert_credential(credential, formats))
    }

    /// Parse markdown content and generate every requested format.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the markdown cannot be walked.
    pub fn convert_content(
        &self,
        content: &str,
        base_path: &Path,
        formats: &[String],
    ) -> Result<Conversion, ParseError> {
        let credential = self.parser.parse_content_to_credential(content, base_path)?;
        Ok(self.convert_credential(credential, formats))
    }

    /// Generate every requested format for an already built credential.
    pub fn convert_credential(&self, mut credential: ParsedCredential, formats: &[String]) -> Conversion {
        if credential.vct.is_none() {
            credential.vct.clone_from(&self.default_vct);
        }

        let outputs = formats
            .iter()
            .map(|format| self.generate(&credential, format))
            .collect();

        Conversion { credential, outputs }
    }

    /// Identifier the `vctm` generator would assign to `credential`.
    #[must_use]
    pub fn vct(&self, credential: &ParsedCredential) -> Option<String> {
        self.registry
            .get(mtc_formats::vctm::FORMAT)?
            .derive_identifier(credential, &self.config)
    }

    fn generate(&self, credential: &ParsedCredential, format: &str) -> FormatOutput {
        let Some(generator) = self.registry.get(format) else {
            return FormatOutput {
                format: format.to_owned(),
                extension: None,
                result: Err(FormatError::UnknownFormat {
                    name: format.to_owned(),
                    available: self.registry.list(),
                }),
            };
        };

        let result = generator.generate(credential, &self.config);
        match &result {
            Ok(bytes) => tracing::debug!(id = %credential.id, format, bytes = bytes.len(), "Generated"),
            Err(e) => tracing::warn!(id = %credential.id, format, error = %e, "Format generation failed"),
        }

        FormatOutput {
            format: format.to_owned(),
            extension: Some(generator.file_extension()),
            result,
        }
    }
}
