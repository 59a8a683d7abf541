//! Conversion from parsed markdown to the format-agnostic credential model.

use std::collections::HashMap;
use std::path::Path;

use mtc_formats::{ClaimDefinition, ParsedCredential};
use serde_json::Value;

use crate::grammar::ClaimDef;
use crate::walker::{MarkdownParser, ParsedMarkdown};
use crate::ParseError;

/// Keys inside a `formats.<name>` block holding bulk claim renames.
const CLAIM_MAPPING_KEYS: [&str; 2] = ["claims", "claim_mappings"];

/// Build a [`ParsedCredential`] from parsed markdown.
///
/// Known front matter keys are routed to typed fields; the full metadata map
/// is kept as well. Performs no validation.
pub fn build_credential(parsed: &ParsedMarkdown, source_path: Option<&Path>) -> ParsedCredential {
    let meta = |key: &str| {
        parsed
            .metadata
            .get(key)
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    let source_dir = source_path.and_then(Path::parent).map(Path::to_path_buf);
    let id = meta("id")
        .or_else(|| {
            source_path
                .and_then(Path::file_stem)
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let logo_path = meta("logo");
    let logo_abs_path = logo_path
        .as_deref()
        .filter(|logo| !is_remote(logo))
        .map(|logo| match &source_dir {
            Some(dir) => dir.join(logo),
            None => Path::new(logo).to_path_buf(),
        });

    ParsedCredential {
        id,
        name: parsed.title.clone(),
        description: parsed.description.clone(),
        vct: meta("vct"),
        doctype: meta("doctype"),
        namespace: meta("namespace"),
        background_color: meta("background_color"),
        text_color: meta("text_color"),
        logo_path,
        logo_alt_text: meta("logo_alt_text"),
        logo_abs_path,
        svg_template_path: meta("svg_template"),
        svg_template_uri: meta("svg_template_uri"),
        svg_template_integrity: meta("svg_template_integrity"),
        source_path: source_path.map(Path::to_path_buf),
        source_dir,
        localizations: parsed.display.clone(),
        claims: parsed.claims.iter().map(claim_definition).collect(),
        images: parsed.images.clone(),
        format_overrides: parsed.formats.clone(),
        claim_mappings: claim_mappings(parsed),
        metadata: parsed.metadata.clone(),
        ..ParsedCredential::default()
    }
}

fn claim_definition(claim: &ClaimDef) -> ClaimDefinition {
    ClaimDefinition {
        name: claim.name.clone(),
        path: claim.name.split('.').map(str::to_owned).collect(),
        display_name: claim.display_name.clone(),
        value_type: claim.value_type.clone(),
        description: claim.description.clone(),
        mandatory: claim.mandatory,
        sd: claim.sd.clone(),
        svg_id: claim.svg_id.clone(),
        localizations: claim.localizations.clone(),
        format_mappings: claim
            .format_names
            .iter()
            .map(|(format, name)| (format.clone(), name.clone()))
            .collect(),
    }
}

/// Collect bulk claim renames from each format block. Non-string values are
/// ignored.
fn claim_mappings(parsed: &ParsedMarkdown) -> HashMap<String, HashMap<String, String>> {
    parsed
        .formats
        .iter()
        .filter_map(|(format, block)| {
            let table = CLAIM_MAPPING_KEYS
                .iter()
                .find_map(|key| block.get(*key).and_then(Value::as_object))?;
            let mappings: HashMap<String, String> = table
                .iter()
                .filter_map(|(claim, name)| Some((claim.clone(), name.as_str()?.to_owned())))
                .collect();
            (!mappings.is_empty()).then(|| (format.clone(), mappings))
        })
        .collect()
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
}

impl MarkdownParser {
    /// Parse a markdown file straight into a [`ParsedCredential`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or walked.
    pub fn parse_to_credential(&self, path: &Path) -> Result<ParsedCredential, ParseError> {
        let parsed = self.parse_file(path)?;
        Ok(build_credential(&parsed, Some(path)))
    }

    /// Parse markdown content straight into a [`ParsedCredential`].
    ///
    /// # Errors
    ///
    /// Returns an error if the markdown cannot be walked.
    pub fn parse_content_to_credential(
        &self,
        content: &str,
        base_path: &Path,
    ) -> Result<ParsedCredential, ParseError> {
        let parsed = self.parse_content(content, base_path)?;
        Ok(build_credential(&parsed, Some(base_path)))
    }
}
