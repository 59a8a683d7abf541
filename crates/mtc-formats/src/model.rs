//! Format-agnostic credential model.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credential metadata extracted from markdown, independent of any output format.
///
/// Carries the identifiers for all target formats plus everything needed to
/// derive them. Owned exclusively by a single conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedCredential {
    /// Short identifier (file stem unless set in front matter).
    pub id: String,
    /// Human-readable name (first H1 heading).
    pub name: String,
    /// Description (first paragraph after the title).
    pub description: String,

    /// SD-JWT VC type identifier.
    pub vct: Option<String>,
    /// `mso_mdoc` document type.
    pub doctype: Option<String>,
    /// `mso_mdoc` namespace.
    pub namespace: Option<String>,
    /// W3C VC `type` array.
    pub w3c_types: Vec<String>,
    /// W3C VC `@context` array.
    pub w3c_context: Vec<String>,

    pub background_color: Option<String>,
    pub text_color: Option<String>,
    /// Logo path as written in front matter.
    pub logo_path: Option<String>,
    pub logo_alt_text: Option<String>,
    /// Logo path resolved against the source directory.
    pub logo_abs_path: Option<PathBuf>,

    /// SVG template path relative to the source document.
    pub svg_template_path: Option<String>,
    /// SVG template URI used verbatim.
    pub svg_template_uri: Option<String>,
    /// Integrity value for the SVG template.
    pub svg_template_integrity: Option<String>,

    /// Markdown file this credential was parsed from.
    pub source_path: Option<PathBuf>,
    /// Directory containing the markdown file.
    pub source_dir: Option<PathBuf>,

    /// Localized credential display, keyed by locale.
    pub localizations: BTreeMap<String, DisplayLocalization>,
    /// Claims in document order.
    pub claims: Vec<ClaimDefinition>,
    /// Images in document order.
    pub images: Vec<ImageRef>,

    /// `formats.<name>` blocks from front matter, keyed by format name.
    pub format_overrides: HashMap<String, Map<String, Value>>,
    /// Bulk claim renames per format: format name -> (claim name -> emitted name).
    pub claim_mappings: HashMap<String, HashMap<String, String>>,
    /// Flat string metadata from front matter.
    pub metadata: BTreeMap<String, String>,
}

impl ParsedCredential {
    /// Get a raw override value from the `formats.<format>` block.
    pub fn format_override(&self, format: &str, key: &str) -> Option<&Value> {
        self.format_overrides.get(format)?.get(key)
    }

    /// Get a non-empty string override from the `formats.<format>` block.
    pub fn override_str(&self, format: &str, key: &str) -> Option<&str> {
        self.format_override(format, key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Get a string-list override from the `formats.<format>` block.
    ///
    /// Non-string entries are skipped. Returns `None` if the key is absent,
    /// not an array, or contains no strings. A single string is accepted as a
    /// one-element list.
    pub fn override_str_list(&self, format: &str, key: &str) -> Option<Vec<String>> {
        let list: Vec<String> = match self.format_override(format, key)? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            Value::String(s) => vec![s.clone()],
            _ => return None,
        };
        (!list.is_empty()).then_some(list)
    }

    /// Get a metadata value with surrounding whitespace and quotes removed.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    }
}

/// Localized credential display properties.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLocalization {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A single claim, independent of any output format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimDefinition {
    /// Claim identifier as written (dotted for nested claims).
    pub name: String,
    /// Path segments (`address.street` -> `["address", "street"]`).
    pub path: Vec<String>,
    /// Human-readable label.
    pub display_name: Option<String>,
    pub value_type: ValueType,
    pub description: String,
    pub mandatory: bool,
    /// Selective disclosure policy (`always`, `allowed`, `never`).
    pub sd: Option<String>,
    /// Anchor id in the SVG template.
    pub svg_id: Option<String>,
    /// Localized labels keyed by locale.
    pub localizations: BTreeMap<String, ClaimLocalization>,
    /// Per-format emitted names: format name -> claim name.
    pub format_mappings: HashMap<String, String>,
}

impl ClaimDefinition {
    /// Label for the default locale: the display name, or the claim name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Localized claim display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimLocalization {
    pub label: Option<String>,
    pub description: String,
}

/// A reference to an image in the markdown source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageRef {
    /// Path as written in the markdown.
    pub path: String,
    pub alt_text: String,
    /// Path resolved against the document directory (unchanged for URLs).
    pub absolute_path: PathBuf,
}

impl ImageRef {
    /// Whether the image is an SVG (by extension, case-insensitive).
    pub fn is_svg(&self) -> bool {
        is_svg_path(&self.path)
    }
}

/// Check whether a path names an SVG file.
pub(crate) fn is_svg_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".svg")
}

/// Claim value type tag.
///
/// Parsed case-insensitively; unknown tags are preserved in [`ValueType::Other`]
/// and treated as strings by the generators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
    DateTime,
    Image,
    Object,
    Array,
    Other(String),
}

impl ValueType {
    /// Parse a type tag. Empty input yields the default `string` type.
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "" | "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "image" => Self::Image,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => Self::Other(tag.to_owned()),
        }
    }

    /// Canonical tag name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Image => "image",
            Self::Object => "object",
            Self::Array => "array",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
