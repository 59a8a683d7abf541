//! YAML front matter extraction.
//!
//! Front matter is a YAML block delimited by `---` lines at the very start of
//! the document. It is decoded twice: once as a generic mapping whose string
//! values become flat metadata, and once as a typed structure for the nested
//! `display` and `formats` blocks.

use std::collections::{BTreeMap, HashMap};

use mtc_formats::DisplayLocalization;
use serde::Deserialize;
use serde_json::{Map, Value};

const FENCE: &str = "---";

/// Metadata extracted from a document's front matter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrontMatter {
    /// Top-level string values.
    pub metadata: BTreeMap<String, String>,
    /// `display` block: locale -> localized name/description.
    pub display: BTreeMap<String, DisplayLocalization>,
    /// `formats` block: format name -> override object.
    pub formats: HashMap<String, Map<String, Value>>,
    /// Byte offset where the markdown body starts (0 without front matter).
    pub body_offset: usize,
}

/// Nested front matter blocks.
#[derive(Default, Deserialize)]
struct StructuredFields {
    display: Option<BTreeMap<String, DisplayLocalization>>,
    formats: Option<HashMap<String, Map<String, Value>>>,
}

/// Extract front matter from markdown content.
///
/// Never fails: a missing fence yields an empty result, and YAML that cannot
/// be decoded yields an empty result plus a `warn` diagnostic. Wrongly shaped
/// `display` or `formats` blocks are dropped with a warning while the flat
/// metadata is kept. The body offset
/// is still set when both fences are present so the block is never rendered
/// as markdown.
pub fn extract_front_matter(content: &str) -> FrontMatter {
    let Some((block, body_offset)) = split_front_matter(content) else {
        return FrontMatter::default();
    };
    let empty = FrontMatter {
        body_offset,
        ..FrontMatter::default()
    };

    if block.trim().is_empty() {
        return empty;
    }

    let generic: serde_yaml::Value = match serde_yaml::from_str(block) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed front matter");
            return empty;
        }
    };
    let structured = serde_yaml::from_str::<StructuredFields>(block).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring malformed display and formats blocks");
        StructuredFields::default()
    });

    let metadata = generic
        .as_mapping()
        .map(|mapping| {
            mapping
                .iter()
                .filter_map(|(key, value)| Some((key.as_str()?.to_owned(), value.as_str()?.to_owned())))
                .collect()
        })
        .unwrap_or_default();

    FrontMatter {
        metadata,
        display: structured.display.unwrap_or_default(),
        formats: structured.formats.unwrap_or_default(),
        body_offset,
    }
}

/// Locate the front matter block.
///
/// Returns the YAML text between the fences and the byte offset just past the
/// closing fence line. Fence lines may carry trailing whitespace or `\r`.
fn split_front_matter(content: &str) -> Option<(&str, usize)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FENCE {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Some((&content[start..offset], offset + line.len()));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_no_front_matter() {
        let fm = extract_front_matter("# Title\n\nBody");
        assert_eq!(fm, FrontMatter::default());
    }

    #[test]
    fn test_flat_string_values() {
        let content = "---\nvct: https://example.com/pid\nbackground_color: \"#12107c\"\nversion: 3\n---\n# Title\n";
        let fm = extract_front_matter(content);

        assert_eq!(fm.metadata.get("vct").map(String::as_str), Some("https://example.com/pid"));
        assert_eq!(fm.metadata.get("background_color").map(String::as_str), Some("#12107c"));
        assert!(!fm.metadata.contains_key("version"));
        assert_eq!(&content[fm.body_offset..], "# Title\n");
    }

    #[test]
    fn test_display_block() {
        let content = "---\ndisplay:\n  sv:\n    name: Identitet\n    description: Beskrivning\n  de:\n    name: Ausweis\n---\n";
        let fm = extract_front_matter(content);

        assert_eq!(fm.display.len(), 2);
        assert_eq!(
            fm.display["sv"],
            DisplayLocalization {
                name: "Identitet".to_owned(),
                description: "Beskrivning".to_owned(),
            }
        );
        assert_eq!(fm.display["de"].description, "");
        assert!(!fm.metadata.contains_key("display"));
    }

    #[test]
    fn test_formats_block() {
        let content = "---\nformats:\n  mddl:\n    doctype: eu.europa.ec.eudi.pid.1\n    order: 2\n  w3c:\n    type: [IdentityCredential]\n    claims:\n      given_name: givenName\n---\n";
        let fm = extract_front_matter(content);

        assert_eq!(fm.formats["mddl"]["doctype"], json!("eu.europa.ec.eudi.pid.1"));
        assert_eq!(fm.formats["mddl"]["order"], json!(2));
        assert_eq!(fm.formats["w3c"]["type"], json!(["IdentityCredential"]));
        assert_eq!(fm.formats["w3c"]["claims"], json!({"given_name": "givenName"}));
    }

    #[test]
    fn test_missing_closing_fence() {
        let fm = extract_front_matter("---\nvct: x\n# Title\n");
        assert_eq!(fm, FrontMatter::default());
    }

    #[test]
    fn test_malformed_yaml_yields_empty() {
        let content = "---\nvct: [unclosed\n---\n# Title\n";
        let fm = extract_front_matter(content);
        assert!(fm.metadata.is_empty());
        assert!(fm.display.is_empty());
        assert_eq!(&content[fm.body_offset..], "# Title\n");
    }

    #[test]
    fn test_scalar_display_keeps_flat_metadata() {
        let content = "---\nvct: https://example.com/pid\nname: PID\ndisplay: not-a-map\n---\n# T\n";
        let fm = extract_front_matter(content);

        assert_eq!(fm.metadata.get("vct").map(String::as_str), Some("https://example.com/pid"));
        assert_eq!(fm.metadata.get("name").map(String::as_str), Some("PID"));
        assert!(fm.display.is_empty());
        assert_eq!(&content[fm.body_offset..], "# T\n");
    }

    #[test]
    fn test_scalar_format_override_keeps_flat_metadata() {
        let content = "---\nvct: https://example.com/pid\nformats:\n  vctm: x\n---\n";
        let fm = extract_front_matter(content);

        assert_eq!(fm.metadata.get("vct").map(String::as_str), Some("https://example.com/pid"));
        assert!(fm.formats.is_empty());
    }

    #[test]
    fn test_crlf_fences() {
        let content = "---\r\nid: pid\r\n---  \r\nBody";
        let fm = extract_front_matter(content);
        assert_eq!(fm.metadata.get("id").map(String::as_str), Some("pid"));
        assert_eq!(&content[fm.body_offset..], "Body");
    }

    #[test]
    fn test_empty_block() {
        let content = "---\n---\n# Title";
        let fm = extract_front_matter(content);
        assert!(fm.metadata.is_empty());
        assert_eq!(fm.body_offset, 8);
    }

    #[test]
    fn test_dashes_must_be_whole_line() {
        let fm = extract_front_matter("----\nid: pid\n----\n");
        assert_eq!(fm, FrontMatter::default());
    }
}
