//! Markdown credential definition parser.
//!
//! A credential definition is a markdown document with optional YAML front
//! matter. The first `#` heading names the credential, the paragraph after it
//! describes it, and top-level list items whose text starts with a
//! backtick-quoted name declare claims:
//!
//! ```markdown
//! - `given_name` "Given Name" (string): The given name [mandatory, sd=always]
//!   - sv: "Förnamn" - Personens förnamn
//! ```
//!
//! Nested list items under a claim carry locale-specific labels.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use mtc_parser::MarkdownParser;
//!
//! let content = "# Identity\n\nBasic identity.\n\n- `given_name` (string): Given name\n";
//! let credential = MarkdownParser::new()
//!     .parse_content_to_credential(content, Path::new("identity.md"))
//!     .unwrap();
//!
//! assert_eq!(credential.id, "identity");
//! assert_eq!(credential.claims[0].name, "given_name");
//! ```

mod builder;
mod error;
mod front_matter;
pub mod grammar;
mod walker;

pub use builder::build_credential;
pub use error::ParseError;
pub use front_matter::{FrontMatter, extract_front_matter};
pub use grammar::{ClaimDef, LocaleOverride, ParsedLine, parse_claim, parse_line, parse_locale};
pub use walker::{MarkdownParser, ParsedMarkdown, TITLE_SECTION};
