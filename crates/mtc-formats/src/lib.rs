//! Credential metadata formats for mtcvctm.
//!
//! This crate holds the format-agnostic [`ParsedCredential`] model and the
//! generators that project it into concrete metadata documents:
//!
//! - [`VctmGenerator`]: SD-JWT VC Type Metadata (`vctm`)
//! - [`MddlGenerator`]: ISO 18013-5 `mso_mdoc` credential configuration (`mddl`)
//! - [`W3cGenerator`]: W3C Verifiable Credential schema (`w3c`)
//!
//! Generators are looked up through an explicit [`FormatRegistry`] value that
//! the caller constructs once and passes into the conversion pipeline.
//!
//! # Derivation precedence
//!
//! Every generator resolves identifiers the same way (see [`resolve_precedence`]):
//!
//! 1. An explicit, format-specific field on the model (e.g. `doctype`)
//! 2. The `formats.<name>` override block from front matter
//! 3. A default derived from universal fields (base URL, id, name)
//!
//! # Example
//!
//! ```
//! use mtc_formats::{FormatRegistry, GeneratorConfig, ParsedCredential};
//!
//! let registry = FormatRegistry::with_defaults();
//! let credential = ParsedCredential {
//!     id: "pid".to_owned(),
//!     name: "Person Identification Data".to_owned(),
//!     ..ParsedCredential::default()
//! };
//!
//! let generator = registry.get("w3c").unwrap();
//! let json = generator.generate(&credential, &GeneratorConfig::default()).unwrap();
//! assert!(String::from_utf8(json).unwrap().contains("PersonIdentificationData"));
//! ```

pub mod assets;
mod error;
mod generator;
pub mod mddl;
mod model;
mod precedence;
mod registry;
pub mod vctm;
pub mod w3c;

pub use error::FormatError;
pub use generator::{FormatGenerator, GeneratorConfig};
pub use mddl::MddlGenerator;
pub use model::{
    ClaimDefinition, ClaimLocalization, DisplayLocalization, ImageRef, ParsedCredential, ValueType,
};
pub use precedence::{localized_displays, resolve_claim_name, resolve_precedence};
pub use registry::FormatRegistry;
pub use vctm::VctmGenerator;
pub use w3c::W3cGenerator;
