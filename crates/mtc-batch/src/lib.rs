//! Conversion pipeline and batch processing for mtcvctm.
//!
//! [`Converter`] turns one markdown document into one output per requested
//! format. [`BatchRunner`] applies it to every document under a directory in
//! parallel, copies referenced images, and writes a registry manifest to
//! `.well-known/vctm-registry.json`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use mtc_batch::{BatchRunner, Converter};
//! use mtc_formats::{FormatRegistry, GeneratorConfig};
//!
//! let registry = FormatRegistry::with_defaults();
//! let formats = registry.resolve("all").unwrap();
//! let converter = Converter::new(&registry, GeneratorConfig::default());
//!
//! let report = BatchRunner::new(&converter)
//!     .run(Path::new("credentials"), Path::new("dist"), &formats)
//!     .unwrap();
//! assert!(!report.has_failures());
//! ```

mod converter;
mod error;
mod manifest;
mod runner;
mod scanner;
mod writer;

pub use converter::{Conversion, Converter, FormatOutput};
pub use error::BatchError;
pub use manifest::{CredentialEntry, MANIFEST_PATH, RegistryManifest, RepositoryInfo, last_modified};
pub use runner::{BatchReport, BatchRunner, DocumentReport};
pub use scanner::Scanner;
pub use writer::{copy_images, write_file, write_outputs};
