//! Parallel batch conversion of a directory tree.
//!
//! Each document is converted independently on the global rayon thread pool.
//! A document that fails to parse or write is reported without aborting the
//! batch; format failures are reported per document.

use std::fs;
use std::path::{Path, PathBuf};

use mtc_formats::FormatError;
use rayon::prelude::*;

use crate::converter::Converter;
use crate::error::BatchError;
use crate::manifest::{self, CredentialEntry, RegistryManifest};
use crate::scanner::Scanner;
use crate::writer::{copy_images, write_outputs};

/// Outcome of converting one document.
#[derive(Debug)]
pub struct DocumentReport {
    /// Source document path.
    pub source: PathBuf,
    /// Output base name relative to the output directory (e.g. `eu/pid`).
    pub base_name: String,
    /// Files written for this document.
    pub written: Vec<PathBuf>,
    /// Formats that failed, with their errors.
    pub failures: Vec<(String, FormatError)>,
    /// Manifest entry for this document.
    pub entry: CredentialEntry,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Documents that were converted (possibly with format failures).
    pub documents: Vec<DocumentReport>,
    /// Documents that could not be converted at all.
    pub errors: Vec<(PathBuf, BatchError)>,
    /// Written manifest, `None` if no documents were found.
    pub manifest_path: Option<PathBuf>,
}

impl BatchReport {
    /// Whether any document or format failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.documents.iter().any(|doc| !doc.failures.is_empty())
    }

    /// Number of format failures across all converted documents.
    #[must_use]
    pub fn format_failure_count(&self) -> usize {
        self.documents.iter().map(|doc| doc.failures.len()).sum()
    }
}

/// Converts every markdown document under an input directory.
pub struct BatchRunner<'c, 'r> {
    converter: &'c Converter<'r>,
}

impl<'c, 'r> BatchRunner<'c, 'r> {
    pub fn new(converter: &'c Converter<'r>) -> Self {
        Self { converter }
    }

    /// Convert every document under `input_dir` into `output_dir` and write
    /// the registry manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory is missing, the output
    /// directory cannot be created or the manifest cannot be written.
    /// Per-document failures are collected in the report.
    pub fn run(&self, input_dir: &Path, output_dir: &Path, formats: &[String]) -> Result<BatchReport, BatchError> {
        if !input_dir.is_dir() {
            return Err(BatchError::Io {
                path: input_dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
            });
        }

        let sources = Scanner::new(input_dir).scan();
        if sources.is_empty() {
            tracing::info!(path = %input_dir.display(), "No markdown files found");
            return Ok(BatchReport::default());
        }

        fs::create_dir_all(output_dir).map_err(BatchError::io(output_dir))?;
        tracing::info!(count = sources.len(), "Converting documents");

        let results: Vec<(PathBuf, Result<DocumentReport, BatchError>)> = sources
            .par_iter()
            .map(|source| {
                let result = self.convert_one(input_dir, output_dir, source, formats);
                (source.clone(), result)
            })
            .collect();

        let mut report = BatchReport::default();
        for (source, result) in results {
            match result {
                Ok(document) => report.documents.push(document),
                Err(e) => {
                    tracing::warn!(path = %source.display(), error = %e, "Document conversion failed");
                    report.errors.push((source, e));
                }
            }
        }

        let entries = report.documents.iter().map(|doc| doc.entry.clone()).collect();
        report.manifest_path = Some(RegistryManifest::new(entries).write(output_dir)?);
        Ok(report)
    }

    fn convert_one(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        source: &Path,
        formats: &[String],
    ) -> Result<DocumentReport, BatchError> {
        let relative = source.strip_prefix(input_dir).unwrap_or(source);
        let base_name = base_name(relative);
        tracing::debug!(path = %source.display(), base = %base_name, "Converting");

        let conversion = self.converter.convert_file(source, formats)?;
        // Assets first: a document with a missing asset must leave no outputs.
        let asset_dir = relative.parent().map_or_else(|| output_dir.to_path_buf(), |dir| output_dir.join(dir));
        copy_images(&conversion.credential, &asset_dir)?;
        let written = write_outputs(&conversion, output_dir, &base_name)?;

        let generated: Vec<String> = conversion.succeeded().map(str::to_owned).collect();
        let vctm_file = conversion
            .outputs
            .iter()
            .find(|output| output.format == mtc_formats::vctm::FORMAT && output.result.is_ok())
            .and_then(|output| output.file_name(&base_name))
            .unwrap_or_default();

        let entry = CredentialEntry {
            vct: self.converter.vct(&conversion.credential).unwrap_or_default(),
            name: conversion.credential.name.clone(),
            source_file: portable(relative),
            vctm_file,
            formats: generated,
            last_modified: manifest::last_modified(source),
        };

        let failures = conversion
            .outputs
            .into_iter()
            .filter_map(|output| Some((output.format, output.result.err()?)))
            .collect();

        Ok(DocumentReport {
            source: source.to_path_buf(),
            base_name,
            written,
            failures,
            entry,
        })
    }
}

/// Relative path without its extension, `/` separated.
fn base_name(relative: &Path) -> String {
    portable(&relative.with_extension(""))
}

fn portable(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use mtc_formats::{FormatRegistry, GeneratorConfig};
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn formats(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("pid.md")), "pid");
        assert_eq!(base_name(Path::new("eu/mdl.markdown")), "eu/mdl");
    }

    #[test]
    fn test_batch_converts_tree() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "pid.md", "# PID\n\nPerson.\n\n- `given_name`: Given name\n");
        write(input.path(), "eu/ehic.md", "# EHIC\n\nHealth card.\n\n![Logo](logo.png)\n");
        write(input.path(), "eu/logo.png", "png");

        let registry = FormatRegistry::with_defaults();
        let converter = Converter::new(
            &registry,
            GeneratorConfig {
                base_url: Some("https://registry.example.com".to_owned()),
                ..GeneratorConfig::default()
            },
        );
        let report = BatchRunner::new(&converter)
            .run(input.path(), output.path(), &formats(&["vctm", "w3c"]))
            .unwrap();

        assert!(!report.has_failures());
        assert_eq!(report.documents.len(), 2);
        assert!(output.path().join("pid.vctm.json").exists());
        assert!(output.path().join("pid.vc.json").exists());
        assert!(output.path().join("eu/ehic.vctm.json").exists());
        assert!(output.path().join("eu/logo.png").exists());

        let manifest: RegistryManifest = serde_json::from_slice(
            &fs::read(output.path().join(manifest::MANIFEST_PATH)).unwrap(),
        )
        .unwrap();
        let mut entries = manifest.credentials;
        entries.sort_by(|a, b| a.source_file.cmp(&b.source_file));
        assert_eq!(entries[0].source_file, "eu/ehic.md");
        assert_eq!(entries[0].vctm_file, "eu/ehic.vctm.json");
        assert_eq!(entries[1].vct, "https://registry.example.com/pid");
        assert_eq!(entries[1].formats, vec!["vctm", "w3c"]);
    }

    #[test]
    fn test_batch_continues_after_failures() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "a.md", "# A\n\n![Missing](missing.png)\n");
        write(input.path(), "b.md", "# B\n\nFine.\n");

        let registry = FormatRegistry::with_defaults();
        let converter = Converter::new(&registry, GeneratorConfig::default());
        let report = BatchRunner::new(&converter)
            .run(input.path(), output.path(), &formats(&["vctm", "mddl"]))
            .unwrap();

        assert!(report.has_failures());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, input.path().join("a.md"));
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.format_failure_count(), 1);
        assert_eq!(report.documents[0].failures[0].0, "mddl");
        assert!(output.path().join("b.vctm.json").exists());
        assert!(!output.path().join("a.vctm.json").exists());
        assert!(report.manifest_path.is_some());
    }

    #[test]
    fn test_missing_asset_leaves_no_outputs_outside_manifest() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write(input.path(), "a.md", "# A\n\n![Missing](missing.png)\n");
        write(input.path(), "b.md", "# B\n\nFine.\n");

        let registry = FormatRegistry::with_defaults();
        let converter = Converter::new(
            &registry,
            GeneratorConfig {
                base_url: Some("https://registry.example.com".to_owned()),
                inline_images: false,
                ..GeneratorConfig::default()
            },
        );
        let report = BatchRunner::new(&converter)
            .run(input.path(), output.path(), &formats(&["vctm", "w3c"]))
            .unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, input.path().join("a.md"));
        assert!(!output.path().join("a.vctm.json").exists());
        assert!(!output.path().join("a.vc.json").exists());
        assert!(output.path().join("b.vctm.json").exists());

        let manifest: RegistryManifest = serde_json::from_slice(
            &fs::read(output.path().join(manifest::MANIFEST_PATH)).unwrap(),
        )
        .unwrap();
        let sources: Vec<&str> = manifest.credentials.iter().map(|c| c.source_file.as_str()).collect();
        assert_eq!(sources, vec!["b.md"]);
    }

    #[test]
    fn test_batch_empty_input() {
        let input = tempfile::tempdir().unwrap();
        let output = input.path().join("out");

        let registry = FormatRegistry::with_defaults();
        let converter = Converter::new(&registry, GeneratorConfig::default());
        let report = BatchRunner::new(&converter)
            .run(input.path(), &output, &formats(&["vctm"]))
            .unwrap();

        assert!(report.documents.is_empty());
        assert_eq!(report.manifest_path, None);
        assert!(!output.exists());
    }

    #[test]
    fn test_batch_missing_input_dir() {
        let output = tempfile::tempdir().unwrap();
        let registry = FormatRegistry::with_defaults();
        let converter = Converter::new(&registry, GeneratorConfig::default());
        let result = BatchRunner::new(&converter).run(
            Path::new("/nonexistent/credentials"),
            output.path(),
            &formats(&["vctm"]),
        );
        assert!(matches!(result, Err(BatchError::Io { .. })));
    }
}
