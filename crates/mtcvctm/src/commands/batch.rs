//! `mtcvctm batch` command implementation.

use std::path::PathBuf;

use clap::Args;
use mtc_batch::{BatchReport, BatchRunner, Converter};
use mtc_config::{CliSettings, Config};
use mtc_formats::FormatRegistry;

use super::generator_config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the batch command.
#[derive(Args)]
pub(crate) struct BatchArgs {
    /// Input directory containing markdown files (default: config or current directory).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for generated files (default: config or current directory).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base URL for identifiers and image URLs with integrity.
    #[arg(long, env = "MTCVCTM_BASE_URL")]
    base_url: Option<String>,

    /// Use URLs instead of embedding images as data URIs.
    #[arg(long)]
    no_inline_images: bool,

    /// Output format(s): vctm, mddl, w3c, all (comma-separated).
    #[arg(short, long = "format")]
    format: Option<String>,

    /// Path to configuration file (default: auto-discover mtcvctm.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl BatchArgs {
    /// Execute the batch command.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot run or any document or format
    /// failed. All convertible documents are written first.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.base_url.clone(),
            inline_images: self.no_inline_images.then_some(false),
            formats: self.format.clone(),
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let registry = FormatRegistry::with_defaults();
        let formats = registry.resolve(&config.formats)?;
        let converter = Converter::new(&registry, generator_config(&config));

        output.setting("Input", config.input_dir.display());
        output.setting("Output", config.output_dir.display());
        output.setting("Formats", formats.join(", "));

        let report = BatchRunner::new(&converter).run(&config.input_dir, &config.output_dir, &formats)?;
        print_report(&output, &report);

        if report.has_failures() {
            return Err(CliError::Failed(format!(
                "{} document(s) and {} format(s) failed",
                report.errors.len(),
                report.format_failure_count()
            )));
        }
        Ok(())
    }
}

fn print_report(output: &Output, report: &BatchReport) {
    let Some(manifest) = &report.manifest_path else {
        output.notice("No markdown files found");
        return;
    };

    for document in &report.documents {
        output.setting("Processed", document.source.display());
        for path in &document.written {
            output.written(None, path);
        }
        for (format, error) in &document.failures {
            output.format_failed(format, error);
        }
    }
    for (source, error) in &report.errors {
        output.document_failed(source, error);
    }

    output.registry_summary(report.documents.len(), manifest);
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn args(input: &Path, output: &Path, config: PathBuf) -> BatchArgs {
        BatchArgs {
            input: Some(input.to_path_buf()),
            output: Some(output.to_path_buf()),
            base_url: Some("https://registry.example.com".to_owned()),
            no_inline_images: true,
            format: Some("all".to_owned()),
            config: Some(config),
            verbose: false,
        }
    }

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("mtcvctm.toml");
        fs::write(&path, "formats = \"vctm\"\n").unwrap();
        path
    }

    #[test]
    fn test_batch_writes_outputs_and_manifest() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("pid.md"), "# PID\n\nPerson.\n").unwrap();

        args(input.path(), output.path(), write_config(input.path()))
            .execute()
            .unwrap();

        assert!(output.path().join("pid.vctm.json").exists());
        assert!(output.path().join("pid.mdoc.json").exists());
        assert!(output.path().join("pid.vc.json").exists());
        assert!(output.path().join(mtc_batch::MANIFEST_PATH).exists());
    }

    #[test]
    fn test_batch_fails_after_processing_all_documents() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.md"), "# A\n\n![Missing](missing.png)\n").unwrap();
        fs::write(input.path().join("b.md"), "# B\n").unwrap();

        let err = args(input.path(), output.path(), write_config(input.path()))
            .execute()
            .unwrap_err();

        assert!(matches!(err, CliError::Failed(_)));
        assert!(output.path().join("b.vctm.json").exists());
    }
}
