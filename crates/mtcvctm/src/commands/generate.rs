//! `mtcvctm generate` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use mtc_batch::{Conversion, Converter, write_file};
use mtc_config::{CliSettings, Config};
use mtc_formats::FormatRegistry;

use super::generator_config;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Path to the markdown file.
    input: PathBuf,

    /// Output file path (single format only; default: <input>.<extension>).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output directory (default: directory of the input file).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Base URL for identifiers and image URLs with integrity.
    #[arg(long, env = "MTCVCTM_BASE_URL")]
    base_url: Option<String>,

    /// Verifiable Credential Type identifier.
    #[arg(long)]
    vct: Option<String>,

    /// Default language for display properties.
    #[arg(long)]
    language: Option<String>,

    /// Path to configuration file (default: auto-discover mtcvctm.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use URLs instead of embedding images as data URIs.
    #[arg(long)]
    no_inline_images: bool,

    /// Output format(s): vctm, mddl, w3c, all (comma-separated).
    #[arg(short, long = "format")]
    format: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, parsing or any format fails. Formats
    /// that succeed are written before a format failure is reported.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.base_url.clone(),
            language: self.language.clone(),
            vct: self.vct.clone(),
            inline_images: self.no_inline_images.then_some(false),
            formats: self.format.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let registry = FormatRegistry::with_defaults();
        let formats = registry.resolve(&config.formats)?;
        let converter =
            Converter::new(&registry, generator_config(&config)).with_default_vct(config.vct.clone());

        output.info(&format!("Converting {}...", self.input.display()));
        let conversion = converter.convert_file(&self.input, &formats)?;

        let failed = self.write(&conversion, formats.len(), &output)?;
        if failed > 0 {
            return Err(CliError::Failed(format!(
                "{failed} of {} format(s) failed",
                formats.len()
            )));
        }
        Ok(())
    }

    /// Write successful outputs and report failures. Returns the failure count.
    fn write(&self, conversion: &Conversion, format_count: usize, output: &Output) -> Result<usize, CliError> {
        let stem = self
            .input
            .file_stem()
            .map_or_else(|| "credential".to_owned(), |s| s.to_string_lossy().into_owned());
        let out_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| self.input.parent().map(Path::to_path_buf).unwrap_or_default());

        let mut failed = 0;
        for item in &conversion.outputs {
            let bytes = match &item.result {
                Ok(bytes) => bytes,
                Err(e) => {
                    output.format_failed(&item.format, e);
                    failed += 1;
                    continue;
                }
            };

            let path = match (&self.output, item.file_name(&stem)) {
                (Some(path), _) if format_count == 1 => path.clone(),
                (_, Some(file_name)) => out_dir.join(file_name),
                (_, None) => continue,
            };
            write_file(&path, bytes)?;
            output.written(Some(item.format.as_str()), &path);
        }

        if self.output.is_some() && format_count > 1 {
            output.notice("--output ignored for multiple formats; wrote to the output directory");
        }
        Ok(failed)
    }
}
