//! Configuration management for mtcvctm.
//!
//! Parses `mtcvctm.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `base_url`
//! - `vct`
//! - `language`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override base URL for identifiers and asset URIs.
    pub base_url: Option<String>,
    /// Override default display language.
    pub language: Option<String>,
    /// Override default vct.
    pub vct: Option<String>,
    /// Override image inlining.
    pub inline_images: Option<bool>,
    /// Override requested formats.
    pub formats: Option<String>,
    /// Override batch input directory.
    pub input_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mtcvctm.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for derived identifiers and asset URIs.
    pub base_url: Option<String>,
    /// Default display language.
    pub language: String,
    /// Default vct for single-document generation.
    pub vct: Option<String>,
    /// Embed local images as data URIs.
    pub inline_images: bool,
    /// Comma-separated format list (`all` selects every format).
    pub formats: String,
    /// Input configuration (paths are relative strings from TOML).
    input: DirConfigRaw,
    /// Output configuration (paths are relative strings from TOML).
    output: DirConfigRaw,

    /// Resolved batch input directory (set after loading).
    #[serde(skip)]
    pub input_dir: PathBuf,
    /// Resolved output directory (set after loading).
    #[serde(skip)]
    pub output_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    #[allow(clippy::derivable_impls)]
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw directory section as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DirConfigRaw {
    dir: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`base_url`").
        field: String,
        /// Error message (e.g., "${`REGISTRY_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Check a BCP 47 style tag: a 2-3 letter language subtag followed by
/// alphanumeric subtags of 1-8 characters.
fn is_language_tag(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let language_ok = subtags
        .next()
        .is_some_and(|s| (2..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic()));
    language_ok && subtags.all(|s| (1..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric()))
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mtcvctm.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated after overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(base_url) = &settings.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(language) = &settings.language {
            self.language.clone_from(language);
        }
        if let Some(vct) = &settings.vct {
            self.vct = Some(vct.clone());
        }
        if let Some(inline_images) = settings.inline_images {
            self.inline_images = inline_images;
        }
        if let Some(formats) = &settings.formats {
            self.formats.clone_from(formats);
        }
        if let Some(input_dir) = &settings.input_dir {
            self.input_dir.clone_from(input_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.output_dir.clone_from(output_dir);
        }
    }

    /// Base URL with empty values treated as unset.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            base_url: None,
            language: "en-US".to_owned(),
            vct: None,
            inline_images: true,
            formats: "vctm".to_owned(),
            input: DirConfigRaw::default(),
            output: DirConfigRaw::default(),
            input_dir: base.to_path_buf(),
            output_dir: base.to_path_buf(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.language, "language")?;
        if !is_language_tag(&self.language) {
            return Err(ConfigError::Validation(format!(
                "language is not a valid locale tag: {}",
                self.language
            )));
        }

        if let Some(base_url) = self.base_url() {
            require_http_url(base_url, "base_url")?;
        }

        require_non_empty(&self.formats, "formats")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.base_url {
            self.base_url = Some(expand::expand_env(url, "base_url")?);
        }
        if let Some(ref vct) = self.vct {
            self.vct = Some(expand::expand_env(vct, "vct")?);
        }
        self.language = expand::expand_env(&self.language, "language")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>| config_dir.join(path.unwrap_or("."));
        self.input_dir = resolve(self.input.dir.as_deref());
        self.output_dir = resolve(self.output.dir.as_deref());
    }
}
