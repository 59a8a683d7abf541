//! Format generator registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{FormatError, FormatGenerator, MddlGenerator, VctmGenerator, W3cGenerator};

/// Keyword selecting every registered format.
const ALL_FORMATS: &str = "all";

/// Registry of format generators, keyed by format name.
///
/// Constructed once at startup and passed by reference into the conversion
/// pipeline. Registration and lookup are guarded by an `RwLock`; generators
/// are handed out as `Arc` clones so no lock is held while generating.
#[derive(Default)]
pub struct FormatRegistry {
    generators: RwLock<HashMap<String, Arc<dyn FormatGenerator>>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `vctm`, `mddl` and `w3c` generators.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(VctmGenerator));
        registry.register(Arc::new(MddlGenerator));
        registry.register(Arc::new(W3cGenerator));
        registry
    }

    /// Register a generator, replacing any generator with the same name.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn register(&self, generator: Arc<dyn FormatGenerator>) {
        let name = generator.name().to_owned();
        self.generators.write().unwrap().insert(name, generator);
    }

    /// Look up a generator by name.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn get(&self, name: &str) -> Option<Arc<dyn FormatGenerator>> {
        self.generators.read().unwrap().get(name).map(Arc::clone)
    }

    /// Sorted names of all registered generators.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generators.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a comma-separated format list (or `all`) into registered names.
    ///
    /// Names are trimmed, empty entries skipped, and duplicates dropped while
    /// keeping first-occurrence order. `all` anywhere in the list selects every
    /// registered format in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownFormat`] for an unregistered name and
    /// [`FormatError::NoFormats`] if nothing remains after trimming.
    pub fn resolve(&self, formats: &str) -> Result<Vec<String>, FormatError> {
        let requested: Vec<&str> = formats
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();

        if requested.iter().any(|name| name.eq_ignore_ascii_case(ALL_FORMATS)) {
            let all = self.list();
            if all.is_empty() {
                return Err(FormatError::NoFormats);
            }
            return Ok(all);
        }

        let mut resolved: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            if self.get(name).is_none() {
                return Err(FormatError::UnknownFormat {
                    name: name.to_owned(),
                    available: self.list(),
                });
            }
            if !resolved.iter().any(|existing| existing == name) {
                resolved.push(name.to_owned());
            }
        }

        if resolved.is_empty() {
            return Err(FormatError::NoFormats);
        }
        Ok(resolved)
    }

    /// Output file name for `base` in `format` (`base.<extension>`).
    ///
    /// Returns `None` for an unregistered format.
    pub fn output_file_name(&self, base: &str, format: &str) -> Option<String> {
        self.get(format)
            .map(|generator| format!("{base}.{}", generator.file_extension()))
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.list())
            .finish()
    }
}
