//! Registry manifest listing every credential produced by a batch run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Manifest location relative to the output directory.
pub const MANIFEST_PATH: &str = ".well-known/vctm-registry.json";

const MANIFEST_VERSION: &str = "1.0";

/// `.well-known/vctm-registry.json` document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub version: String,
    /// Generation time (RFC 3339, UTC).
    pub generated: String,
    pub repository: RepositoryInfo,
    pub credentials: Vec<CredentialEntry>,
}

/// Source repository, from the `GITHUB_*` environment of CI runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub branch: String,
    pub commit: String,
}

/// One converted credential.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub vct: String,
    pub name: String,
    /// Source document relative to the input directory.
    pub source_file: String,
    /// Type metadata file relative to the output directory (empty if not generated).
    pub vctm_file: String,
    /// Formats generated for this credential.
    pub formats: Vec<String>,
    /// Source modification time (RFC 3339, UTC).
    pub last_modified: String,
}

impl RepositoryInfo {
    /// Read repository details from `GITHUB_REPOSITORY`, `GITHUB_REF_NAME`,
    /// `GITHUB_SHA` and `GITHUB_SERVER_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut info = Self::default();

        if let Some(repository) = var("GITHUB_REPOSITORY") {
            let server = var("GITHUB_SERVER_URL").unwrap_or_else(|| "https://github.com".to_owned());
            info.url = format!("{}/{repository}", server.trim_end_matches('/'));
            if let Some((owner, name)) = repository.split_once('/') {
                owner.clone_into(&mut info.owner);
                name.clone_into(&mut info.name);
            }
        }
        if let Some(branch) = var("GITHUB_REF_NAME") {
            info.branch = branch;
        }
        if let Some(commit) = var("GITHUB_SHA") {
            info.commit = commit;
        }
        info
    }
}

impl RegistryManifest {
    /// Create a manifest stamped with the current time and CI environment.
    #[must_use]
    pub fn new(credentials: Vec<CredentialEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_owned(),
            generated: timestamp(Utc::now()),
            repository: RepositoryInfo::from_env(),
            credentials,
        }
    }

    /// Write the manifest to `<out_dir>/.well-known/vctm-registry.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf, BatchError> {
        let path = out_dir.join(MANIFEST_PATH);
        let json = serde_json::to_vec_pretty(self)?;
        crate::writer::write_file(&path, &json)?;
        tracing::debug!(path = %path.display(), credentials = self.credentials.len(), "Wrote registry manifest");
        Ok(path)
    }
}

/// Modification time of `path`, falling back to now when unavailable.
#[must_use]
pub fn last_modified(path: &Path) -> String {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| SystemTime::now());
    timestamp(DateTime::<Utc>::from(modified))
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
