//! Markdown source discovery by filesystem walking.

use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never descended into.
const SKIPPED_DIRS: [&str; 2] = ["node_modules", "vendor"];

/// Discovers credential definition documents under a root directory.
///
/// Collects `.md` and `.markdown` files recursively. Hidden entries,
/// `node_modules` and `vendor` directories, and files starting with `_`
/// (templates, drafts) are skipped.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scan the filesystem and return document paths in sorted order.
    ///
    /// Returns an empty Vec if the root directory doesn't exist. Unreadable
    /// subdirectories are skipped.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if self.root.is_dir() {
            scan_directory(&self.root, &mut files);
        }
        files.sort();
        files
    }
}

fn scan_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        tracing::debug!(path = %dir.display(), "Skipping unreadable directory");
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if is_dir {
            if !SKIPPED_DIRS.contains(&name.as_str()) {
                scan_directory(&path, files);
            }
        } else if is_markdown(&path) && !name.starts_with('_') {
            files.push(path);
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}
