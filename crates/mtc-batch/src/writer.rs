//! Writing generated documents and copying referenced assets.

use std::fs;
use std::path::{Component, Path, PathBuf};

use mtc_formats::ParsedCredential;

use crate::converter::Conversion;
use crate::error::BatchError;

/// Write `bytes` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if a directory or the file cannot be written.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BatchError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(BatchError::io(parent))?;
    }
    fs::write(path, bytes).map_err(BatchError::io(path))
}

/// Write every successful output of `conversion` to
/// `<out_dir>/<base_name>.<extension>`.
///
/// `base_name` may contain `/` separated subdirectories. Failed outputs are
/// skipped. Returns the written paths in output order.
///
/// # Errors
///
/// Returns [`BatchError::Io`] on the first write failure.
pub fn write_outputs(conversion: &Conversion, out_dir: &Path, base_name: &str) -> Result<Vec<PathBuf>, BatchError> {
    let mut written = Vec::new();
    for output in &conversion.outputs {
        let (Ok(bytes), Some(file_name)) = (&output.result, output.file_name(base_name)) else {
            continue;
        };
        let path = out_dir.join(file_name);
        write_file(&path, bytes)?;
        tracing::debug!(path = %path.display(), format = %output.format, "Wrote output");
        written.push(path);
    }
    Ok(written)
}

/// Copy local images, the logo and the SVG template of `credential` into
/// `out_dir`, keeping their document-relative paths.
///
/// Remote references, absolute paths and paths escaping the output directory
/// are skipped. Every source is checked before anything is copied, so a
/// missing asset leaves the output directory untouched. Returns the
/// destination paths of copied files.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if a referenced file is missing or cannot be
/// copied.
pub fn copy_images(credential: &ParsedCredential, out_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut planned: Vec<(PathBuf, PathBuf)> = Vec::new();

    for (relative, source) in local_assets(credential) {
        if !is_contained(Path::new(&relative)) {
            tracing::warn!(path = %relative, "Skipping asset outside the output directory");
            continue;
        }

        let dest = out_dir.join(&relative);
        if planned.iter().any(|(_, planned_dest)| *planned_dest == dest) || is_same_file(&source, &dest) {
            continue;
        }
        if !source.is_file() {
            return Err(BatchError::Io {
                path: source,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "referenced asset not found"),
            });
        }
        planned.push((source, dest));
    }

    let mut copied = Vec::with_capacity(planned.len());
    for (source, dest) in planned {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(BatchError::io(parent))?;
        }
        fs::copy(&source, &dest).map_err(BatchError::io(&source))?;
        tracing::debug!(from = %source.display(), to = %dest.display(), "Copied asset");
        copied.push(dest);
    }

    Ok(copied)
}

/// `(relative path, absolute source)` pairs for every local asset.
fn local_assets(credential: &ParsedCredential) -> Vec<(String, PathBuf)> {
    let resolve = |relative: &str| {
        credential
            .source_dir
            .as_ref()
            .map_or_else(|| PathBuf::from(relative), |dir| dir.join(relative))
    };

    let mut assets: Vec<(String, PathBuf)> = credential
        .images
        .iter()
        .map(|image| (image.path.clone(), image.absolute_path.clone()))
        .collect();
    if let Some(logo) = &credential.logo_path {
        let source = credential
            .logo_abs_path
            .clone()
            .unwrap_or_else(|| resolve(logo));
        assets.push((logo.clone(), source));
    }
    if let Some(template) = &credential.svg_template_path {
        assets.push((template.clone(), resolve(template)));
    }

    assets.retain(|(relative, _)| !relative.is_empty() && !is_remote(relative));
    assets
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
}

/// Whether a relative path stays inside the directory it is joined to.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use mtc_formats::{FormatError, ImageRef};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::converter::FormatOutput;

    fn conversion() -> Conversion {
        Conversion {
            credential: ParsedCredential::default(),
            outputs: vec![
                FormatOutput {
                    format: "vctm".to_owned(),
                    extension: Some("vctm.json"),
                    result: Ok(b"{\"vct\":\"pid\"}".to_vec()),
                },
                FormatOutput {
                    format: "mddl".to_owned(),
                    extension: Some("mdoc.json"),
                    result: Err(FormatError::NoFormats),
                },
            ],
        }
    }

    #[test]
    fn test_write_outputs_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&conversion(), dir.path(), "eu/pid").unwrap();

        assert_eq!(written, vec![dir.path().join("eu/pid.vctm.json")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("eu/pid.vctm.json")).unwrap(),
            "{\"vct\":\"pid\"}"
        );
        assert!(!dir.path().join("eu/pid.mdoc.json").exists());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.json");
        write_file(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_copy_images() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("images")).unwrap();
        fs::write(src.path().join("images/logo.png"), b"png").unwrap();
        fs::write(src.path().join("card.svg"), b"<svg/>").unwrap();

        let credential = ParsedCredential {
            source_dir: Some(src.path().to_path_buf()),
            logo_path: Some("images/logo.png".to_owned()),
            logo_abs_path: Some(src.path().join("images/logo.png")),
            svg_template_path: Some("card.svg".to_owned()),
            images: vec![
                ImageRef {
                    path: "images/logo.png".to_owned(),
                    alt_text: "Logo".to_owned(),
                    absolute_path: src.path().join("images/logo.png"),
                },
                ImageRef {
                    path: "https://cdn.example.com/x.png".to_owned(),
                    alt_text: String::new(),
                    absolute_path: PathBuf::from("https://cdn.example.com/x.png"),
                },
            ],
            ..ParsedCredential::default()
        };

        let copied = copy_images(&credential, out.path()).unwrap();
        assert_eq!(
            copied,
            vec![out.path().join("images/logo.png"), out.path().join("card.svg")]
        );
        assert_eq!(fs::read(out.path().join("images/logo.png")).unwrap(), b"png");
    }

    #[test]
    fn test_copy_images_in_place_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), b"png").unwrap();

        let credential = ParsedCredential {
            source_dir: Some(dir.path().to_path_buf()),
            images: vec![ImageRef {
                path: "logo.png".to_owned(),
                alt_text: String::new(),
                absolute_path: dir.path().join("logo.png"),
            }],
            ..ParsedCredential::default()
        };

        assert!(copy_images(&credential, dir.path()).unwrap().is_empty());
        assert_eq!(fs::read(dir.path().join("logo.png")).unwrap(), b"png");
    }

    #[test]
    fn test_copy_images_skips_escaping_paths() {
        let out = tempfile::tempdir().unwrap();
        let credential = ParsedCredential {
            images: vec![ImageRef {
                path: "../outside.png".to_owned(),
                alt_text: String::new(),
                absolute_path: PathBuf::from("/tmp/outside.png"),
            }],
            ..ParsedCredential::default()
        };
        assert!(copy_images(&credential, out.path()).unwrap().is_empty());
    }

    #[test]
    fn test_copy_missing_image_is_error() {
        let out = tempfile::tempdir().unwrap();
        let credential = ParsedCredential {
            images: vec![ImageRef {
                path: "missing.png".to_owned(),
                alt_text: String::new(),
                absolute_path: PathBuf::from("/nonexistent/missing.png"),
            }],
            ..ParsedCredential::default()
        };
        assert!(matches!(
            copy_images(&credential, out.path()),
            Err(BatchError::Io { .. })
        ));
    }

    #[test]
    fn test_copy_missing_image_copies_nothing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("logo.png"), b"png").unwrap();

        let credential = ParsedCredential {
            source_dir: Some(src.path().to_path_buf()),
            images: vec![
                ImageRef {
                    path: "logo.png".to_owned(),
                    alt_text: String::new(),
                    absolute_path: src.path().join("logo.png"),
                },
                ImageRef {
                    path: "missing.png".to_owned(),
                    alt_text: String::new(),
                    absolute_path: src.path().join("missing.png"),
                },
            ],
            ..ParsedCredential::default()
        };

        assert!(copy_images(&credential, out.path()).is_err());
        assert!(!out.path().join("logo.png").exists());
    }
}
