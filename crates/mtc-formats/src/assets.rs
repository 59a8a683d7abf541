//! Asset helpers: subresource integrity, MIME sniffing, `data:` URIs.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use sha2::{Digest, Sha256};

use crate::{FormatError, GeneratorConfig, ParsedCredential};

const SVG_MIME: &str = "image/svg+xml";

/// A resolved asset reference: the URI to emit and an optional integrity value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetRef {
    pub uri: String,
    pub integrity: Option<String>,
}

/// Compute a subresource integrity value (`sha256-<base64>`) over raw bytes.
pub fn integrity(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    format!("sha256-{}", BASE64_STANDARD.encode(digest.as_slice()))
}

/// Compute the integrity value of a file.
pub fn file_integrity(path: &Path) -> Result<String, FormatError> {
    let bytes = fs::read(path).map_err(|source| FormatError::Asset {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(integrity(&bytes))
}

/// Determine the MIME type of an asset.
///
/// `.svg` paths are always `image/svg+xml`. Otherwise the leading bytes are
/// checked for common image signatures, falling back to the file extension
/// and finally `application/octet-stream`.
pub fn sniff_mime(path: &Path, bytes: &[u8]) -> String {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    {
        return SVG_MIME.to_owned();
    }

    let sniffed = if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        Some("image/x-icon")
    } else {
        None
    };

    match sniffed {
        Some(mime) => mime.to_owned(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
    }
}

/// Read a file and encode it as a `data:<mime>;base64,<data>` URI.
pub fn data_uri(path: &Path) -> Result<String, FormatError> {
    let bytes = fs::read(path).map_err(|source| FormatError::Asset {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = sniff_mime(path, &bytes);
    let b64 = BASE64_STANDARD.encode(&bytes);
    Ok(format!("data:{mime};base64,{b64}"))
}

/// Whether a path is already a URI that must be emitted verbatim.
pub(crate) fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
}

/// Resolve an asset path against the credential's source directory.
pub(crate) fn local_path(
    credential: &ParsedCredential,
    path: &str,
    absolute: Option<&Path>,
) -> PathBuf {
    if let Some(absolute) = absolute
        && !absolute.as_os_str().is_empty()
    {
        return absolute.to_path_buf();
    }
    let relative = Path::new(path);
    match &credential.source_dir {
        Some(dir) if relative.is_relative() => dir.join(relative),
        _ => relative.to_path_buf(),
    }
}

/// Resolve how an asset is referenced in generated output.
///
/// - URLs and `data:` URIs are emitted unchanged.
/// - Inline mode embeds the file as a `data:` URI; a read failure is an error.
/// - With a base URL the asset becomes `<base>/<path>` plus an integrity value;
///   if the file cannot be read the integrity is omitted with a warning.
/// - Otherwise the raw path is emitted.
pub fn resolve_asset(
    credential: &ParsedCredential,
    path: &str,
    absolute: Option<&Path>,
    config: &GeneratorConfig,
) -> Result<AssetRef, FormatError> {
    if is_remote(path) {
        return Ok(AssetRef {
            uri: path.to_owned(),
            integrity: None,
        });
    }

    let local = local_path(credential, path, absolute);

    if config.inline_images {
        return Ok(AssetRef {
            uri: data_uri(&local)?,
            integrity: None,
        });
    }

    if let Some(base) = config.base_url() {
        let integrity = match file_integrity(&local) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %local.display(), error = %e, "Failed to compute asset integrity");
                None
            }
        };
        return Ok(AssetRef {
            uri: format!("{base}/{}", path.trim_start_matches("./")),
            integrity,
        });
    }

    Ok(AssetRef {
        uri: path.to_owned(),
        integrity: None,
    })
}

/// Pick the credential logo: the front-matter `logo`, else the first non-SVG image.
///
/// Returns `(path, alt_text, absolute_path)`.
pub fn primary_logo(credential: &ParsedCredential) -> Option<(&str, Option<&str>, Option<&Path>)> {
    if let Some(logo) = credential.logo_path.as_deref().filter(|p| !p.is_empty()) {
        return Some((
            logo,
            credential.logo_alt_text.as_deref(),
            credential.logo_abs_path.as_deref(),
        ));
    }
    credential
        .images
        .iter()
        .find(|image| !image.is_svg())
        .map(|image| {
            (
                image.path.as_str(),
                Some(image.alt_text.as_str()).filter(|alt| !alt.is_empty()),
                Some(image.absolute_path.as_path()),
            )
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::ImageRef;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_integrity_is_stable() {
        assert_eq!(
            integrity(b"hello"),
            "sha256-LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="
        );
        assert_eq!(integrity(b"hello"), integrity(b"hello"));
    }

    #[test]
    fn test_integrity_empty_input() {
        assert_eq!(
            integrity(b""),
            "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_file_integrity_missing_file() {
        let result = file_integrity(Path::new("/nonexistent/logo.png"));
        assert!(matches!(result, Err(FormatError::Asset { .. })));
    }

    #[test]
    fn test_sniff_mime_magic_bytes() {
        assert_eq!(sniff_mime(Path::new("a.bin"), PNG_HEADER), "image/png");
        assert_eq!(sniff_mime(Path::new("a"), &[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(Path::new("a"), b"GIF89a..."), "image/gif");
        assert_eq!(sniff_mime(Path::new("a"), b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_sniff_mime_svg_forced_by_extension() {
        assert_eq!(sniff_mime(Path::new("card.SVG"), b"<svg/>"), "image/svg+xml");
        assert_eq!(sniff_mime(Path::new("card.svg"), PNG_HEADER), "image/svg+xml");
    }

    #[test]
    fn test_sniff_mime_falls_back_to_extension() {
        assert_eq!(sniff_mime(Path::new("notes.txt"), b"plain"), "text/plain");
        assert_eq!(
            sniff_mime(Path::new("blob"), b"\x01\x02"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_data_uri_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        fs::write(&path, PNG_HEADER).unwrap();

        let uri = data_uri(&path).unwrap();
        let expected = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(PNG_HEADER));
        assert_eq!(uri, expected);
    }

    fn credential_in(dir: &Path) -> ParsedCredential {
        ParsedCredential {
            id: "pid".to_owned(),
            source_dir: Some(dir.to_path_buf()),
            ..ParsedCredential::default()
        }
    }

    #[test]
    fn test_resolve_asset_inline() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("card.svg"), "<svg/>").unwrap();
        let credential = credential_in(dir.path());
        let config = GeneratorConfig {
            inline_images: true,
            ..GeneratorConfig::default()
        };

        let asset = resolve_asset(&credential, "card.svg", None, &config).unwrap();
        assert_eq!(
            asset.uri,
            format!("data:image/svg+xml;base64,{}", BASE64_STANDARD.encode("<svg/>"))
        );
        assert_eq!(asset.integrity, None);
    }

    #[test]
    fn test_resolve_asset_inline_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let credential = credential_in(dir.path());
        let config = GeneratorConfig {
            inline_images: true,
            ..GeneratorConfig::default()
        };

        let result = resolve_asset(&credential, "missing.png", None, &config);
        assert!(matches!(result, Err(FormatError::Asset { .. })));
    }

    #[test]
    fn test_resolve_asset_base_url_with_integrity() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/logo.png"), b"hello").unwrap();
        let credential = credential_in(dir.path());
        let config = GeneratorConfig {
            base_url: Some("https://registry.example.com/".to_owned()),
            ..GeneratorConfig::default()
        };

        let asset = resolve_asset(&credential, "images/logo.png", None, &config).unwrap();
        assert_eq!(
            asset,
            AssetRef {
                uri: "https://registry.example.com/images/logo.png".to_owned(),
                integrity: Some("sha256-LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ=".to_owned()),
            }
        );
    }

    #[test]
    fn test_resolve_asset_base_url_unreadable_omits_integrity() {
        let dir = TempDir::new().unwrap();
        let credential = credential_in(dir.path());
        let config = GeneratorConfig {
            base_url: Some("https://registry.example.com".to_owned()),
            ..GeneratorConfig::default()
        };

        let asset = resolve_asset(&credential, "logo.png", None, &config).unwrap();
        assert_eq!(asset.uri, "https://registry.example.com/logo.png");
        assert_eq!(asset.integrity, None);
    }

    #[test]
    fn test_resolve_asset_remote_and_raw() {
        let credential = ParsedCredential::default();
        let config = GeneratorConfig {
            inline_images: true,
            ..GeneratorConfig::default()
        };
        let remote = resolve_asset(&credential, "https://cdn.example.com/a.png", None, &config).unwrap();
        assert_eq!(remote.uri, "https://cdn.example.com/a.png");

        let raw = resolve_asset(&credential, "logo.png", None, &GeneratorConfig::default()).unwrap();
        assert_eq!(raw.uri, "logo.png");
    }

    #[test]
    fn test_primary_logo_prefers_front_matter() {
        let credential = ParsedCredential {
            logo_path: Some("brand.png".to_owned()),
            images: vec![ImageRef {
                path: "other.png".to_owned(),
                ..ImageRef::default()
            }],
            ..ParsedCredential::default()
        };
        let (path, _, _) = primary_logo(&credential).unwrap();
        assert_eq!(path, "brand.png");
    }

    #[test]
    fn test_primary_logo_skips_svg_images() {
        let credential = ParsedCredential {
            images: vec![
                ImageRef {
                    path: "card.svg".to_owned(),
                    ..ImageRef::default()
                },
                ImageRef {
                    path: "logo.png".to_owned(),
                    alt_text: "Logo".to_owned(),
                    absolute_path: PathBuf::from("/docs/logo.png"),
                },
            ],
            ..ParsedCredential::default()
        };
        let (path, alt, abs) = primary_logo(&credential).unwrap();
        assert_eq!(path, "logo.png");
        assert_eq!(alt, Some("Logo"));
        assert_eq!(abs, Some(Path::new("/docs/logo.png")));
    }
}
