//! SD-JWT VC Type Metadata generator (`vctm`).
//!
//! Produces the type metadata document described in
//! `draft-ietf-oauth-sd-jwt-vc`, section "Type Metadata". Claims are emitted as
//! an ordered array addressed by `path`, display entries are per locale with
//! the default locale first.

use serde::{Deserialize, Serialize};

use crate::assets::{AssetRef, resolve_asset};
use crate::{
    ClaimDefinition, FormatError, FormatGenerator, GeneratorConfig, ParsedCredential, assets,
    localized_displays, resolve_claim_name, resolve_precedence,
};

/// Registry name of this format.
pub const FORMAT: &str = "vctm";

/// Type metadata document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub vct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(
        rename = "extends#integrity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extends_integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    #[serde(
        rename = "schema_uri#integrity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_uri_integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<DisplayProperties>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<ClaimMetadata>,
}

impl TypeMetadata {
    /// Check structural requirements before serialization.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.vct.is_empty() {
            return Err(invalid("vct must not be empty"));
        }
        if let Some(display) = self.display.iter().find(|d| d.locale.is_empty()) {
            return Err(invalid(format!(
                "display entry {:?} has no locale",
                display.name
            )));
        }
        if self.claims.iter().any(|claim| claim.path.is_empty()) {
            return Err(invalid("claim path must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> FormatError {
    FormatError::Validation {
        format: FORMAT,
        message: message.into(),
    }
}

/// Credential display entry for one locale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProperties {
    pub locale: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<Rendering>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendering {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple: Option<SimpleRendering>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub svg_templates: Vec<SvgTemplate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRendering {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<Logo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<BackgroundImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub uri: String,
    #[serde(
        rename = "uri#integrity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uri_integrity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundImage {
    pub uri: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvgTemplate {
    pub uri: String,
    #[serde(
        rename = "uri#integrity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uri_integrity: Option<String>,
}

/// Metadata for one claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMetadata {
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<ClaimDisplay>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDisplay {
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Generator for SD-JWT VC Type Metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct VctmGenerator;

impl FormatGenerator for VctmGenerator {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "SD-JWT VC Type Metadata (draft-ietf-oauth-sd-jwt-vc)"
    }

    fn file_extension(&self) -> &'static str {
        "vctm.json"
    }

    fn derive_identifier(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Option<String> {
        resolve_precedence(
            non_empty(credential.vct.as_deref()),
            credential.override_str(FORMAT, "vct").map(str::to_owned),
            || {
                if credential.id.is_empty() {
                    return None;
                }
                Some(match config.base_url() {
                    Some(base) => format!("{base}/{}", credential.id),
                    None => credential.id.clone(),
                })
            },
        )
    }

    fn generate(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Result<Vec<u8>, FormatError> {
        let document = self.build(credential, config)?;
        document.validate()?;
        tracing::debug!(vct = %document.vct, claims = document.claims.len(), "Generated type metadata");
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

impl VctmGenerator {
    /// Build the type metadata document without serializing it.
    pub fn build(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Result<TypeMetadata, FormatError> {
        let rendering = build_rendering(credential, config)?;

        let default_entry = (!credential.name.is_empty()
            || !credential.description.is_empty()
            || rendering.is_some())
        .then(|| DisplayProperties {
            locale: config.language.clone(),
            name: credential.name.clone(),
            description: text(&credential.description),
            rendering,
        });

        let display = localized_displays(
            &config.language,
            default_entry,
            &credential.localizations,
            |locale, localized| DisplayProperties {
                locale: locale.to_owned(),
                name: localized.name.clone(),
                description: text(&localized.description),
                rendering: None,
            },
        );

        let claims = credential
            .claims
            .iter()
            .map(|claim| claim_metadata(claim, credential, config))
            .collect();

        Ok(TypeMetadata {
            vct: self
                .derive_identifier(credential, config)
                .unwrap_or_default(),
            name: text(&credential.name),
            description: text(&credential.description),
            extends: credential.metadata_value("extends").map(str::to_owned),
            extends_integrity: credential
                .metadata_value("extends#integrity")
                .map(str::to_owned),
            schema_uri: credential.metadata_value("schema_uri").map(str::to_owned),
            schema_uri_integrity: credential
                .metadata_value("schema_uri#integrity")
                .map(str::to_owned),
            display,
            claims,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn text(value: &str) -> Option<String> {
    non_empty(Some(value))
}

fn claim_metadata(
    claim: &ClaimDefinition,
    credential: &ParsedCredential,
    config: &GeneratorConfig,
) -> ClaimMetadata {
    let emitted = resolve_claim_name(claim, credential, FORMAT);
    let path = if emitted == claim.name && !claim.path.is_empty() {
        claim.path.clone()
    } else {
        emitted.split('.').map(str::to_owned).collect()
    };

    let default_entry = (!claim.description.is_empty() || claim.display_name.is_some()).then(|| {
        ClaimDisplay {
            locale: config.language.clone(),
            label: Some(claim.label().to_owned()),
            description: text(&claim.description),
        }
    });

    let display = localized_displays(
        &config.language,
        default_entry,
        &claim.localizations,
        |locale, localized| ClaimDisplay {
            locale: locale.to_owned(),
            label: localized
                .label
                .clone()
                .or_else(|| claim.display_name.clone()),
            description: text(&localized.description),
        },
    );

    ClaimMetadata {
        path,
        display,
        mandatory: claim.mandatory,
        sd: claim.sd.clone(),
        svg_id: claim.svg_id.clone(),
    }
}

fn build_rendering(
    credential: &ParsedCredential,
    config: &GeneratorConfig,
) -> Result<Option<Rendering>, FormatError> {
    let logo = match assets::primary_logo(credential) {
        Some((path, alt_text, absolute)) => {
            let AssetRef { uri, integrity } = resolve_asset(credential, path, absolute, config)?;
            Some(Logo {
                uri,
                uri_integrity: integrity,
                alt_text: alt_text.map(str::to_owned),
            })
        }
        None => None,
    };

    let simple = SimpleRendering {
        logo,
        background_image: credential
            .metadata_value("background_image")
            .map(|uri| BackgroundImage {
                uri: uri.to_owned(),
            }),
        background_color: non_empty(credential.background_color.as_deref()),
        text_color: non_empty(credential.text_color.as_deref()),
    };
    let simple = (simple != SimpleRendering::default()).then_some(simple);

    let svg_templates = build_svg_templates(credential, config)?;

    if simple.is_none() && svg_templates.is_empty() {
        return Ok(None);
    }
    Ok(Some(Rendering {
        simple,
        svg_templates,
    }))
}

fn build_svg_templates(
    credential: &ParsedCredential,
    config: &GeneratorConfig,
) -> Result<Vec<SvgTemplate>, FormatError> {
    let mut templates: Vec<SvgTemplate> = Vec::new();
    let explicit_integrity = non_empty(credential.svg_template_integrity.as_deref());

    if let Some(uri) = non_empty(credential.svg_template_uri.as_deref()) {
        templates.push(SvgTemplate {
            uri,
            uri_integrity: explicit_integrity.clone(),
        });
    } else if let Some(path) = non_empty(credential.svg_template_path.as_deref()) {
        let asset = resolve_asset(credential, &path, None, config)?;
        templates.push(SvgTemplate {
            uri: asset.uri,
            uri_integrity: explicit_integrity.clone().or(asset.integrity),
        });
    }

    for image in credential.images.iter().filter(|image| image.is_svg()) {
        let asset = resolve_asset(
            credential,
            &image.path,
            Some(image.absolute_path.as_path()),
            config,
        )?;
        if templates.iter().any(|existing| existing.uri == asset.uri) {
            continue;
        }
        templates.push(SvgTemplate {
            uri: asset.uri,
            uri_integrity: asset.integrity,
        });
    }

    Ok(templates)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::{ClaimLocalization, DisplayLocalization, ImageRef, ValueType};

    fn sample_credential() -> ParsedCredential {
        ParsedCredential {
            id: "pid".to_owned(),
            name: "Person Identification Data".to_owned(),
            description: "Core identity attributes.".to_owned(),
            claims: vec![
                ClaimDefinition {
                    name: "given_name".to_owned(),
                    path: vec!["given_name".to_owned()],
                    display_name: Some("Given Name".to_owned()),
                    value_type: ValueType::String,
                    description: "First name".to_owned(),
                    mandatory: true,
                    sd: Some("always".to_owned()),
                    svg_id: Some("gn".to_owned()),
                    localizations: BTreeMap::from([(
                        "sv".to_owned(),
                        ClaimLocalization {
                            label: Some("Förnamn".to_owned()),
                            description: String::new(),
                        },
                    )]),
                    format_mappings: HashMap::new(),
                },
                ClaimDefinition {
                    name: "address.street".to_owned(),
                    path: vec!["address".to_owned(), "street".to_owned()],
                    ..ClaimDefinition::default()
                },
            ],
            ..ParsedCredential::default()
        }
    }

    fn generate_document(credential: &ParsedCredential, config: &GeneratorConfig) -> TypeMetadata {
        let bytes = VctmGenerator.generate(credential, config).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_derive_identifier_precedence() {
        let config = GeneratorConfig {
            base_url: Some("https://registry.example.com/".to_owned()),
            ..GeneratorConfig::default()
        };
        let mut credential = sample_credential();
        assert_eq!(
            VctmGenerator.derive_identifier(&credential, &config).as_deref(),
            Some("https://registry.example.com/pid")
        );

        let mut block = serde_json::Map::new();
        block.insert("vct".to_owned(), "urn:override".into());
        credential.format_overrides.insert("vctm".to_owned(), block);
        assert_eq!(
            VctmGenerator.derive_identifier(&credential, &config).as_deref(),
            Some("urn:override")
        );

        credential.vct = Some("urn:explicit".to_owned());
        assert_eq!(
            VctmGenerator.derive_identifier(&credential, &config).as_deref(),
            Some("urn:explicit")
        );
    }

    #[test]
    fn test_derive_identifier_bare_id_without_base_url() {
        let credential = sample_credential();
        assert_eq!(
            VctmGenerator
                .derive_identifier(&credential, &GeneratorConfig::default())
                .as_deref(),
            Some("pid")
        );
    }

    #[test]
    fn test_generate_basic_document() {
        let document = generate_document(&sample_credential(), &GeneratorConfig::default());

        assert_eq!(document.vct, "pid");
        assert_eq!(document.name.as_deref(), Some("Person Identification Data"));
        assert_eq!(document.display.len(), 1);
        assert_eq!(document.display[0].locale, "en-US");
        assert!(document.display[0].rendering.is_none());

        let given = &document.claims[0];
        assert_eq!(given.path, vec!["given_name"]);
        assert!(given.mandatory);
        assert_eq!(given.sd.as_deref(), Some("always"));
        assert_eq!(given.svg_id.as_deref(), Some("gn"));
        assert_eq!(
            given.display,
            vec![
                ClaimDisplay {
                    locale: "en-US".to_owned(),
                    label: Some("Given Name".to_owned()),
                    description: Some("First name".to_owned()),
                },
                ClaimDisplay {
                    locale: "sv".to_owned(),
                    label: Some("Förnamn".to_owned()),
                    description: None,
                },
            ]
        );

        let street = &document.claims[1];
        assert_eq!(street.path, vec!["address", "street"]);
        assert!(street.display.is_empty());
        assert!(!street.mandatory);
    }

    #[test]
    fn test_display_default_locale_first_never_duplicated() {
        let mut credential = sample_credential();
        credential.localizations = BTreeMap::from([
            (
                "sv".to_owned(),
                DisplayLocalization {
                    name: "Personidentifiering".to_owned(),
                    description: String::new(),
                },
            ),
            (
                "en-US".to_owned(),
                DisplayLocalization {
                    name: "Duplicate".to_owned(),
                    description: String::new(),
                },
            ),
            (
                "de".to_owned(),
                DisplayLocalization {
                    name: "Personalausweis".to_owned(),
                    description: String::new(),
                },
            ),
        ]);

        let document = generate_document(&credential, &GeneratorConfig::default());
        let locales: Vec<&str> = document.display.iter().map(|d| d.locale.as_str()).collect();
        assert_eq!(locales, vec!["en-US", "de", "sv"]);
        assert_eq!(document.display[0].name, "Person Identification Data");
    }

    #[test]
    fn test_mandatory_false_is_omitted() {
        let bytes = VctmGenerator
            .generate(&sample_credential(), &GeneratorConfig::default())
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["claims"][0]["mandatory"], serde_json::json!(true));
        assert!(value["claims"][1].get("mandatory").is_none());
    }

    #[test]
    fn test_passthrough_metadata_fields() {
        let mut credential = sample_credential();
        credential
            .metadata
            .insert("extends".to_owned(), "https://example.com/base".to_owned());
        credential
            .metadata
            .insert("extends#integrity".to_owned(), "sha256-abc".to_owned());
        credential
            .metadata
            .insert("schema_uri".to_owned(), "https://example.com/schema.json".to_owned());

        let bytes = VctmGenerator
            .generate(&credential, &GeneratorConfig::default())
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["extends"], "https://example.com/base");
        assert_eq!(value["extends#integrity"], "sha256-abc");
        assert_eq!(value["schema_uri"], "https://example.com/schema.json");
        assert!(value.get("schema_uri#integrity").is_none());
    }

    #[test]
    fn test_rendering_from_colors_only() {
        let mut credential = sample_credential();
        credential.background_color = Some("#12107c".to_owned());

        let document = generate_document(&credential, &GeneratorConfig::default());
        let rendering = document.display[0].rendering.as_ref().unwrap();
        let simple = rendering.simple.as_ref().unwrap();
        assert_eq!(simple.background_color.as_deref(), Some("#12107c"));
        assert!(simple.logo.is_none());
        assert!(rendering.svg_templates.is_empty());
    }

    #[test]
    fn test_rendering_from_background_image_metadata() {
        let mut credential = sample_credential();
        credential
            .metadata
            .insert("background_image".to_owned(), "\"bg.png\"".to_owned());

        let document = generate_document(&credential, &GeneratorConfig::default());
        let simple = document.display[0]
            .rendering
            .as_ref()
            .and_then(|r| r.simple.as_ref())
            .unwrap();
        assert_eq!(
            simple.background_image,
            Some(BackgroundImage {
                uri: "bg.png".to_owned()
            })
        );
    }

    #[test]
    fn test_images_split_into_logo_and_svg_templates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), b"hello").unwrap();
        fs::write(dir.path().join("card.svg"), "<svg/>").unwrap();

        let mut credential = sample_credential();
        credential.source_dir = Some(dir.path().to_path_buf());
        credential.images = vec![
            ImageRef {
                path: "card.svg".to_owned(),
                alt_text: "Card".to_owned(),
                absolute_path: dir.path().join("card.svg"),
            },
            ImageRef {
                path: "logo.png".to_owned(),
                alt_text: "Logo".to_owned(),
                absolute_path: dir.path().join("logo.png"),
            },
        ];
        let config = GeneratorConfig {
            base_url: Some("https://registry.example.com".to_owned()),
            ..GeneratorConfig::default()
        };

        let document = generate_document(&credential, &config);
        let rendering = document.display[0].rendering.as_ref().unwrap();
        assert_eq!(
            rendering.simple.as_ref().and_then(|s| s.logo.clone()),
            Some(Logo {
                uri: "https://registry.example.com/logo.png".to_owned(),
                uri_integrity: Some(
                    "sha256-LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ=".to_owned()
                ),
                alt_text: Some("Logo".to_owned()),
            })
        );
        assert_eq!(rendering.svg_templates.len(), 1);
        assert_eq!(
            rendering.svg_templates[0].uri,
            "https://registry.example.com/card.svg"
        );
        assert_eq!(
            rendering.svg_templates[0].uri_integrity,
            Some(assets::integrity(b"<svg/>"))
        );
    }

    #[test]
    fn test_svg_template_uri_with_explicit_integrity() {
        let mut credential = sample_credential();
        credential.svg_template_uri = Some("https://cdn.example.com/card.svg".to_owned());
        credential.svg_template_integrity = Some("sha256-explicit".to_owned());

        let document = generate_document(&credential, &GeneratorConfig::default());
        let rendering = document.display[0].rendering.as_ref().unwrap();
        assert_eq!(
            rendering.svg_templates,
            vec![SvgTemplate {
                uri: "https://cdn.example.com/card.svg".to_owned(),
                uri_integrity: Some("sha256-explicit".to_owned()),
            }]
        );
    }

    #[test]
    fn test_inline_logo_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let mut credential = sample_credential();
        credential.source_dir = Some(dir.path().to_path_buf());
        credential.logo_path = Some("missing.png".to_owned());
        let config = GeneratorConfig {
            inline_images: true,
            ..GeneratorConfig::default()
        };

        let result = VctmGenerator.generate(&credential, &config);
        assert!(matches!(result, Err(FormatError::Asset { .. })));
    }

    #[test]
    fn test_claim_path_follows_format_mapping() {
        let mut credential = sample_credential();
        credential.claims[0]
            .format_mappings
            .insert("vctm".to_owned(), "name.given".to_owned());

        let document = generate_document(&credential, &GeneratorConfig::default());
        assert_eq!(document.claims[0].path, vec!["name", "given"]);
    }

    #[test]
    fn test_empty_identifier_fails_validation() {
        let credential = ParsedCredential::default();
        let result = VctmGenerator.generate(&credential, &GeneratorConfig::default());
        assert!(matches!(
            result,
            Err(FormatError::Validation { format: "vctm", .. })
        ));
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut credential = sample_credential();
        credential.background_color = Some("#fff".to_owned());
        credential.text_color = Some("#000".to_owned());
        let config = GeneratorConfig::default();

        let built = VctmGenerator.build(&credential, &config).unwrap();
        let bytes = VctmGenerator.generate(&credential, &config).unwrap();
        let parsed: TypeMetadata = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, built);
    }
}
