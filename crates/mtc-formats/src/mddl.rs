//! ISO 18013-5 `mso_mdoc` credential configuration generator (`mddl`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assets::{primary_logo, resolve_asset};
use crate::{
    FormatError, FormatGenerator, GeneratorConfig, ParsedCredential, ValueType,
    localized_displays, resolve_claim_name, resolve_precedence,
};

/// Registry name of this format.
pub const FORMAT: &str = "mddl";
const MSO_MDOC: &str = "mso_mdoc";

/// `mso_mdoc` credential configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdocConfiguration {
    pub format: String,
    pub doctype: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<MdocDisplay>,
    /// Namespace -> claim name -> claim metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub claims: BTreeMap<String, BTreeMap<String, MdocClaim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl MdocConfiguration {
    /// Check structural requirements before serialization.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.format != MSO_MDOC {
            return Err(invalid(format!("unexpected format {:?}", self.format)));
        }
        if self.doctype.is_empty() {
            return Err(invalid("doctype must not be empty"));
        }
        if self.claims.keys().any(String::is_empty) {
            return Err(invalid("namespace must not be empty"));
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

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdocDisplay {
    pub locale: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<MdocLogo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdocLogo {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdocClaim {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<MdocClaimDisplay>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdocClaimDisplay {
    pub locale: String,
    pub name: String,
}

/// Map a claim type to its CDDL type name.
///
/// Object and array claims map to an empty string: their structure is
/// described elsewhere, so no `value_type` is emitted.
pub fn cddl_type(value_type: &ValueType) -> &'static str {
    match value_type {
        ValueType::String | ValueType::Other(_) => "tstr",
        ValueType::Number => "int",
        ValueType::Integer => "uint",
        ValueType::Boolean => "bool",
        ValueType::Date => "full-date",
        ValueType::DateTime => "tdate",
        ValueType::Image => "bstr",
        ValueType::Object | ValueType::Array => "",
    }
}

/// Reverse the host of a base URL: `https://registry.siros.org` -> `org.siros.registry`.
///
/// Scheme, port, path and query are ignored.
pub fn reverse_domain(base_url: &str) -> Option<String> {
    let without_scheme = base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next().unwrap_or_default();

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.is_empty() {
        return None;
    }
    Some(labels.into_iter().rev().collect::<Vec<_>>().join("."))
}

/// Generator for `mso_mdoc` credential configurations.
#[derive(Clone, Copy, Debug, Default)]
pub struct MddlGenerator;

impl MddlGenerator {
    fn derive_namespace(&self, credential: &ParsedCredential, doctype: &str) -> String {
        resolve_precedence(
            credential
                .namespace
                .as_deref()
                .filter(|ns| !ns.is_empty())
                .map(str::to_owned),
            credential.override_str(FORMAT, "namespace").map(str::to_owned),
            || Some(doctype.to_owned()),
        )
        .unwrap_or_else(|| doctype.to_owned())
    }

    /// Build the configuration document without serializing it.
    pub fn build(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Result<MdocConfiguration, FormatError> {
        let doctype = self
            .derive_identifier(credential, config)
            .ok_or(FormatError::MissingIdentifier {
                format: FORMAT,
                field: "doctype",
            })?;
        let namespace = self.derive_namespace(credential, &doctype);

        let default_entry = if credential.name.is_empty() && credential.description.is_empty() {
            None
        } else {
            let logo = match primary_logo(credential) {
                Some((path, alt_text, absolute)) => Some(MdocLogo {
                    uri: resolve_asset(credential, path, absolute, config)?.uri,
                    alt_text: alt_text.map(str::to_owned),
                }),
                None => None,
            };
            Some(MdocDisplay {
                locale: config.language.clone(),
                name: credential.name.clone(),
                description: Some(credential.description.clone()).filter(|d| !d.is_empty()),
                logo,
                background_color: credential.background_color.clone(),
                text_color: credential.text_color.clone(),
            })
        };
        // Localized entries are only meaningful next to a default entry.
        let display = if default_entry.is_some() {
            localized_displays(
                &config.language,
                default_entry,
                &credential.localizations,
                |locale, localized| MdocDisplay {
                    locale: locale.to_owned(),
                    name: localized.name.clone(),
                    description: Some(localized.description.clone()).filter(|d| !d.is_empty()),
                    ..MdocDisplay::default()
                },
            )
        } else {
            Vec::new()
        };

        let mut claims: BTreeMap<String, BTreeMap<String, MdocClaim>> = BTreeMap::new();
        if !credential.claims.is_empty() {
            let namespace_claims = claims.entry(namespace).or_default();
            for claim in &credential.claims {
                let label = claim.label();
                let display = localized_displays(
                    &config.language,
                    Some(MdocClaimDisplay {
                        locale: config.language.clone(),
                        name: label.to_owned(),
                    }),
                    &claim.localizations,
                    |locale, localized| MdocClaimDisplay {
                        locale: locale.to_owned(),
                        name: localized.label.as_deref().unwrap_or(label).to_owned(),
                    },
                );
                let value_type = cddl_type(&claim.value_type);
                namespace_claims.insert(
                    resolve_claim_name(claim, credential, FORMAT).to_owned(),
                    MdocClaim {
                        display,
                        mandatory: claim.mandatory,
                        value_type: (!value_type.is_empty()).then(|| value_type.to_owned()),
                    },
                );
            }
        }

        Ok(MdocConfiguration {
            format: MSO_MDOC.to_owned(),
            doctype,
            display,
            claims,
            order: credential.format_override(FORMAT, "order").and_then(order_value),
        })
    }
}

/// Integer `order`, truncating float values such as `2.0`.
#[allow(clippy::cast_possible_truncation)]
fn order_value(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

impl FormatGenerator for MddlGenerator {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "mso_mdoc credential configuration (ISO 18013-5 / OpenID4VCI)"
    }

    fn file_extension(&self) -> &'static str {
        "mdoc.json"
    }

    fn derive_identifier(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Option<String> {
        resolve_precedence(
            credential
                .doctype
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            credential.override_str(FORMAT, "doctype").map(str::to_owned),
            || {
                if credential.id.is_empty() {
                    return None;
                }
                let reversed = reverse_domain(config.base_url()?)?;
                Some(format!("{reversed}.credentials.{}", credential.id))
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
        tracing::debug!(doctype = %document.doctype, "Generated mdoc configuration");
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
