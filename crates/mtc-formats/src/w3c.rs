//! W3C Verifiable Credential schema generator (`w3c`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    FormatError, FormatGenerator, GeneratorConfig, ParsedCredential, ValueType,
    resolve_claim_name, resolve_precedence,
};

/// Registry name of this format.
pub const FORMAT: &str = "w3c";

/// Base type every W3C credential carries first.
pub const BASE_TYPE: &str = "VerifiableCredential";
/// Base JSON-LD context.
pub const BASE_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// W3C credential schema document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchemaDocument {
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<W3cDisplay>,
    #[serde(
        rename = "credentialSchema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credential_schema: Option<CredentialSchema>,
}

impl CredentialSchemaDocument {
    /// Check structural requirements before serialization.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.types.first().map(String::as_str) != Some(BASE_TYPE) {
            return Err(invalid(format!("type must start with {BASE_TYPE}")));
        }
        if self.types.len() < 2 {
            return Err(invalid("credential type is required (set name or id)"));
        }
        if self.context.is_empty() {
            return Err(invalid("@context must not be empty"));
        }
        if let Some(schema) = &self.credential_schema {
            let subject = &schema.properties.credential_subject;
            if let Some(missing) = subject
                .required
                .iter()
                .find(|name| !subject.properties.contains_key(*name))
            {
                return Err(invalid(format!(
                    "required claim {missing} has no property"
                )));
            }
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
pub struct W3cDisplay {
    #[serde(
        rename = "backgroundColor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub background_color: Option<String>,
    #[serde(rename = "textColor", default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: SchemaProperties,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperties {
    #[serde(rename = "credentialSubject")]
    pub credential_subject: SubjectSchema,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// JSON-Schema descriptor for one claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(
        rename = "contentEncoding",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: schema_type.to_owned(),
            ..Self::default()
        }
    }
}

/// Map a claim type to its JSON-Schema descriptor.
pub fn json_schema_type(value_type: &ValueType) -> SchemaProperty {
    match value_type {
        ValueType::String | ValueType::Other(_) => SchemaProperty::of_type("string"),
        ValueType::Number => SchemaProperty::of_type("number"),
        ValueType::Integer => SchemaProperty::of_type("integer"),
        ValueType::Boolean => SchemaProperty::of_type("boolean"),
        ValueType::Date => SchemaProperty {
            format: Some("date".to_owned()),
            ..SchemaProperty::of_type("string")
        },
        ValueType::DateTime => SchemaProperty {
            format: Some("date-time".to_owned()),
            ..SchemaProperty::of_type("string")
        },
        ValueType::Image => SchemaProperty {
            content_encoding: Some("base64".to_owned()),
            ..SchemaProperty::of_type("string")
        },
        ValueType::Object => SchemaProperty::of_type("object"),
        ValueType::Array => SchemaProperty {
            items: Some(Box::new(SchemaProperty::of_type("string"))),
            ..SchemaProperty::of_type("array")
        },
    }
}

/// Convert free text to a PascalCase type name.
///
/// Words are split on whitespace and `-`; the first character of each word is
/// upper-cased and the rest kept as written, so `_` stays inside a word.
pub fn pascal_case(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Put the base type first exactly once, keeping the order of the rest.
fn with_base_type(types: Vec<String>) -> Vec<String> {
    let mut normalized = vec![BASE_TYPE.to_owned()];
    normalized.extend(types.into_iter().filter(|t| t != BASE_TYPE && !t.is_empty()));
    normalized
}

/// Generator for W3C Verifiable Credential schemas.
#[derive(Clone, Copy, Debug, Default)]
pub struct W3cGenerator;

impl W3cGenerator {
    /// Full `type` array: base type first, then explicit, overridden or derived types.
    pub fn derive_types(&self, credential: &ParsedCredential) -> Vec<String> {
        let specific = resolve_precedence(
            Some(credential.w3c_types.clone()).filter(|types| !types.is_empty()),
            credential.override_str_list(FORMAT, "type"),
            || {
                let derived = if credential.name.is_empty() {
                    pascal_case(&credential.id)
                } else {
                    pascal_case(&credential.name)
                };
                (!derived.is_empty()).then(|| vec![derived])
            },
        );
        with_base_type(specific.unwrap_or_default())
    }

    /// Full `@context` array.
    pub fn derive_context(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Vec<String> {
        resolve_precedence(
            Some(credential.w3c_context.clone()).filter(|ctx| !ctx.is_empty()),
            credential.override_str_list(FORMAT, "context"),
            || {
                let mut contexts = vec![BASE_CONTEXT.to_owned()];
                if let Some(base) = config.base_url()
                    && !credential.id.is_empty()
                {
                    contexts.push(format!("{base}/contexts/{}/v1", credential.id));
                }
                Some(contexts)
            },
        )
        .unwrap_or_default()
    }

    /// Build the schema document without serializing it.
    pub fn build(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> CredentialSchemaDocument {
        let display = (credential.background_color.is_some() || credential.text_color.is_some())
            .then(|| W3cDisplay {
                background_color: credential.background_color.clone(),
                text_color: credential.text_color.clone(),
            });

        let credential_schema = (!credential.claims.is_empty()).then(|| {
            let mut subject = SubjectSchema {
                schema_type: "object".to_owned(),
                ..SubjectSchema::default()
            };
            for claim in &credential.claims {
                let name = resolve_claim_name(claim, credential, FORMAT).to_owned();
                let property = SchemaProperty {
                    title: Some(claim.label().to_owned()),
                    description: Some(claim.description.clone()).filter(|d| !d.is_empty()),
                    ..json_schema_type(&claim.value_type)
                };
                if claim.mandatory && !subject.required.contains(&name) {
                    subject.required.push(name.clone());
                }
                subject.properties.insert(name, property);
            }
            CredentialSchema {
                schema_type: "JsonSchema".to_owned(),
                properties: SchemaProperties {
                    credential_subject: subject,
                },
            }
        });

        CredentialSchemaDocument {
            types: self.derive_types(credential),
            context: self.derive_context(credential, config),
            name: Some(credential.name.clone()).filter(|n| !n.is_empty()),
            description: Some(credential.description.clone()).filter(|d| !d.is_empty()),
            display,
            credential_schema,
        }
    }
}

impl FormatGenerator for W3cGenerator {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "W3C Verifiable Credential Data Model schema"
    }

    fn file_extension(&self) -> &'static str {
        "vc.json"
    }

    /// The most specific credential type (last entry of the `type` array).
    fn derive_identifier(
        &self,
        credential: &ParsedCredential,
        _config: &GeneratorConfig,
    ) -> Option<String> {
        let types = self.derive_types(credential);
        if types.len() > 1 { types.last().cloned() } else { None }
    }

    fn generate(
        &self,
        credential: &ParsedCredential,
        config: &GeneratorConfig,
    ) -> Result<Vec<u8>, FormatError> {
        let document = self.build(credential, config);
        document.validate()?;
        tracing::debug!(types = ?document.types, "Generated W3C credential schema");
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
