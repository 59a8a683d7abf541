//! Shared derivation helpers used by every generator.

use std::collections::BTreeMap;

use crate::{ClaimDefinition, ParsedCredential};

/// Resolve a value by precedence: explicit > format override > derived default.
///
/// `derive` is only evaluated when neither of the first two is present. Callers
/// are expected to pass `None` for empty values.
pub fn resolve_precedence<T>(
    explicit: Option<T>,
    overridden: Option<T>,
    derive: impl FnOnce() -> Option<T>,
) -> Option<T> {
    explicit.or(overridden).or_else(derive)
}

/// Resolve the key a claim is emitted under for `format`.
///
/// Checks the claim's own `as.<format>=<name>` alias, then the bulk
/// `formats.<format>.claims` table on the credential, then falls back to the
/// claim name.
pub fn resolve_claim_name<'a>(
    claim: &'a ClaimDefinition,
    credential: &'a ParsedCredential,
    format: &str,
) -> &'a str {
    resolve_precedence(
        claim
            .format_mappings
            .get(format)
            .map(String::as_str)
            .filter(|name| !name.is_empty()),
        credential
            .claim_mappings
            .get(format)
            .and_then(|table| table.get(&claim.name))
            .map(String::as_str)
            .filter(|name| !name.is_empty()),
        || Some(claim.name.as_str()),
    )
    .unwrap_or(&claim.name)
}

/// Build a locale-ordered display list.
///
/// The default-locale entry (if any) comes first. Entries for other locales
/// follow in sorted order; an entry keyed by the default locale is skipped so
/// it never appears twice.
pub fn localized_displays<V, T>(
    default_locale: &str,
    default_entry: Option<T>,
    localizations: &BTreeMap<String, V>,
    mut build: impl FnMut(&str, &V) -> T,
) -> Vec<T> {
    let mut displays: Vec<T> = default_entry.into_iter().collect();
    displays.extend(
        localizations
            .iter()
            .filter(|(locale, _)| locale.as_str() != default_locale)
            .map(|(locale, value)| build(locale, value)),
    );
    displays
}
