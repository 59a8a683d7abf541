//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(
            expand_env("https://example.com", "base_url").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MTC_EXPAND_UNSET");
        }
        assert_eq!(
            expand_env("${MTC_EXPAND_UNSET:-en-US}", "language").unwrap(),
            "en-US"
        );
    }

    #[test]
    fn test_set_variable_expanded() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MTC_EXPAND_HOST", "registry.example.com");
        }
        assert_eq!(
            expand_env("https://${MTC_EXPAND_HOST}/vct", "base_url").unwrap(),
            "https://registry.example.com/vct"
        );
        unsafe {
            std::env::remove_var("MTC_EXPAND_HOST");
        }
    }

    #[test]
    fn test_missing_variable_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MTC_EXPAND_MISSING");
        }
        let err = expand_env("${MTC_EXPAND_MISSING}", "base_url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MTC_EXPAND_MISSING"));
        assert!(err.to_string().contains("base_url"));
    }
}
