//! Environment variable helpers shared by the config loaders.
//!
//! Every loader reads `KEY`, falls back to a default when unset, and
//! reports unparsable values as [`CoreError::Validation`] instead of
//! panicking.

use std::str::FromStr;

use crate::error::CoreError;

/// Read `key` and parse it, returning `default` when the variable is unset
/// or empty.
pub fn parse_or<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match parse_opt(key)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// Read `key` and parse it, returning `None` when the variable is unset
/// or empty.
pub fn parse_opt<T>(key: &str) -> Result<Option<T>, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = string_opt(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| CoreError::Validation(format!("{key} has invalid value '{raw}': {e}")))
}

/// Read `key` as a trimmed string, treating empty values as unset.
pub fn string_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read `key` as a string with a default.
pub fn string_or(key: &str, default: &str) -> String {
    string_opt(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they can run in parallel.

    #[test]
    fn unset_variable_uses_default() {
        let value: u16 = parse_or("AIGC_TEST_ENV_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn set_variable_is_parsed() {
        std::env::set_var("AIGC_TEST_ENV_SET", " 7 ");
        let value: usize = parse_or("AIGC_TEST_ENV_SET", 1).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn invalid_variable_is_validation_error() {
        std::env::set_var("AIGC_TEST_ENV_BAD", "seven");
        let err = parse_or::<usize>("AIGC_TEST_ENV_BAD", 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("AIGC_TEST_ENV_BAD"));
    }

    #[test]
    fn empty_variable_counts_as_unset() {
        std::env::set_var("AIGC_TEST_ENV_EMPTY", "   ");
        assert_eq!(string_opt("AIGC_TEST_ENV_EMPTY"), None);
        assert_eq!(string_or("AIGC_TEST_ENV_EMPTY", "x"), "x");
    }
}
