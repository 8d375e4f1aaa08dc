// Path: crates/corenet-types/src/config_value.rs

use serde::{Deserialize, Serialize};

/// A dynamically-typed configuration value, replacing the single-char type
/// codes of the original on-disk format. The on-disk hint still determines
/// which variant a freshly-parsed line produces; everything downstream of
/// the loader deals only in this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
    Array(Vec<String>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            ConfigValue::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Parses a raw on-disk value string into its typed form.
    ///
    /// Booleans are case-insensitive `true`/`false`; decimals must parse
    /// strictly (no trailing garbage, no overflow); an array opens with
    /// `[` (closing `]` may be on a later line, handled by the loader
    /// before this is called); everything else is a string.
    pub fn parse(raw: &str) -> ConfigValue {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
            if inner.trim().is_empty() {
                return ConfigValue::Array(Vec::new());
            }
            return ConfigValue::Array(
                inner
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return ConfigValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return ConfigValue::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return ConfigValue::Int(i);
        }
        ConfigValue::String(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bool_case_insensitive() {
        assert_eq!(ConfigValue::parse("True"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::parse("FALSE"), ConfigValue::Bool(false));
    }

    #[test]
    fn parses_strict_decimal() {
        assert_eq!(ConfigValue::parse("42"), ConfigValue::Int(42));
        assert_eq!(
            ConfigValue::parse("42abc"),
            ConfigValue::String("42abc".to_string())
        );
    }

    #[test]
    fn parses_array() {
        assert_eq!(
            ConfigValue::parse("[a,b,c]"),
            ConfigValue::Array(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(ConfigValue::parse("[]"), ConfigValue::Array(vec![]));
    }
}
