//! Validation rules

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use edi_schema::{DataType, ValueSpec};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Default pattern for `Date` values (CCYYMMDD)
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

/// Default pattern for `Time` values (HHMM)
pub const DEFAULT_TIME_FORMAT: &str = "%H%M";

static INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?[0-9]+$").unwrap_or_else(|e| unreachable!("integer pattern: {e}"))
});

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$")
        .unwrap_or_else(|e| unreachable!("decimal pattern: {e}"))
});

/// Validation rule result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }

    /// Convert into a `Result`, carrying the failure message
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the rule failed.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(Error::Validation(self.message.unwrap_or_default()))
        }
    }
}

/// Validate length constraints, counted in characters
#[must_use]
pub fn validate_length(value: &str, min: Option<usize>, max: Option<usize>) -> RuleResult {
    let len = value.chars().count();

    if let Some(min) = min {
        if len < min {
            return RuleResult::invalid(format!("Value length {len} is less than minimum {min}"));
        }
    }

    if let Some(max) = max {
        if len > max {
            return RuleResult::invalid(format!("Value length {len} exceeds maximum {max}"));
        }
    }

    RuleResult::valid()
}

/// Validate pattern matching
#[must_use]
pub fn validate_pattern(value: &str, pattern: &Regex) -> RuleResult {
    if pattern.is_match(value) {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!(
            "Value '{value}' does not match pattern '{}'",
            pattern.as_str()
        ))
    }
}

/// Validate data type. `decimal` is the decimal mark in force; `format`
/// overrides the default date or time pattern.
#[must_use]
pub fn validate_data_type(
    value: &str,
    data_type: DataType,
    format: Option<&str>,
    decimal: char,
) -> RuleResult {
    match data_type {
        DataType::String => RuleResult::valid(),
        DataType::Integer => {
            if INTEGER.is_match(value) {
                RuleResult::valid()
            } else {
                RuleResult::invalid(format!("Value '{value}' is not a valid integer"))
            }
        }
        DataType::Decimal => {
            let normalized: String = value
                .chars()
                .map(|c| if c == decimal { '.' } else { c })
                .collect();
            if (decimal == '.' || !value.contains('.')) && DECIMAL.is_match(&normalized) {
                RuleResult::valid()
            } else {
                RuleResult::invalid(format!(
                    "Value '{value}' is not a valid decimal (decimal mark '{decimal}')"
                ))
            }
        }
        DataType::Date => {
            let format = format.unwrap_or(DEFAULT_DATE_FORMAT);
            match NaiveDate::parse_from_str(value, format) {
                Ok(_) => RuleResult::valid(),
                Err(e) => RuleResult::invalid(format!(
                    "Value '{value}' is not a valid date for '{format}': {e}"
                )),
            }
        }
        DataType::Time => {
            let format = format.unwrap_or(DEFAULT_TIME_FORMAT);
            match NaiveTime::parse_from_str(value, format) {
                Ok(_) => RuleResult::valid(),
                Err(e) => RuleResult::invalid(format!(
                    "Value '{value}' is not a valid time for '{format}': {e}"
                )),
            }
        }
    }
}

/// Validate a non-empty value against all facets of its spec.
/// Empty values are left to the required-position check.
#[must_use]
pub fn validate_value(value: &str, spec: &ValueSpec, decimal: char) -> RuleResult {
    if value.is_empty() {
        return RuleResult::valid();
    }

    let checks = [
        validate_data_type(value, spec.data_type, spec.format.as_deref(), decimal),
        validate_length(value, spec.min_length, spec.max_length),
    ];
    for result in checks {
        if !result.is_valid {
            trace!("Value '{}' rejected: {:?}", value, result.message);
            return result;
        }
    }

    match &spec.pattern {
        Some(pattern) => validate_pattern(value, pattern),
        None => RuleResult::valid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_constraints() {
        assert!(validate_length("hello", Some(3), Some(10)).is_valid);
        assert!(!validate_length("ab", Some(3), Some(10)).is_valid);
        assert!(!validate_length("this is way too long", Some(3), Some(10)).is_valid);
        assert!(validate_length("abc", Some(3), None).is_valid);
        assert!(validate_length("0123456789", None, Some(10)).is_valid);
        assert!(validate_length("", None, None).is_valid);
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(validate_length("Müller", None, Some(6)).is_valid);
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = Regex::new("^[0-9]+$").unwrap();
        assert!(validate_pattern("12345", &pattern).is_valid);

        let result = validate_pattern("123a", &pattern);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains("123a"));
    }

    #[test]
    fn test_integer() {
        for value in ["0", "42", "-7", "+100"] {
            assert!(validate_data_type(value, DataType::Integer, None, '.').is_valid, "{value}");
        }
        for value in ["", "4.2", "12a", "--1"] {
            assert!(!validate_data_type(value, DataType::Integer, None, '.').is_valid, "{value}");
        }
    }

    #[test]
    fn test_decimal_with_point() {
        for value in ["10", "10.5", "-0.25", ".5", "3."] {
            assert!(validate_data_type(value, DataType::Decimal, None, '.').is_valid, "{value}");
        }
        for value in ["10,5", "1.2.3", "abc"] {
            assert!(!validate_data_type(value, DataType::Decimal, None, '.').is_valid, "{value}");
        }
    }

    #[test]
    fn test_decimal_with_comma() {
        assert!(validate_data_type("10,5", DataType::Decimal, None, ',').is_valid);
        assert!(!validate_data_type("10.5", DataType::Decimal, None, ',').is_valid);
    }

    #[test]
    fn test_date() {
        assert!(validate_data_type("20240229", DataType::Date, None, '.').is_valid);
        assert!(!validate_data_type("20230229", DataType::Date, None, '.').is_valid);
        assert!(!validate_data_type("2024-02-01", DataType::Date, None, '.').is_valid);
        assert!(validate_data_type("2024-02-01", DataType::Date, Some("%Y-%m-%d"), '.').is_valid);
    }

    #[test]
    fn test_time() {
        assert!(validate_data_type("1230", DataType::Time, None, '.').is_valid);
        assert!(!validate_data_type("2560", DataType::Time, None, '.').is_valid);
        assert!(validate_data_type("12:30:15", DataType::Time, Some("%H:%M:%S"), '.').is_valid);
    }

    #[test]
    fn test_validate_value_facets() {
        let spec = ValueSpec::new(DataType::String)
            .with_length(Some(2), Some(3))
            .with_pattern(Regex::new("^[A-Z]+$").unwrap());

        assert!(validate_value("ABC", &spec, '.').is_valid);
        assert!(!validate_value("A", &spec, '.').is_valid);
        assert!(!validate_value("abc", &spec, '.').is_valid);
        assert!(validate_value("", &spec, '.').is_valid);
    }
}
