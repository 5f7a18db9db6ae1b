#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-validation
//!
//! Value validation for mapped EDI fields.
//!
//! Each value position of a mapping model may carry a [`ValueSpec`]
//! declaring a data type and facets. [`validate_value`] checks one
//! tokenized value against it, honouring the decimal mark in force.
//!
//! ## Example Usage
//!
//! ```rust
//! use edi_schema::{DataType, ValueSpec};
//! use edi_validation::validate_value;
//!
//! let spec = ValueSpec::new(DataType::Decimal);
//! assert!(validate_value("12,5", &spec, ',').is_valid);
//! assert!(!validate_value("12.5", &spec, ',').is_valid);
//! ```

pub mod rules;

pub use edi_schema::{DataType, ValueSpec};
pub use rules::{
    RuleResult, validate_data_type, validate_length, validate_pattern, validate_value,
};

use thiserror::Error;

/// Errors that can occur during validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let spec = ValueSpec::new(DataType::Integer);
        assert!(validate_value("42", &spec, '.').into_result().is_ok());

        match validate_value("4x2", &spec, '.').into_result() {
            Err(Error::Validation(message)) => assert!(message.contains("4x2")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_date_converts_to_ok() -> anyhow::Result<()> {
        let spec = ValueSpec::new(DataType::Date);
        validate_value("20240131", &spec, '.').into_result()?;
        Ok(())
    }
}
