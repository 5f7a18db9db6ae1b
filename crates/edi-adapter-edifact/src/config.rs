//! Parser configuration

use crate::charset::Charset;
use crate::{Error, Result};
use edi_schema::Delimiters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default upper bound on the length of a single segment, in characters
pub const DEFAULT_MAX_SEGMENT_LENGTH: usize = 1024 * 1024;

/// Options controlling a parse
///
/// Every field has a default, so a configuration file only needs to name
/// the options it changes:
///
/// ```yaml
/// validate: false
/// ignore_new_lines: true
/// delimiters:
///   decimal: ","
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Check values against their declared types and facets
    pub validate: bool,
    /// Skip CR/LF between segments
    pub ignore_new_lines: bool,
    /// Longest segment accepted before the tokenizer gives up
    pub max_segment_length: usize,
    /// Character set used until an interchange header names another
    pub default_encoding: Charset,
    /// Delimiters used when the input carries no UNA
    pub delimiters: Delimiters,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            validate: true,
            ignore_new_lines: false,
            max_segment_length: DEFAULT_MAX_SEGMENT_LENGTH,
            default_encoding: Charset::default(),
            delimiters: Delimiters::default(),
        }
    }
}

impl ParserConfig {
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub fn with_ignore_new_lines(mut self, ignore: bool) -> Self {
        self.ignore_new_lines = ignore;
        self
    }

    #[must_use]
    pub fn with_max_segment_length(mut self, max: usize) -> Self {
        self.max_segment_length = max;
        self
    }

    #[must_use]
    pub fn with_default_encoding(mut self, charset: Charset) -> Self {
        self.default_encoding = charset;
        self
    }

    #[must_use]
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Parse a configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("YAML parse error: {e}")))?;
        config.checked()
    }

    /// Parse a configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("JSON parse error: {e}")))?;
        config.checked()
    }

    /// Load a configuration file; `.json` files are read as JSON, anything
    /// else as YAML
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or `Error::Config`
    /// if its content is invalid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    fn checked(self) -> Result<Self> {
        if self.max_segment_length == 0 {
            return Err(Error::Config("max_segment_length must be positive".to_string()));
        }
        let d = &self.delimiters;
        let separators = [Some(d.segment), Some(d.field), Some(d.component), d.sub_component, d.escape];
        for (i, a) in separators.iter().enumerate() {
            if a.is_some() && separators[i + 1..].contains(a) {
                return Err(Error::Config(format!(
                    "delimiter '{}' is used for more than one purpose",
                    a.unwrap_or_default()
                )));
            }
        }
        Ok(self)
    }
}
