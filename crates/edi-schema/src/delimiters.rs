//! Delimiter sets governing EDI tokenization
//!
//! The default set is the UN/EDIFACT one. A UNA service string advice, a
//! mapping model, or configuration may replace it for a scope.

use serde::{Deserialize, Serialize};

/// Default UN/EDIFACT separators (when no UNA is present)
pub const DEFAULT_SEGMENT_TERMINATOR: char = '\'';
pub const DEFAULT_FIELD_SEPARATOR: char = '+';
pub const DEFAULT_COMPONENT_SEPARATOR: char = ':';
pub const DEFAULT_DECIMAL_POINT: char = '.';
pub const DEFAULT_RELEASE_CHARACTER: char = '?';

/// Separator and escape characters used while tokenizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Segment terminator (default '\'')
    pub segment: char,
    /// Field (data element) separator (default '+')
    pub field: char,
    /// Component separator (default ':')
    pub component: char,
    /// Sub-component separator; UN/EDIFACT does not define one
    pub sub_component: Option<char>,
    /// Decimal mark used by numeric values (default '.')
    pub decimal: char,
    /// Release (escape) character (default '?')
    pub escape: Option<char>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            segment: DEFAULT_SEGMENT_TERMINATOR,
            field: DEFAULT_FIELD_SEPARATOR,
            component: DEFAULT_COMPONENT_SEPARATOR,
            sub_component: None,
            decimal: DEFAULT_DECIMAL_POINT,
            escape: Some(DEFAULT_RELEASE_CHARACTER),
        }
    }
}

impl Delimiters {
    /// Build delimiters from the six service characters following `UNA`.
    ///
    /// Order: component, field, decimal, release, reserved, segment.
    /// A space in the release position means no release character. The
    /// reserved position (repetition separator in syntax version 4) is
    /// not used for tokenization.
    #[must_use]
    pub fn from_una(chars: [char; 6]) -> Self {
        Self {
            component: chars[0],
            field: chars[1],
            decimal: chars[2],
            escape: (chars[3] != ' ').then_some(chars[3]),
            sub_component: None,
            segment: chars[5],
        }
    }

    /// Render these delimiters as a UNA service string advice
    #[must_use]
    pub fn to_una(&self) -> String {
        let mut una = String::from("UNA");
        una.push(self.component);
        una.push(self.field);
        una.push(self.decimal);
        una.push(self.escape.unwrap_or(' '));
        una.push(' ');
        una.push(self.segment);
        una
    }

    /// The release character; an alias of `escape` in UN/EDIFACT terms.
    #[must_use]
    pub fn release(&self) -> Option<char> {
        self.escape
    }

    /// Copy of these delimiters with a different decimal mark
    #[must_use]
    pub fn with_decimal(mut self, decimal: char) -> Self {
        self.decimal = decimal;
        self
    }

    /// Copy of these delimiters with a sub-component separator
    #[must_use]
    pub fn with_sub_component(mut self, sub_component: char) -> Self {
        self.sub_component = Some(sub_component);
        self
    }

    /// Check if a character has structural meaning (needs releasing in data)
    #[must_use]
    pub fn is_special(&self, c: char) -> bool {
        c == self.segment
            || c == self.field
            || c == self.component
            || Some(c) == self.sub_component
            || Some(c) == self.escape
    }

    /// Whether data tokenized with `active` can be matched against a model
    /// declaring these delimiters. Only the structural separators count;
    /// decimal mark and release character may differ.
    #[must_use]
    pub fn is_compatible_with(&self, active: &Delimiters) -> bool {
        self.segment == active.segment
            && self.field == active.field
            && self.component == active.component
            && (self.sub_component.is_none() || self.sub_component == active.sub_component)
    }
}
