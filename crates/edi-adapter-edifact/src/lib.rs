#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-adapter-edifact
//!
//! Streaming UN/EDIFACT interchange parser.
//!
//! Delimited EDI text is split into segments by [`SegmentReader`], the
//! interchange envelope (UNA, UNB, UNG/UNE, UNH/UNT, UNZ) is driven by the
//! control block handlers, and each message body is matched against its
//! mapping model by the structural matcher. Everything is reported to an
//! [`edi_events::ContentHandler`] as start-element, characters and
//! end-element events.
//!
//! ## Example Usage
//!
//! ```rust
//! use edi_adapter_edifact::InterchangeParser;
//! use edi_events::TreeBuilder;
//! use edi_schema::{MappingLoader, MappingsRegistry, EdifactModel};
//! use std::sync::Arc;
//!
//! let edimap = MappingLoader::new().load_from_json(r#"{
//!     "description": {"name": "ORDERS", "version": "D:96A:UN"},
//!     "segments": {"xmltag": "Order", "children": [
//!         {"segment": {"segcode": "BGM", "xmltag": "Header", "min_occurs": 1,
//!          "fields": [{"xmltag": "name"}, {"xmltag": "number"}]}}
//!     ]}
//! }"#).unwrap();
//! let registry = Arc::new(MappingsRegistry::from_models([EdifactModel::new(edimap)]).unwrap());
//!
//! let input = "UNB+UNOA:4+SENDER+RECEIVER+240101:1200+1'\
//!              UNH+1+ORDERS:D:96A:UN'BGM+220+PO1'UNT+3+1'UNZ+1+1'";
//! let mut tree = TreeBuilder::new();
//! InterchangeParser::new(registry).parse(input.as_bytes(), &mut tree).unwrap();
//!
//! let root = tree.into_root().unwrap();
//! assert_eq!(root.local_name(), "unEdifact");
//! ```

pub mod charset;
pub mod config;
pub mod control;
pub mod emitter;
pub mod fields;
pub mod interchange;
pub mod namespace;
pub mod parser;
pub mod reader;

pub use charset::Charset;
pub use config::ParserConfig;
pub use control::{ControlBlock, ControlBlockHandlerFactory, SyntaxVersion};
pub use interchange::{InterchangeContext, InterchangeParser};
pub use namespace::NamespaceDeclarationStack;
pub use emitter::ElementEmitter;
pub use parser::{EdiParser, StructuralMatcher};
pub use reader::{Next, SegmentReader};

use std::fmt;
use thiserror::Error;

/// 1-based position of a value inside a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPosition {
    pub field: usize,
    pub component: Option<usize>,
    pub sub_component: Option<usize>,
}

impl FieldPosition {
    #[must_use]
    pub fn field(field: usize) -> Self {
        Self {
            field,
            component: None,
            sub_component: None,
        }
    }

    #[must_use]
    pub fn component(self, component: usize) -> Self {
        Self {
            component: Some(component),
            ..self
        }
    }

    #[must_use]
    pub fn sub_component(self, sub_component: usize) -> Self {
        Self {
            sub_component: Some(sub_component),
            ..self
        }
    }
}

impl fmt::Display for FieldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {}", self.field)?;
        if let Some(component) = self.component {
            write!(f, ", component {component}")?;
        }
        if let Some(sub_component) = self.sub_component {
            write!(f, ", sub-component {sub_component}")?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing EDIFACT
#[derive(Error, Debug)]
pub enum Error {
    #[error("Tokenizer error: {message}. Currently at segment number {segment_number}.")]
    Tokenize {
        message: String,
        segment_number: usize,
    },

    #[error("{message}")]
    Envelope {
        message: String,
        segment_number: Option<usize>,
    },

    #[error("Mapping registry error: {0}")]
    Registry(#[from] edi_schema::Error),

    #[error("Unsupported character set '{code}'. Currently at segment number {segment_number}.")]
    UnsupportedCharset { code: String, segment_number: usize },

    #[error("{message}")]
    Structure {
        message: String,
        segment_number: usize,
    },

    #[error(
        "Segment [{segment}], {position}: expected {expected} but found '{value}' ({reason}). Currently at segment number {segment_number}."
    )]
    Validation {
        segment: String,
        position: FieldPosition,
        expected: String,
        value: String,
        reason: String,
        segment_number: usize,
    },

    #[error("Invalid parser configuration: {0}")]
    Config(String),

    #[error("Content handler error: {0}")]
    Handler(#[from] edi_events::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn tokenize(message: impl Into<String>, segment_number: usize) -> Self {
        Self::Tokenize {
            message: message.into(),
            segment_number,
        }
    }

    pub(crate) fn envelope(message: impl Into<String>, segment_number: Option<usize>) -> Self {
        Self::Envelope {
            message: message.into(),
            segment_number,
        }
    }

    pub(crate) fn structure(message: impl Into<String>, segment_number: usize) -> Self {
        Self::Structure {
            message: message.into(),
            segment_number,
        }
    }

    /// The 1-based number of the segment being processed when the error
    /// occurred, where known
    #[must_use]
    pub fn segment_number(&self) -> Option<usize> {
        match self {
            Error::Tokenize { segment_number, .. }
            | Error::UnsupportedCharset { segment_number, .. }
            | Error::Structure { segment_number, .. }
            | Error::Validation { segment_number, .. } => Some(*segment_number),
            Error::Envelope { segment_number, .. } => *segment_number,
            Error::Registry(_) | Error::Config(_) | Error::Handler(_) | Error::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_position_display() {
        assert_eq!(FieldPosition::field(2).to_string(), "field 2");
        assert_eq!(
            FieldPosition::field(2).component(1).sub_component(3).to_string(),
            "field 2, component 1, sub-component 3"
        );
    }

    #[test]
    fn test_segment_number() {
        assert_eq!(Error::structure("x", 4).segment_number(), Some(4));
        assert_eq!(Error::envelope("x", None).segment_number(), None);
        assert_eq!(Error::Config("x".into()).segment_number(), None);
    }
}
