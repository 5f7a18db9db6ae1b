//! # edi-schema
//!
//! Mapping models, mapping-document loading, and the mappings registry.
//!
//! Mapping documents (JSON or YAML) are digested into [`Edimap`]s with
//! their imports resolved and checked for cycles, then compiled into
//! immutable [`EdifactModel`]s. A [`MappingsRegistry`] holds the compiled
//! models keyed by message lookup name and can be populated from a
//! directory, an explicit list, or a zip archive with a manifest.

pub mod archive;
pub mod delimiters;
pub mod imports;
pub mod loader;
pub mod model;
pub mod registry;

pub use delimiters::Delimiters;
pub use loader::MappingLoader;
pub use model::{
    Component, DataType, Description, EdifactModel, Edimap, Field, MaxOccurs, NamespaceBinding,
    Segment, SegmentGroup, SegmentNode, SubComponent, ValueSpec,
};
pub use registry::MappingsRegistry;

use thiserror::Error;

/// Errors that can occur when loading or resolving mapping models
#[derive(Error, Debug)]
pub enum Error {
    #[error("No mapping model registered for message '{0}'")]
    NotFound(String),

    #[error("Invalid mapping document {document}: {message}")]
    InvalidFormat { document: String, message: String },

    #[error(
        "Mapping model '{model}' requires delimiters {expected:?} but the interchange uses {actual:?}"
    )]
    IncompatibleDelimiters {
        model: String,
        expected: Box<Delimiters>,
        actual: Box<Delimiters>,
    },

    #[error("Cyclic mapping import detected: {cycle}")]
    CyclicImport { cycle: String },

    #[error("Unresolved segment reference '{reference}' in {document}")]
    UnresolvedReference { document: String, reference: String },

    #[error("Duplicate mapping model '{0}'")]
    DuplicateModel(String),

    #[error("Mapping archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            document: document.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
