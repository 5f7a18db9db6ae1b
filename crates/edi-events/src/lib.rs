#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-events
//!
//! Structural content events emitted by the EDI parsing engine.
//!
//! The parser never builds a document itself. It drives a
//! [`ContentHandler`] with `start_element` / `characters` / `end_element`
//! calls, the same shape as a SAX stream. This crate defines that boundary
//! plus two handlers that are useful to consumers and tests: an
//! [`EventRecorder`] that keeps the raw event sequence, and a
//! [`TreeBuilder`] that folds the events into a [`Node`] tree which can be
//! navigated with a [`Cursor`].

/// The handler trait and the recorded event form.
pub mod handler;
/// Qualified names and element attributes.
pub mod name;
/// Element tree built from an event stream.
pub mod node;
/// Path navigation over built trees.
pub mod traversal;

pub use handler::{ContentHandler, Event, EventRecorder};
pub use name::{Attribute, Attributes, QName};
pub use node::{Node, TreeBuilder};
pub use traversal::Cursor;

use thiserror::Error;

/// Errors raised by content handlers and tree navigation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Content handler rejected event: {0}")]
    Handler(String),

    #[error("Unbalanced element events: {0}")]
    Unbalanced(String),

    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl Error {
    /// Build a handler error from any displayable cause.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for event handling.
pub type Result<T> = std::result::Result<T, Error>;
