//! Qualified element names and attributes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A namespace-qualified element name.
///
/// `prefix` is only set when the emitting scope bound the namespace to a
/// prefix; an element without a namespace has neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI, if any
    pub namespace: Option<String>,
    /// Prefix the namespace is bound to in the current scope
    pub prefix: Option<String>,
    /// Local part of the name
    pub local: String,
}

impl QName {
    /// Create an unqualified name.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: local.into(),
        }
    }

    /// Create a qualified name.
    pub fn qualified(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        local: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// The `prefix:local` form, or just `local` when unprefixed.
    #[must_use]
    pub fn prefixed(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", self.local),
            _ => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed())
    }
}

/// A single element attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as written (e.g. `xmlns:orders`)
    pub name: String,
    /// Attribute value
    pub value: String,
}

/// Ordered attribute list attached to a start-element event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    items: Vec<Attribute>,
}

impl Attributes {
    /// Create an empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Append a namespace declaration (`xmlns:prefix="uri"`, or `xmlns` for the empty prefix).
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if prefix.is_empty() {
            self.push("xmlns", uri);
        } else {
            self.push(format!("xmlns:{prefix}"), uri);
        }
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
