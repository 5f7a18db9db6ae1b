//! Import resolution for mapping documents
//!
//! A document may import other documents under a prefix and then reuse
//! their segment definitions with `ref: "prefix:SEGCODE"`. Referenced
//! segments are copied into the importing model, qualified with the
//! imported document's namespace and adjusted by the import's truncation
//! overrides.

use crate::model::{Edimap, NamespaceBinding, Segment, SegmentNode};
use crate::{Error, Result};
use std::collections::HashMap;

/// Truncation flags an import forces onto the segments it provides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncationOverrides {
    pub segments: Option<bool>,
    pub fields: Option<bool>,
    pub components: Option<bool>,
}

impl TruncationOverrides {
    fn apply(self, segment: &mut Segment) {
        if let Some(truncatable) = self.segments {
            segment.truncatable = truncatable;
        }
        for field in &mut segment.fields {
            if let Some(truncatable) = self.fields {
                field.truncatable = truncatable;
            }
            if let Some(truncatable) = self.components {
                for component in &mut field.components {
                    component.truncatable = truncatable;
                }
            }
        }
        for child in &mut segment.children {
            self.apply_node(child);
        }
    }

    fn apply_node(self, node: &mut SegmentNode) {
        match node {
            SegmentNode::Segment(segment) => self.apply(segment),
            SegmentNode::Group(group) => {
                for child in &mut group.children {
                    self.apply_node(child);
                }
            }
        }
    }
}

/// A resolved imported document available under a prefix
#[derive(Debug, Clone)]
pub struct ImportedLibrary {
    /// Document identifier, for error messages
    pub document: String,
    pub edimap: Edimap,
    /// Namespace applied to segments taken from this library
    pub namespace: Option<NamespaceBinding>,
    pub overrides: TruncationOverrides,
}

impl ImportedLibrary {
    /// Build a library entry. The namespace URI comes from the imported
    /// document's description; the prefix is the import prefix.
    pub fn new(
        document: impl Into<String>,
        edimap: Edimap,
        prefix: &str,
        overrides: TruncationOverrides,
    ) -> Self {
        let namespace = edimap
            .description
            .namespace
            .as_ref()
            .map(|uri| NamespaceBinding::new(uri.clone(), prefix));
        Self {
            document: document.into(),
            edimap,
            namespace,
            overrides,
        }
    }

    /// Find a segment definition by code anywhere in the library
    #[must_use]
    pub fn find_segment(&self, segcode: &str) -> Option<&Segment> {
        find_in(&self.edimap.segments.children, segcode)
    }
}

fn find_in<'a>(nodes: &'a [SegmentNode], segcode: &str) -> Option<&'a Segment> {
    for node in nodes {
        match node {
            SegmentNode::Segment(segment) => {
                if segment.segcode == segcode {
                    return Some(segment);
                }
                if let Some(found) = find_in(&segment.children, segcode) {
                    return Some(found);
                }
            }
            SegmentNode::Group(group) => {
                if let Some(found) = find_in(&group.children, segcode) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Libraries visible to one document, keyed by import prefix
#[derive(Debug, Default)]
pub struct ImportScope {
    libraries: HashMap<String, ImportedLibrary>,
}

impl ImportScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library under its prefix
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` when the prefix is already taken.
    pub fn add(&mut self, prefix: &str, library: ImportedLibrary, document: &str) -> Result<()> {
        if self.libraries.contains_key(prefix) {
            return Err(Error::invalid(
                document,
                format!("import prefix '{prefix}' is declared more than once"),
            ));
        }
        self.libraries.insert(prefix.to_string(), library);
        Ok(())
    }

    /// Resolve `prefix:SEGCODE` into an owned segment definition
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedReference` when the prefix or the segment is unknown.
    pub fn resolve(&self, reference: &str, document: &str) -> Result<Segment> {
        let unresolved = || Error::UnresolvedReference {
            document: document.to_string(),
            reference: reference.to_string(),
        };

        let (prefix, segcode) = reference.split_once(':').ok_or_else(unresolved)?;
        let library = self.libraries.get(prefix).ok_or_else(unresolved)?;
        let mut segment = library.find_segment(segcode).cloned().ok_or_else(unresolved)?;

        library.overrides.apply(&mut segment);
        if segment.namespace.is_none() {
            segment.namespace.clone_from(&library.namespace);
        }
        Ok(segment)
    }
}
