//! Element tree built from a structural event stream

use crate::handler::ContentHandler;
use crate::name::{Attributes, QName};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An element in a built tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Element name
    pub name: QName,

    /// Attributes from the start-element event (namespace declarations included)
    pub attributes: Attributes,

    /// Concatenated character content directly inside this element
    pub text: String,

    /// Child elements in document order
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new, empty node
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Attributes::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Local name of this element
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Find the first child with the given local name
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name.local == name)
    }

    /// Find all children with the given local name
    #[must_use]
    pub fn find_children(&self, name: &str) -> Vec<&Node> {
        self.children
            .iter()
            .filter(|c| c.name.local == name)
            .collect()
    }
}

/// Content handler that assembles the event stream into [`Node`]s.
///
/// A parse of one interchange produces one root element; top-level
/// elements are collected in order in case a handler is reused.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<Node>,
    roots: Vec<Node>,
}

impl TreeBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The completed top-level elements
    #[must_use]
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// The first completed top-level element
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.roots.first()
    }

    /// Consume the builder, returning the first top-level element.
    ///
    /// # Errors
    ///
    /// Returns an error if elements are still open or nothing was built.
    pub fn into_root(mut self) -> Result<Node> {
        if let Some(open) = self.stack.last() {
            return Err(Error::Unbalanced(format!(
                "element '{}' was never closed",
                open.name
            )));
        }
        if self.roots.is_empty() {
            return Err(Error::node_not_found("<root>"));
        }
        Ok(self.roots.swap_remove(0))
    }
}

impl ContentHandler for TreeBuilder {
    fn start_element(&mut self, name: &QName, attributes: &Attributes) -> Result<()> {
        let mut node = Node::new(name.clone());
        node.attributes = attributes.clone();
        self.stack.push(node);
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(node) => {
                node.text.push_str(text);
                Ok(())
            }
            None => Err(Error::Unbalanced(format!(
                "characters '{text}' outside of any element"
            ))),
        }
    }

    fn end_element(&mut self, name: &QName) -> Result<()> {
        let node = self.stack.pop().ok_or_else(|| {
            Error::Unbalanced(format!("end of '{name}' without a matching start"))
        })?;
        if node.name != *name {
            return Err(Error::Unbalanced(format!(
                "end of '{name}' while '{}' is open",
                node.name
            )));
        }
        match self.stack.last_mut() {
            Some(parent) => {
                parent.add_child(node);
            }
            None => self.roots.push(node),
        }
        Ok(())
    }
}
