//! Cursor navigation over built element trees

use crate::node::Node;
use crate::{Error, Result};

/// A cursor for navigating a built tree by local element names
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// Current node
    node: &'a Node,

    /// Path to current node (for error reporting)
    path: Vec<String>,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the given node
    #[must_use]
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            path: vec![node.name.local.clone()],
        }
    }

    /// Get the current node
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Text content of the current node
    #[must_use]
    pub fn text(&self) -> &'a str {
        &self.node.text
    }

    /// Get the current path
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Navigate to a child node by local name
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` when no child has that name.
    pub fn child(&self, name: &str) -> Result<Cursor<'a>> {
        let child = self
            .node
            .find_child(name)
            .ok_or_else(|| Error::node_not_found(format!("{}/{}", self.path.join("/"), name)))?;
        let mut path = self.path.clone();
        path.push(name.to_string());
        Ok(Cursor { node: child, path })
    }

    /// Get all children matching a local name
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<Cursor<'a>> {
        self.node
            .find_children(name)
            .into_iter()
            .enumerate()
            .map(|(idx, child)| {
                let mut path = self.path.clone();
                path.push(format!("{name}[{idx}]"));
                Cursor { node: child, path }
            })
            .collect()
    }

    /// Navigate using a path (e.g., "interchangeMessage[1]/Order/BGM/documentNumber")
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for a malformed index and `NodeNotFound`
    /// when any step does not exist.
    pub fn navigate(&self, path: &str) -> Result<Cursor<'a>> {
        let mut current_node = self.node;
        let mut current_path = self.path.clone();

        for step in path.split('/') {
            if step.is_empty() {
                continue;
            }

            let (name, index) = match step.find('[') {
                Some(open) => {
                    let close = step
                        .find(']')
                        .ok_or_else(|| Error::invalid_path(path, format!("unclosed bracket in '{step}'")))?;
                    let index: usize = step[open + 1..close]
                        .parse()
                        .map_err(|_| Error::invalid_path(path, format!("invalid index in '{step}'")))?;
                    (&step[..open], index)
                }
                None => (step, 0),
            };

            current_node = current_node
                .children
                .iter()
                .filter(|c| c.name.local == name)
                .nth(index)
                .ok_or_else(|| {
                    Error::node_not_found(format!("{}/{}", current_path.join("/"), step))
                })?;
            current_path.push(format!("{name}[{index}]"));
        }

        Ok(Cursor {
            node: current_node,
            path: current_path,
        })
    }

    /// Text at a relative path
    ///
    /// # Errors
    ///
    /// Propagates navigation errors.
    pub fn text_at(&self, path: &str) -> Result<&'a str> {
        Ok(self.navigate(path)?.text())
    }
}
