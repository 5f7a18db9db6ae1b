//! Namespace declaration stack
//!
//! Bindings are pushed when a message, group or segment declares a
//! namespace its parent does not already bind, and popped when that scope
//! closes. A pushed binding is declared (as an `xmlns` attribute) on the
//! next element started.

use edi_events::Attributes;
use edi_schema::NamespaceBinding;

#[derive(Debug, Default)]
pub struct NamespaceDeclarationStack {
    scopes: Vec<NamespaceBinding>,
    /// Bindings not yet declared on an element
    pending: Vec<NamespaceBinding>,
}

impl NamespaceDeclarationStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, binding: NamespaceBinding) {
        self.pending.push(binding.clone());
        self.scopes.push(binding);
    }

    pub fn pop(&mut self) -> Option<NamespaceBinding> {
        let binding = self.scopes.pop()?;
        if let Some(pos) = self.pending.iter().rposition(|b| *b == binding) {
            self.pending.remove(pos);
        }
        Some(binding)
    }

    /// Prefix bound to `uri`; the innermost binding wins
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find(|b| b.uri == uri)
            .map(|b| b.prefix.as_str())
    }

    /// Whether `binding` is already in effect with the same prefix
    #[must_use]
    pub fn is_bound(&self, binding: &NamespaceBinding) -> bool {
        self.resolve(&binding.uri) == Some(binding.prefix.as_str())
    }

    /// Move the undeclared bindings into `attributes`
    pub fn declare_pending(&mut self, attributes: &mut Attributes) {
        for binding in self.pending.drain(..) {
            attributes.declare_namespace(&binding.prefix, &binding.uri);
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
