//! Element emission towards the content handler

use crate::Result;
use crate::namespace::NamespaceDeclarationStack;
use edi_events::{Attributes, ContentHandler, QName};
use edi_schema::NamespaceBinding;

/// Wraps the content handler with the open-element stack and the
/// namespace declaration stack of one parse
pub struct ElementEmitter<'h> {
    handler: &'h mut dyn ContentHandler,
    namespaces: NamespaceDeclarationStack,
    open: Vec<QName>,
}

impl<'h> ElementEmitter<'h> {
    pub fn new(handler: &'h mut dyn ContentHandler) -> Self {
        Self {
            handler,
            namespaces: NamespaceDeclarationStack::new(),
            open: Vec::new(),
        }
    }

    pub fn handler(&mut self) -> &mut dyn ContentHandler {
        &mut *self.handler
    }

    #[must_use]
    pub fn namespaces(&self) -> &NamespaceDeclarationStack {
        &self.namespaces
    }

    /// Number of elements started and not yet ended
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Bind `namespace` for the scope being entered unless it is already
    /// bound with the same prefix. Returns whether a binding was pushed.
    pub fn push_namespace(&mut self, namespace: Option<&NamespaceBinding>) -> bool {
        match namespace {
            Some(binding) if !self.namespaces.is_bound(binding) => {
                self.namespaces.push(binding.clone());
                true
            }
            _ => false,
        }
    }

    pub fn pop_namespace(&mut self, pushed: bool) {
        if pushed {
            self.namespaces.pop();
        }
    }

    fn name(&self, local: &str, namespace: Option<&NamespaceBinding>) -> QName {
        match namespace {
            Some(binding) => {
                let prefix = self
                    .namespaces
                    .resolve(&binding.uri)
                    .unwrap_or(&binding.prefix);
                QName::qualified(&binding.uri, prefix, local)
            }
            None => QName::local(local),
        }
    }

    /// Start an element, declaring any namespaces pushed since the last one
    ///
    /// # Errors
    ///
    /// Propagates content handler errors.
    pub fn start_element(&mut self, local: &str, namespace: Option<&NamespaceBinding>) -> Result<()> {
        let name = self.name(local, namespace);
        let mut attributes = Attributes::new();
        self.namespaces.declare_pending(&mut attributes);
        self.handler.start_element(&name, &attributes)?;
        self.open.push(name);
        Ok(())
    }

    /// Report text; empty text produces no event
    ///
    /// # Errors
    ///
    /// Propagates content handler errors.
    pub fn characters(&mut self, text: &str) -> Result<()> {
        if !text.is_empty() {
            self.handler.characters(text)?;
        }
        Ok(())
    }

    /// End the innermost open element
    ///
    /// # Errors
    ///
    /// Propagates content handler errors, or reports an unbalanced end.
    pub fn end_element(&mut self) -> Result<()> {
        let name = self.open.pop().ok_or_else(|| {
            edi_events::Error::Unbalanced("end of element with none open".to_string())
        })?;
        self.handler.end_element(&name)?;
        Ok(())
    }

    /// Emit a leaf element carrying `text`
    ///
    /// # Errors
    ///
    /// Propagates content handler errors.
    pub fn text_element(
        &mut self,
        local: &str,
        namespace: Option<&NamespaceBinding>,
        text: &str,
    ) -> Result<()> {
        self.start_element(local, namespace)?;
        self.characters(text)?;
        self.end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_events::{Event, EventRecorder};

    #[test]
    fn test_declares_namespace_on_next_element() {
        let mut recorder = EventRecorder::new();
        let binding = NamespaceBinding::new("urn:orders", "o");
        {
            let mut emitter = ElementEmitter::new(&mut recorder);
            assert!(emitter.push_namespace(Some(&binding)));
            assert!(!emitter.push_namespace(Some(&binding)));
            emitter.start_element("Order", Some(&binding)).unwrap();
            emitter.text_element("number", Some(&binding), "PO1").unwrap();
            emitter.end_element().unwrap();
            emitter.pop_namespace(true);
            assert_eq!(emitter.depth(), 0);
        }

        let events = recorder.events();
        match &events[0] {
            Event::StartElement { name, attributes } => {
                assert_eq!(name.prefixed(), "o:Order");
                assert_eq!(attributes.get("xmlns:o"), Some("urn:orders"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[1] {
            Event::StartElement { attributes, .. } => assert!(attributes.is_empty()),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(recorder.text(), "PO1");
    }

    #[test]
    fn test_empty_text_is_not_reported() {
        let mut recorder = EventRecorder::new();
        {
            let mut emitter = ElementEmitter::new(&mut recorder);
            emitter.text_element("empty", None, "").unwrap();
        }
        assert_eq!(recorder.events().len(), 2);
    }

    #[test]
    fn test_unbalanced_end() {
        let mut recorder = EventRecorder::new();
        let mut emitter = ElementEmitter::new(&mut recorder);
        assert!(emitter.end_element().is_err());
    }
}
