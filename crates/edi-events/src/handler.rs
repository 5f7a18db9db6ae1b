//! Content handler boundary

use crate::Result;
use crate::name::{Attributes, QName};
use serde::{Deserialize, Serialize};

/// Receiver of the structural events produced by a parse.
///
/// Events arrive strictly nested: every `start_element` is matched by an
/// `end_element` with the same name, and `characters` only occurs between
/// them. Returning an error aborts the parse.
pub trait ContentHandler {
    /// Called once before the first element.
    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the last element of a successful parse.
    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_element(&mut self, name: &QName, attributes: &Attributes) -> Result<()>;

    fn characters(&mut self, text: &str) -> Result<()>;

    fn end_element(&mut self, name: &QName) -> Result<()>;
}

/// One recorded structural event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    StartDocument,
    EndDocument,
    StartElement { name: QName, attributes: Attributes },
    Characters(String),
    EndElement(QName),
}

/// Handler that records every event in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<Event>,
}

impl EventRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consume the recorder, returning its events
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Local names of all started elements, in document order.
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StartElement { name, .. } => Some(name.local.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenation of every `characters` event.
    #[must_use]
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Characters(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ContentHandler for EventRecorder {
    fn start_document(&mut self) -> Result<()> {
        self.events.push(Event::StartDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.events.push(Event::EndDocument);
        Ok(())
    }

    fn start_element(&mut self, name: &QName, attributes: &Attributes) -> Result<()> {
        self.events.push(Event::StartElement {
            name: name.clone(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Characters(text.to_string()));
        Ok(())
    }

    fn end_element(&mut self, name: &QName) -> Result<()> {
        self.events.push(Event::EndElement(name.clone()));
        Ok(())
    }
}
