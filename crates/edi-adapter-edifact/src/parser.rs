//! Structural matching of segments against a mapping model
//!
//! [`StructuralMatcher`] walks the model's group tree by recursive
//! descent, pulling segments from the reader and emitting one element per
//! group and segment. [`EdiParser`] runs a matcher over a whole stream
//! without any interchange envelope.

use crate::config::ParserConfig;
use crate::emitter::ElementEmitter;
use crate::fields::{FieldMapper, SegmentKind};
use crate::reader::{Next, SegmentReader};
use crate::{Error, Result};
use edi_events::ContentHandler;
use edi_schema::{EdifactModel, NamespaceBinding, SegmentNode};
use std::io::{BufReader, Read};
use std::sync::Arc;
use tracing::{debug, trace};

/// Matches the segments of one message against an [`EdifactModel`]
///
/// `boundary` marks the code that ends the message (UNT inside an
/// interchange); that segment is left buffered for the caller.
pub struct StructuralMatcher<'m> {
    model: &'m EdifactModel,
    boundary: fn(&str) -> bool,
    validate: bool,
}

impl<'m> StructuralMatcher<'m> {
    #[must_use]
    pub fn new(model: &'m EdifactModel, boundary: fn(&str) -> bool) -> Self {
        Self {
            model,
            boundary,
            validate: true,
        }
    }

    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Match segments until the boundary or the end of input
    ///
    /// # Errors
    ///
    /// Returns a structure error for missing required or unexpected
    /// segments, and propagates field mapping and tokenizer errors.
    pub fn run(&self, reader: &mut SegmentReader<'_>, out: &mut ElementEmitter<'_>) -> Result<()> {
        let namespace = self.model.namespace();
        let pushed = out.push_namespace(namespace.as_ref());
        let root = self.model.root();

        out.start_element(&root.xmltag, namespace.as_ref())?;
        self.match_children(&root.children, None, reader, out, namespace.as_ref())?;

        if let Some(code) = self.next_code(reader, None)? {
            let n = reader.segment_number();
            return Err(Error::structure(
                format!(
                    "Segment [{code}] is not expected at this position (unmapped segment). Currently at segment number {n}. Mapping model: {}",
                    self.model.description()
                ),
                n,
            ));
        }

        out.end_element()?;
        out.pop_namespace(pushed);
        Ok(())
    }

    /// Code of the next segment inside the message. When the model ignores
    /// unmapped segments, segments that `position` cannot match are skipped.
    fn next_code(
        &self,
        reader: &mut SegmentReader<'_>,
        position: Option<&Position<'_>>,
    ) -> Result<Option<String>> {
        loop {
            let Some(code) = reader.peek_code()? else {
                return Ok(None);
            };
            if (self.boundary)(&code) {
                return Ok(None);
            }
            if self.model.ignore_unmapped_segments() && !position.is_some_and(|p| p.expects(&code)) {
                debug!(
                    "Skipping segment [{}] at segment number {}, nothing matches it here",
                    code,
                    reader.segment_number()
                );
                reader.consume();
                continue;
            }
            return Ok(Some(code));
        }
    }

    fn missing(&self, node: &SegmentNode, occurrences: u32, n: usize) -> Error {
        trace!("{} occurrence(s) of [{}] before segment {}", occurrences, node.xmltag(), n);
        Error::structure(
            format!(
                "Must be a minimum of {} instance(s) of segment [{}] ({}). Currently at segment number {n}. Mapping model: {}",
                node.min_occurs(),
                node.segcode().unwrap_or_default(),
                node.xmltag(),
                self.model.description()
            ),
            n,
        )
    }

    fn match_children(
        &self,
        children: &[SegmentNode],
        outer: Option<&Position<'_>>,
        reader: &mut SegmentReader<'_>,
        out: &mut ElementEmitter<'_>,
        namespace: Option<&NamespaceBinding>,
    ) -> Result<()> {
        let mut index = 0;
        let mut occurrences = 0u32;

        while index < children.len() {
            let position = Position {
                children,
                index,
                occurrences,
                outer,
            };
            let Some(code) = self.next_code(reader, Some(&position))? else {
                break;
            };
            let child = &children[index];

            if child.segcode() == Some(code.as_str()) {
                if child.max_occurs().allows(occurrences) {
                    occurrences += 1;
                    let position = Position {
                        occurrences,
                        ..position
                    };
                    self.match_node(child, &position, reader, out, namespace)?;
                    continue;
                }
            } else if occurrences < child.min_occurs() {
                return Err(self.missing(child, occurrences, reader.segment_number()));
            }

            index += 1;
            occurrences = 0;
        }

        // input ended or reached the boundary
        for child in children.iter().skip(index) {
            if occurrences < child.min_occurs() {
                return Err(self.missing(child, occurrences, reader.segment_number()));
            }
            occurrences = 0;
        }
        Ok(())
    }

    fn match_node(
        &self,
        node: &SegmentNode,
        position: &Position<'_>,
        reader: &mut SegmentReader<'_>,
        out: &mut ElementEmitter<'_>,
        parent: Option<&NamespaceBinding>,
    ) -> Result<()> {
        let namespace = node.namespace().or(parent);
        let pushed = out.push_namespace(node.namespace());

        match node {
            SegmentNode::Group(group) => {
                out.start_element(&group.xmltag, namespace)?;
                self.match_children(&group.children, Some(position), reader, out, namespace)?;
            }
            SegmentNode::Segment(segment) => {
                if reader.next_segment(self.boundary)? != Next::Segment {
                    return Err(Error::structure(
                        format!("Expected segment [{}] is no longer available", segment.segcode),
                        reader.segment_number(),
                    ));
                }
                let n = reader.segment_number();
                trace!("Segment {} [{}] mapped to {}", n, segment.segcode, segment.xmltag);

                out.start_element(&segment.xmltag, namespace)?;
                FieldMapper::new(segment, SegmentKind::Data, n)
                    .validate(self.validate)
                    .decimal(reader.delimiters().decimal)
                    .map(reader.fields(), out, namespace)?;
                self.match_children(&segment.children, Some(position), reader, out, namespace)?;
            }
        }

        out.end_element()?;
        out.pop_namespace(pushed);
        Ok(())
    }
}

/// Where matching stands within one list of sibling nodes, chained to the
/// positions of the enclosing groups and segments
#[derive(Clone, Copy)]
struct Position<'a> {
    children: &'a [SegmentNode],
    index: usize,
    /// Matches of `children[index]` so far
    occurrences: u32,
    outer: Option<&'a Position<'a>>,
}

impl Position<'_> {
    /// Whether a segment with `code` can still match here: another
    /// occurrence of the current child, a later sibling, or the same at an
    /// enclosing level
    fn expects(&self, code: &str) -> bool {
        let repeats = self.children.get(self.index).is_some_and(|child| {
            child.segcode() == Some(code) && child.max_occurs().allows(self.occurrences)
        });
        repeats
            || self
                .children
                .iter()
                .skip(self.index + 1)
                .any(|child| child.segcode() == Some(code))
            || self.outer.is_some_and(|outer| outer.expects(code))
    }
}

/// Parser for EDI streams without an interchange envelope
///
/// The whole stream is one message matched against a single model, using
/// the model's own delimiters when it declares them.
#[derive(Debug, Clone)]
pub struct EdiParser {
    model: Arc<EdifactModel>,
    config: ParserConfig,
}

impl EdiParser {
    #[must_use]
    pub fn new(model: Arc<EdifactModel>) -> Self {
        Self {
            model,
            config: ParserConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse `input` against the model, reporting it to `handler`
    ///
    /// # Errors
    ///
    /// Returns the first tokenizer, structure, validation or handler error.
    pub fn parse<'i>(&self, input: impl Read + 'i, handler: &'i mut dyn ContentHandler) -> Result<()> {
        let mut reader = SegmentReader::new(BufReader::new(input), &self.config);
        if let Some(delimiters) = self.model.delimiters() {
            reader.push_delimiters(*delimiters);
        }

        let mut out = ElementEmitter::new(handler);
        out.handler().start_document()?;
        debug!("Parsing against {}", self.model.description());
        StructuralMatcher::new(&self.model, |_| false)
            .validate(self.config.validate)
            .run(&mut reader, &mut out)?;
        out.handler().end_document()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_events::{Cursor, TreeBuilder};
    use edi_schema::{Delimiters, Description, Edimap, Field, MaxOccurs, Segment, SegmentGroup};

    fn orders() -> Edimap {
        let line = SegmentGroup::new("LineItem")
            .occurs(0, MaxOccurs::Unbounded)
            .with_children(vec![
                Segment::new("LIN", "Line")
                    .occurs(1, MaxOccurs::Bounded(1))
                    .with_fields(vec![Field::new("number")])
                    .into(),
                Segment::new("QTY", "Quantity")
                    .with_fields(vec![Field::new("amount")])
                    .into(),
            ]);
        Edimap::new(
            Description::new("ORDERS", "D:96A:UN"),
            SegmentGroup::new("Order").with_children(vec![
                Segment::new("BGM", "Header")
                    .occurs(1, MaxOccurs::Bounded(1))
                    .with_fields(vec![Field::new("name"), Field::new("number")])
                    .into(),
                Segment::new("DTM", "DateTime")
                    .occurs(0, MaxOccurs::Bounded(2))
                    .with_fields(vec![Field::new("date")])
                    .into(),
                line.into(),
            ]),
        )
    }

    fn parse(edimap: Edimap, input: &str) -> Result<TreeBuilder> {
        let mut tree = TreeBuilder::new();
        EdiParser::new(Arc::new(EdifactModel::new(edimap))).parse(input.as_bytes(), &mut tree)?;
        Ok(tree)
    }

    #[test]
    fn test_repeating_groups() {
        let tree = parse(orders(), "BGM+220+PO1'DTM+1'LIN+1'QTY+5'LIN+2'LIN+3'QTY+7'").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.local_name(), "Order");

        let cursor = Cursor::new(root);
        assert_eq!(cursor.text_at("Header/number").unwrap(), "PO1");
        assert_eq!(cursor.children("LineItem").len(), 3);
        assert_eq!(cursor.text_at("LineItem[2]/Quantity/amount").unwrap(), "7");
        assert!(cursor.navigate("LineItem[1]/Quantity").is_err());
    }

    #[test]
    fn test_missing_required_segment() {
        match parse(orders(), "DTM+1'LIN+1'") {
            Err(Error::Structure { message, segment_number }) => {
                assert!(message.contains("segment [BGM] (Header)"), "{message}");
                assert!(message.contains("ORDERS (version D:96A:UN)"), "{message}");
                assert_eq!(segment_number, 1);
            }
            other => panic!("Expected Structure error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_required_segment_at_end_of_input() {
        let err = parse(orders(), "").err().unwrap();
        assert!(err.to_string().contains("segment [BGM]"), "{err}");
    }

    #[test]
    fn test_too_many_occurrences() {
        let err = parse(orders(), "BGM+220+PO1'DTM+1'DTM+2'DTM+3'").err().unwrap();
        assert!(err.to_string().contains("Segment [DTM] is not expected"), "{err}");
        assert_eq!(err.segment_number(), Some(4));
    }

    #[test]
    fn test_unmapped_segment() {
        let err = parse(orders(), "BGM+220+PO1'FTX+note'").err().unwrap();
        assert!(err.to_string().contains("Segment [FTX]"), "{err}");
    }

    #[test]
    fn test_ignore_unmapped_segments() {
        let edimap = orders().ignore_unmapped_segments(true);
        let tree = parse(edimap, "FTX+a'BGM+220+PO1'FTX+b'LIN+1'NAD+x'QTY+5'FTX+c'").unwrap();
        let cursor = Cursor::new(tree.root().unwrap());
        assert_eq!(cursor.text_at("LineItem/Quantity/amount").unwrap(), "5");
    }

    #[test]
    fn test_ignore_mapped_segment_that_no_longer_fits() {
        let edimap = orders().ignore_unmapped_segments(true);
        let tree = parse(edimap, "BGM+220+PO1'LIN+1'DTM+1'QTY+5'LIN+2'").unwrap();
        let cursor = Cursor::new(tree.root().unwrap());
        assert!(cursor.navigate("DateTime").is_err());
        assert_eq!(cursor.children("LineItem").len(), 2);
        assert_eq!(cursor.text_at("LineItem[0]/Quantity/amount").unwrap(), "5");

        let edimap = orders().ignore_unmapped_segments(true);
        let tree = parse(edimap, "BGM+220+PO1'DTM+1'DTM+2'DTM+3'BGM+220+PO2'").unwrap();
        let cursor = Cursor::new(tree.root().unwrap());
        assert_eq!(cursor.children("DateTime").len(), 2);
        assert_eq!(cursor.text_at("DateTime[1]/date").unwrap(), "2");
        assert_eq!(cursor.children("Header").len(), 1);
    }

    #[test]
    fn test_nested_segments() {
        let edimap = Edimap::new(
            Description::new("NESTED", ""),
            SegmentGroup::new("Doc").with_children(vec![Segment::new("NAD", "Party")
                .occurs(1, MaxOccurs::Unbounded)
                .with_fields(vec![Field::new("code")])
                .with_children(vec![Segment::new("CTA", "Contact")
                    .with_fields(vec![Field::new("name")])
                    .into()])
                .into()]),
        );
        let tree = parse(edimap, "NAD+BY'CTA+Alice'NAD+SU'").unwrap();
        let cursor = Cursor::new(tree.root().unwrap());
        assert_eq!(cursor.text_at("Party[0]/Contact/name").unwrap(), "Alice");
        assert!(cursor.navigate("Party[1]/Contact").is_err());
    }

    #[test]
    fn test_model_delimiters_and_namespace() {
        let delimiters = Delimiters {
            segment: '~',
            field: '*',
            ..Delimiters::default()
        };
        let mut edimap = orders().with_delimiters(delimiters);
        edimap.description = edimap.description.with_namespace("urn:orders", "ord");

        let tree = parse(edimap, "BGM*220*PO1~").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.name.prefixed(), "ord:Order");
        assert_eq!(root.attributes.get("xmlns:ord"), Some("urn:orders"));
        assert_eq!(root.children[0].name.prefixed(), "ord:Header");
    }
}
