//! Interchange parsing
//!
//! [`InterchangeParser`] is the entry point for UN/EDIFACT input. Each
//! call to [`InterchangeParser::parse`] creates one [`InterchangeContext`]
//! that owns the tokenizer, the emitter and the envelope state for the
//! length of that call.

use crate::config::ParserConfig;
use crate::control::{ControlBlock, ControlBlockHandlerFactory, INTERCHANGE_ELEMENT, SyntaxVersion};
use crate::emitter::ElementEmitter;
use crate::fields::{FieldMapper, SegmentKind};
use crate::reader::{Next, SegmentReader};
use crate::{Error, Result};
use edi_events::ContentHandler;
use edi_schema::{MappingsRegistry, NamespaceBinding, Segment};
use std::io::{BufReader, Read};
use std::sync::Arc;
use tracing::{debug, warn};

/// An open functional group (UNG seen, UNE not yet)
#[derive(Debug)]
pub(crate) struct GroupState {
    pub(crate) reference: String,
    pub(crate) messages: usize,
}

/// An open message (UNH seen, UNT not yet)
#[derive(Debug)]
pub(crate) struct MessageState {
    pub(crate) reference: String,
    pub(crate) first_segment: usize,
}

/// Per-parse state shared by the control block handlers
pub struct InterchangeContext<'a> {
    pub(crate) reader: SegmentReader<'a>,
    pub(crate) emitter: ElementEmitter<'a>,
    registry: Arc<MappingsRegistry>,
    pub(crate) validate: bool,
    pub(crate) factory: &'static ControlBlockHandlerFactory,
    /// Binding of the envelope elements
    pub(crate) namespace: NamespaceBinding,
    pub(crate) root_pushed: bool,
    /// Delimiters were pushed by a UNA
    pub(crate) una: bool,
    /// UNB control reference, set once the interchange has started
    pub(crate) interchange_ref: Option<String>,
    pub(crate) group: Option<GroupState>,
    pub(crate) message: Option<MessageState>,
    pub(crate) messages: usize,
    pub(crate) groups: usize,
    finished: bool,
}

impl<'a> InterchangeContext<'a> {
    pub fn new(
        reader: SegmentReader<'a>,
        emitter: ElementEmitter<'a>,
        registry: Arc<MappingsRegistry>,
        validate: bool,
    ) -> Self {
        let factory = ControlBlockHandlerFactory::for_version(SyntaxVersion::V4);
        Self {
            reader,
            emitter,
            registry,
            validate,
            factory,
            namespace: factory.version().namespace(),
            root_pushed: false,
            una: false,
            interchange_ref: None,
            group: None,
            message: None,
            messages: 0,
            groups: 0,
            finished: false,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &MappingsRegistry {
        &self.registry
    }

    #[must_use]
    pub fn version(&self) -> SyntaxVersion {
        self.factory.version()
    }

    /// Number of messages seen so far
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drive the control block handlers until the interchange trailer or
    /// the end of input
    ///
    /// # Errors
    ///
    /// Returns the first error raised while processing the interchange.
    pub fn run(&mut self) -> Result<()> {
        ControlBlock::Una.process(self)?;

        while !self.finished {
            let Some(code) = self.reader.peek_code()? else {
                return self.end_of_stream();
            };
            let n = self.reader.segment_number();
            let block = self.factory.handler(&code, n)?;
            debug!("Segment {} [{}] handled by {:?}", n, code, block);
            block.process(self)?;
        }
        self.after_trailer()
    }

    /// Only blank input may follow the interchange trailer
    fn after_trailer(&mut self) -> Result<()> {
        while let Some(code) = self.reader.peek_code()? {
            if self.reader.is_blank() {
                self.reader.consume();
                continue;
            }
            let n = self.reader.segment_number();
            return Err(Error::envelope(
                format!(
                    "Segment [{code}] found after the interchange trailer (UNZ). Currently at segment number {n}."
                ),
                Some(n),
            ));
        }
        Ok(())
    }

    /// Make the buffered segment current, returning its segment number
    pub(crate) fn take_segment(&mut self) -> Result<usize> {
        match self.reader.next_segment(|_| false)? {
            Next::Segment => Ok(self.reader.segment_number()),
            Next::Stopped | Next::EndOfStream => Err(Error::envelope(
                "Unexpected end of input while reading an envelope segment",
                None,
            )),
        }
    }

    /// Owned copy of a value of the current segment, empty when absent
    pub(crate) fn value(&self, field: usize, component: usize) -> String {
        self.reader
            .value(field, component)
            .unwrap_or_default()
            .to_string()
    }

    pub(crate) fn require_interchange(&self, code: &str, n: usize) -> Result<()> {
        if self.interchange_ref.is_some() {
            Ok(())
        } else {
            Err(Error::envelope(
                format!(
                    "Segment [{code}] found before the interchange header (UNB). Currently at segment number {n}."
                ),
                Some(n),
            ))
        }
    }

    /// Emit the current segment as an envelope element
    pub(crate) fn map_control(&mut self, segment: &Segment) -> Result<()> {
        let n = self.reader.segment_number();
        self.emitter.start_element(&segment.xmltag, Some(&self.namespace))?;
        FieldMapper::new(segment, SegmentKind::Control, n)
            .validate(self.validate)
            .decimal(self.reader.delimiters().decimal)
            .map(self.reader.fields(), &mut self.emitter, Some(&self.namespace))?;
        self.emitter.end_element()
    }

    fn integrity_failure(&self, message: String, n: usize) -> Result<()> {
        if self.validate {
            Err(Error::envelope(message, Some(n)))
        } else {
            warn!("{}", message);
            Ok(())
        }
    }

    pub(crate) fn check_count(&self, code: &str, declared: &str, actual: usize, n: usize) -> Result<()> {
        if declared.parse::<usize>().ok() == Some(actual) {
            return Ok(());
        }
        self.integrity_failure(
            format!(
                "Control count in [{code}] is '{declared}' but {actual} were found. Currently at segment number {n}."
            ),
            n,
        )
    }

    pub(crate) fn check_reference(&self, code: &str, declared: &str, expected: &str, n: usize) -> Result<()> {
        if declared == expected {
            return Ok(());
        }
        self.integrity_failure(
            format!(
                "Control reference [{declared}] in [{code}] does not match header reference [{expected}]. Currently at segment number {n}."
            ),
            n,
        )
    }

    /// End the interchange element and restore the delimiters in force
    /// before it
    pub(crate) fn close_interchange(&mut self) -> Result<()> {
        self.emitter.end_element()?;
        self.emitter.pop_namespace(self.root_pushed);
        self.root_pushed = false;
        if self.una {
            self.reader.pop_delimiters();
            self.una = false;
        }
        self.finished = true;
        Ok(())
    }

    fn end_of_stream(&mut self) -> Result<()> {
        let n = self.reader.segment_number();
        if let Some(message) = &self.message {
            return Err(Error::envelope(
                format!(
                    "Unexpected end of input inside message [{}]. Currently at segment number {n}.",
                    message.reference
                ),
                Some(n),
            ));
        }
        if let Some(group) = &self.group {
            return Err(Error::envelope(
                format!(
                    "Unexpected end of input inside functional group [{}]. Currently at segment number {n}.",
                    group.reference
                ),
                Some(n),
            ));
        }
        let Some(reference) = self.interchange_ref.clone() else {
            return Err(Error::envelope("No interchange header (UNB) found in input", None));
        };

        warn!(
            "Interchange {} has no trailer (UNZ); closing {} at segment number {}",
            reference, INTERCHANGE_ELEMENT, n
        );
        self.close_interchange()
    }
}

/// Parser for complete UN/EDIFACT interchanges
///
/// The registry is shared; one parser can be used for any number of
/// parses, on any number of threads.
#[derive(Debug, Clone)]
pub struct InterchangeParser {
    registry: Arc<MappingsRegistry>,
    config: ParserConfig,
}

impl InterchangeParser {
    #[must_use]
    pub fn new(registry: Arc<MappingsRegistry>) -> Self {
        Self {
            registry,
            config: ParserConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one interchange from `input`, reporting it to `handler`
    ///
    /// # Errors
    ///
    /// Returns the first tokenizer, envelope, registry, structure,
    /// validation or handler error encountered.
    pub fn parse<'i>(&self, input: impl Read + 'i, handler: &'i mut dyn ContentHandler) -> Result<()> {
        let reader = SegmentReader::new(BufReader::new(input), &self.config);
        let mut emitter = ElementEmitter::new(handler);
        emitter.handler().start_document()?;

        let mut ctx = InterchangeContext::new(reader, emitter, Arc::clone(&self.registry), self.config.validate);
        ctx.run()?;

        ctx.emitter.handler().end_document()?;
        Ok(())
    }
}
