//! Interchange envelope handling
//!
//! Each envelope segment code maps to a [`ControlBlock`]. The mapping and
//! the envelope segment definitions are built once per syntax version and
//! shared process-wide through [`ControlBlockHandlerFactory::for_version`].

use crate::charset::Charset;
use crate::interchange::{GroupState, InterchangeContext, MessageState};
use crate::parser::StructuralMatcher;
use crate::{Error, Result};
use edi_schema::{Component, DataType, Field, MaxOccurs, NamespaceBinding, Segment, ValueSpec};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

pub const NAMESPACE_PREFIX: &str = "c";

/// Local name of the element wrapping a whole interchange
pub const INTERCHANGE_ELEMENT: &str = "unEdifact";

/// UN/EDIFACT syntax version the envelope is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxVersion {
    V4,
    /// Version 4 release 1
    V41,
}

impl SyntaxVersion {
    /// Version selected by the UNB syntax identifier's version number and
    /// syntax release number
    #[must_use]
    pub fn detect(version: Option<&str>, release: Option<&str>) -> Self {
        match (version, release) {
            (Some("4"), Some("1")) => SyntaxVersion::V41,
            _ => SyntaxVersion::V4,
        }
    }

    #[must_use]
    pub fn namespace_uri(self) -> &'static str {
        match self {
            SyntaxVersion::V4 => "urn:un-edifact:interchange:v4",
            SyntaxVersion::V41 => "urn:un-edifact:interchange:v41",
        }
    }

    #[must_use]
    pub fn namespace(self) -> NamespaceBinding {
        NamespaceBinding::new(self.namespace_uri(), NAMESPACE_PREFIX)
    }
}

/// Envelope segment definitions of one syntax version
#[derive(Debug)]
pub struct ControlSegments {
    pub unb: Segment,
    pub ung: Segment,
    pub une: Segment,
    pub unh: Segment,
    pub unt: Segment,
    pub unz: Segment,
}

fn simple(xmltag: &str) -> Field {
    Field::new(xmltag)
}

fn mandatory(xmltag: &str) -> Field {
    Field::new(xmltag).required()
}

fn count(xmltag: &str) -> Field {
    Field::new(xmltag)
        .required()
        .with_value(ValueSpec::new(DataType::Integer))
}

fn composite(xmltag: &str, components: &[(&str, bool)]) -> Field {
    let components = components
        .iter()
        .map(|&(tag, required)| {
            let component = Component::new(tag);
            if required { component.required() } else { component }
        })
        .collect();
    Field::composite(xmltag, components).truncatable(true)
}

fn party(xmltag: &str) -> Field {
    composite(
        xmltag,
        &[("id", true), ("codeQualifier", false), ("internalId", false), ("internalSubId", false)],
    )
}

fn identification(xmltag: &str) -> Field {
    composite(
        xmltag,
        &[("id", true), ("versionNum", false), ("releaseNum", false), ("controllingAgencyCode", false)],
    )
}

fn control(segcode: &str, xmltag: &str, fields: Vec<Field>) -> Segment {
    Segment::new(segcode, xmltag)
        .occurs(1, MaxOccurs::Bounded(1))
        .truncatable(true)
        .with_fields(fields)
}

impl ControlSegments {
    fn new(version: SyntaxVersion) -> Self {
        let mut syntax_identifier = vec![
            ("id", true),
            ("versionNum", true),
            ("serviceCodeListDirVersion", false),
            ("codedCharacterEncoding", false),
        ];
        let mut message_identifier = vec![
            ("id", true),
            ("versionNum", true),
            ("releaseNum", true),
            ("controllingAgencyCode", true),
            ("associationAssignedCode", false),
            ("codeListDirVersionNum", false),
        ];
        if version == SyntaxVersion::V41 {
            syntax_identifier.push(("releaseNum", false));
            message_identifier.push(("typeSubFunctionId", false));
        }

        let unb = control(
            "UNB",
            "interchangeHeader",
            vec![
                composite("syntaxIdentifier", &syntax_identifier).required(),
                party("sender").required(),
                party("recipient").required(),
                composite("dateTime", &[("date", true), ("time", true)]).required(),
                mandatory("controlRef"),
                composite("recipientRef", &[("ref", true), ("refQualifier", false)]),
                simple("applicationRef"),
                simple("processingPriorityCode"),
                simple("ackRequest"),
                simple("agreementId"),
                simple("testIndicator"),
            ],
        );

        let ung = control(
            "UNG",
            "groupHeader",
            vec![
                simple("groupId"),
                composite("senderApp", &[("id", true), ("codeQualifier", false)]),
                composite("recipientApp", &[("id", true), ("codeQualifier", false)]),
                composite("dateTime", &[("date", true), ("time", true)]),
                mandatory("groupRef"),
                simple("controllingAgencyCode"),
                composite(
                    "messageVersion",
                    &[("versionNum", true), ("releaseNum", true), ("associationCode", false)],
                ),
                simple("applicationPassword"),
            ],
        );

        let une = control("UNE", "groupTrailer", vec![count("controlCount"), mandatory("groupRef")]);

        let unh = control(
            "UNH",
            "UNH",
            vec![
                mandatory("messageRefNum"),
                composite("messageIdentifier", &message_identifier).required(),
                simple("commonAccessRef"),
                composite("transferStatus", &[("sequence", true), ("firstAndLastTransfer", false)]),
                identification("messageSubsetId"),
                identification("messageImplementationGuidelineId"),
                identification("scenarioId"),
            ],
        );

        let unt = control("UNT", "UNT", vec![count("segmentCount"), mandatory("messageRefNum")]);

        let unz = control(
            "UNZ",
            "interchangeTrailer",
            vec![count("controlCount"), mandatory("controlRef")],
        );

        Self { unb, ung, une, unh, unt, unz }
    }
}

/// Handler for one envelope segment code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlBlock {
    Una,
    Unb,
    Ung,
    Une,
    Unh,
    Unt,
    Unz,
    /// Any other `U*` service segment, emitted as a flat element
    Generic,
}

impl ControlBlock {
    /// Process the buffered segment this block was selected for
    ///
    /// # Errors
    ///
    /// Returns an envelope error when the segment is out of place, and
    /// propagates mapping, registry and message parsing errors.
    pub fn process(self, ctx: &mut InterchangeContext<'_>) -> Result<()> {
        match self {
            ControlBlock::Una => una(ctx),
            ControlBlock::Unb => unb(ctx),
            ControlBlock::Ung => ung(ctx),
            ControlBlock::Une => une(ctx),
            ControlBlock::Unh => unh(ctx),
            ControlBlock::Unt => unt(ctx),
            ControlBlock::Unz => unz(ctx),
            ControlBlock::Generic => generic(ctx),
        }
    }
}

/// Dispatch table from segment code to control block for one syntax version
#[derive(Debug)]
pub struct ControlBlockHandlerFactory {
    version: SyntaxVersion,
    segments: ControlSegments,
    handlers: HashMap<&'static str, ControlBlock>,
}

static FACTORY_V4: LazyLock<ControlBlockHandlerFactory> =
    LazyLock::new(|| ControlBlockHandlerFactory::new(SyntaxVersion::V4));

static FACTORY_V41: LazyLock<ControlBlockHandlerFactory> =
    LazyLock::new(|| ControlBlockHandlerFactory::new(SyntaxVersion::V41));

impl ControlBlockHandlerFactory {
    fn new(version: SyntaxVersion) -> Self {
        debug!("Building control segment definitions for {:?}", version);
        let handlers = HashMap::from([
            ("UNA", ControlBlock::Una),
            ("UNB", ControlBlock::Unb),
            ("UNG", ControlBlock::Ung),
            ("UNE", ControlBlock::Une),
            ("UNH", ControlBlock::Unh),
            ("UNT", ControlBlock::Unt),
            ("UNZ", ControlBlock::Unz),
        ]);
        Self {
            version,
            segments: ControlSegments::new(version),
            handlers,
        }
    }

    #[must_use]
    pub fn for_version(version: SyntaxVersion) -> &'static Self {
        match version {
            SyntaxVersion::V4 => &FACTORY_V4,
            SyntaxVersion::V41 => &FACTORY_V41,
        }
    }

    #[must_use]
    pub fn version(&self) -> SyntaxVersion {
        self.version
    }

    #[must_use]
    pub fn segments(&self) -> &ControlSegments {
        &self.segments
    }

    /// Control block for a segment found between messages
    ///
    /// # Errors
    ///
    /// Returns an envelope error for codes that are not service segments.
    pub fn handler(&self, code: &str, segment_number: usize) -> Result<ControlBlock> {
        if let Some(block) = self.handlers.get(code) {
            return Ok(*block);
        }
        let service = code.len() == 3 && code.starts_with('U') && code.chars().all(|c| c.is_ascii_uppercase());
        if service {
            Ok(ControlBlock::Generic)
        } else {
            Err(Error::envelope(
                format!(
                    "Unexpected control segment [{code}] outside of a message. Currently at segment number {segment_number}."
                ),
                Some(segment_number),
            ))
        }
    }
}

fn una(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    if ctx.reader.has_pending() {
        let n = ctx.reader.segment_number();
        return Err(Error::envelope(
            format!("Service string advice (UNA) is only allowed at the start of the interchange. Currently at segment number {n}."),
            Some(n),
        ));
    }
    if let Some(delimiters) = ctx.reader.read_una()? {
        debug!("Interchange delimiters set by {}", delimiters.to_una());
        ctx.reader.push_delimiters(delimiters);
        ctx.una = true;
    }
    Ok(())
}

fn unb(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    if ctx.interchange_ref.is_some() {
        return Err(Error::envelope(
            format!("Unexpected second interchange header (UNB). Currently at segment number {n}."),
            Some(n),
        ));
    }

    let syntax_id = ctx.value(0, 0);
    let version = SyntaxVersion::detect(ctx.reader.value(0, 1), ctx.reader.value(0, 4));
    let control_ref = ctx.value(4, 0);

    if !syntax_id.is_empty() {
        let charset = Charset::for_syntax_identifier(&syntax_id).ok_or_else(|| {
            Error::UnsupportedCharset {
                code: syntax_id.clone(),
                segment_number: n,
            }
        })?;
        ctx.reader.set_charset(charset);
    }

    ctx.factory = ControlBlockHandlerFactory::for_version(version);
    ctx.namespace = version.namespace();
    ctx.root_pushed = ctx.emitter.push_namespace(Some(&ctx.namespace));
    ctx.emitter.start_element(INTERCHANGE_ELEMENT, Some(&ctx.namespace))?;
    ctx.interchange_ref = Some(control_ref.clone());

    let factory = ctx.factory;
    ctx.map_control(&factory.segments().unb)?;

    info!(
        "Interchange {} from {} to {} ({}, {:?})",
        control_ref,
        ctx.reader.value(1, 0).unwrap_or_default(),
        ctx.reader.value(2, 0).unwrap_or_default(),
        syntax_id,
        version
    );
    Ok(())
}

fn ung(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    ctx.require_interchange("UNG", n)?;
    if let Some(group) = &ctx.group {
        return Err(Error::envelope(
            format!(
                "Functional group [{}] is not closed before the next group header (UNG). Currently at segment number {n}.",
                group.reference
            ),
            Some(n),
        ));
    }

    let reference = ctx.value(4, 0);
    let namespace = ctx.namespace.clone();
    ctx.emitter.start_element("group", Some(&namespace))?;
    let factory = ctx.factory;
    ctx.map_control(&factory.segments().ung)?;

    debug!("Functional group {} opened", reference);
    ctx.group = Some(GroupState {
        reference,
        messages: 0,
    });
    ctx.groups += 1;
    Ok(())
}

fn une(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    let Some(group) = ctx.group.take() else {
        return Err(Error::envelope(
            format!("Group trailer (UNE) without a group header (UNG). Currently at segment number {n}."),
            Some(n),
        ));
    };

    let declared = ctx.value(0, 0);
    let reference = ctx.value(1, 0);
    let factory = ctx.factory;
    ctx.map_control(&factory.segments().une)?;

    ctx.check_count("UNE", &declared, group.messages, n)?;
    ctx.check_reference("UNE", &reference, &group.reference, n)?;
    ctx.emitter.end_element()
}

fn unh(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    ctx.require_interchange("UNH", n)?;

    let reference = ctx.value(0, 0);
    let lookup_name = (0..4)
        .map(|component| ctx.value(1, component))
        .collect::<Vec<_>>()
        .join(":");

    let namespace = ctx.namespace.clone();
    ctx.emitter.start_element("interchangeMessage", Some(&namespace))?;
    let factory = ctx.factory;
    ctx.map_control(&factory.segments().unh)?;

    let model = ctx.registry().resolve(&lookup_name, ctx.reader.delimiters())?;
    debug!(
        "Message {} at segment number {} mapped by {}",
        reference,
        n,
        model.description()
    );

    ctx.message = Some(MessageState {
        reference,
        first_segment: n,
    });
    ctx.messages += 1;
    if let Some(group) = ctx.group.as_mut() {
        group.messages += 1;
    }

    StructuralMatcher::new(&model, |code| code == "UNT")
        .validate(ctx.validate)
        .run(&mut ctx.reader, &mut ctx.emitter)
}

fn unt(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    let Some(message) = ctx.message.take() else {
        return Err(Error::envelope(
            format!("Message trailer (UNT) without a message header (UNH). Currently at segment number {n}."),
            Some(n),
        ));
    };

    let declared = ctx.value(0, 0);
    let reference = ctx.value(1, 0);
    let factory = ctx.factory;
    ctx.map_control(&factory.segments().unt)?;

    if reference != message.reference {
        return Err(Error::envelope(
            format!(
                "Message reference [{reference}] in UNT does not match [{}] in UNH. Currently at segment number {n}.",
                message.reference
            ),
            Some(n),
        ));
    }
    ctx.check_count("UNT", &declared, n - message.first_segment + 1, n)?;
    ctx.emitter.end_element()
}

fn unz(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    ctx.require_interchange("UNZ", n)?;
    if let Some(group) = &ctx.group {
        return Err(Error::envelope(
            format!(
                "Functional group [{}] is not closed before the interchange trailer (UNZ). Currently at segment number {n}.",
                group.reference
            ),
            Some(n),
        ));
    }

    let declared = ctx.value(0, 0);
    let reference = ctx.value(1, 0);
    let factory = ctx.factory;
    ctx.map_control(&factory.segments().unz)?;

    let expected = if ctx.groups > 0 { ctx.groups } else { ctx.messages };
    ctx.check_count("UNZ", &declared, expected, n)?;
    let interchange_ref = ctx.interchange_ref.clone().unwrap_or_default();
    ctx.check_reference("UNZ", &reference, &interchange_ref, n)?;

    ctx.close_interchange()?;
    info!("Interchange {} complete: {} message(s)", interchange_ref, ctx.messages);
    Ok(())
}

fn generic(ctx: &mut InterchangeContext<'_>) -> Result<()> {
    let n = ctx.take_segment()?;
    let code = ctx.reader.code().to_string();
    ctx.require_interchange(&code, n)?;

    debug!("Service segment [{}] at segment number {} emitted as is", code, n);
    let text = ctx.reader.raw_remainder().to_string();
    let namespace = ctx.namespace.clone();
    ctx.emitter.text_element(&code, Some(&namespace), &text)
}
