//! Mapping of a tokenized segment onto its field definitions
//!
//! Each field, component and sub-component present in the data becomes
//! one element named after its definition, with the value as text.
//! Trailing positions may be absent when the enclosing definition is
//! truncatable; a required position that is absent otherwise is an error.

use crate::emitter::ElementEmitter;
use crate::{Error, FieldPosition, Result};
use edi_schema::{Component, Field, NamespaceBinding, Segment, SubComponent, ValueSpec};
use edi_validation::validate_value;
use tracing::trace;

/// Whether a segment belongs to the interchange envelope or to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Envelope segments: required values must always be present
    Control,
    Data,
}

pub struct FieldMapper<'m> {
    segment: &'m Segment,
    kind: SegmentKind,
    validate: bool,
    decimal: char,
    segment_number: usize,
}

fn is_blank(values: &[String]) -> bool {
    values.iter().all(String::is_empty)
}

impl<'m> FieldMapper<'m> {
    #[must_use]
    pub fn new(segment: &'m Segment, kind: SegmentKind, segment_number: usize) -> Self {
        Self {
            segment,
            kind,
            validate: true,
            decimal: '.',
            segment_number,
        }
    }

    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub fn decimal(mut self, decimal: char) -> Self {
        self.decimal = decimal;
        self
    }

    fn error(&self, message: String) -> Error {
        match self.kind {
            SegmentKind::Control => Error::envelope(message, Some(self.segment_number)),
            SegmentKind::Data => Error::structure(message, self.segment_number),
        }
    }

    fn missing(&self, path: &str, index: &str) -> Error {
        self.error(format!(
            "Segment [{}], {path} (index {index}) is mandatory but missing. Currently at segment number {}.",
            self.segment.segcode, self.segment_number
        ))
    }

    fn too_many(&self, what: &str, found: usize, defined: usize, path: &str) -> Error {
        self.error(format!(
            "Segment [{}]{path} has {found} {what} but the mapping model defines {defined}. Currently at segment number {}.",
            self.segment.segcode, self.segment_number
        ))
    }

    /// A missing position is an error when required, unless the enclosing
    /// data definition lets trailing positions be truncated
    fn check_absent(&self, required: bool, truncatable: bool, path: &str, index: &str) -> Result<()> {
        let tolerated = match self.kind {
            SegmentKind::Control => false,
            SegmentKind::Data => truncatable,
        };
        if required && !tolerated {
            Err(self.missing(path, index))
        } else {
            Ok(())
        }
    }

    /// Map the fields of the current segment (code excluded)
    ///
    /// # Errors
    ///
    /// Returns an error for surplus values, missing required values, or
    /// values failing validation.
    pub fn map(
        &self,
        fields: &[Vec<Vec<String>>],
        out: &mut ElementEmitter<'_>,
        namespace: Option<&NamespaceBinding>,
    ) -> Result<()> {
        let defined = self.segment.fields.len();
        if fields.len() > defined && fields[defined..].iter().any(|f| f.iter().any(|c| !is_blank(c))) {
            return Err(self.too_many("fields", fields.len(), defined, ""));
        }

        for (i, definition) in self.segment.fields.iter().enumerate() {
            let path = format!("field [{}]", definition.xmltag);
            match fields.get(i) {
                Some(field) => self.map_field(i + 1, definition, field, out, namespace)?,
                None => self.check_absent(
                    definition.required,
                    self.segment.truncatable,
                    &path,
                    &(i + 1).to_string(),
                )?,
            }
        }
        Ok(())
    }

    fn map_field(
        &self,
        index: usize,
        definition: &Field,
        field: &[Vec<String>],
        out: &mut ElementEmitter<'_>,
        namespace: Option<&NamespaceBinding>,
    ) -> Result<()> {
        let path = format!("field [{}]", definition.xmltag);
        let position = FieldPosition::field(index);

        if definition.is_scalar() {
            if field.len() > 1 && field[1..].iter().any(|c| !is_blank(c)) {
                return Err(self.too_many("components in a simple field", field.len(), 1, &format!(", {path}")));
            }
            let value = field.first().map_or(&[][..], Vec::as_slice);
            let text = value.first().map_or("", String::as_str);
            if value.len() > 1 && !is_blank(&value[1..]) {
                return Err(self.too_many("sub-components in a simple field", value.len(), 1, &format!(", {path}")));
            }
            self.check_value(text, definition.value.as_ref(), definition.required, position, &path, &index.to_string())?;
            return out.text_element(&definition.xmltag, namespace, text);
        }

        let blank = field.iter().all(|c| is_blank(c));
        if blank && definition.required {
            self.check_value("", None, true, position, &path, &index.to_string())?;
        }

        let defined = definition.components.len();
        if field.len() > defined && field[defined..].iter().any(|c| !is_blank(c)) {
            return Err(self.too_many("components", field.len(), defined, &format!(", {path}")));
        }

        out.start_element(&definition.xmltag, namespace)?;
        for (j, component) in definition.components.iter().enumerate() {
            let path = format!("{path}, component [{}]", component.xmltag);
            let index = format!("{index}.{}", j + 1);
            match field.get(j) {
                Some(values) => {
                    self.map_component(position.component(j + 1), component, values, out, namespace, &path, &index)?;
                }
                None => {
                    // a wholly empty field is reported once, above
                    let required = component.required && !blank;
                    self.check_absent(required, definition.truncatable, &path, &index)?;
                }
            }
        }
        out.end_element()
    }

    #[allow(clippy::too_many_arguments)]
    fn map_component(
        &self,
        position: FieldPosition,
        definition: &Component,
        values: &[String],
        out: &mut ElementEmitter<'_>,
        namespace: Option<&NamespaceBinding>,
        path: &str,
        index: &str,
    ) -> Result<()> {
        if definition.sub_components.is_empty() {
            if values.len() > 1 && !is_blank(&values[1..]) {
                return Err(self.too_many("sub-components in a simple component", values.len(), 1, &format!(", {path}")));
            }
            let text = values.first().map_or("", String::as_str);
            self.check_value(text, definition.value.as_ref(), definition.required, position, path, index)?;
            return out.text_element(&definition.xmltag, namespace, text);
        }

        let defined = definition.sub_components.len();
        if values.len() > defined && !is_blank(&values[defined..]) {
            return Err(self.too_many("sub-components", values.len(), defined, &format!(", {path}")));
        }

        out.start_element(&definition.xmltag, namespace)?;
        for (k, sub) in definition.sub_components.iter().enumerate() {
            let path = format!("{path}, sub-component [{}]", sub.xmltag);
            let index = format!("{index}.{}", k + 1);
            match values.get(k) {
                Some(text) => self.map_sub_component(position.sub_component(k + 1), sub, text, out, namespace, &path, &index)?,
                None => self.check_absent(sub.required, definition.truncatable, &path, &index)?,
            }
        }
        out.end_element()
    }

    #[allow(clippy::too_many_arguments)]
    fn map_sub_component(
        &self,
        position: FieldPosition,
        definition: &SubComponent,
        text: &str,
        out: &mut ElementEmitter<'_>,
        namespace: Option<&NamespaceBinding>,
        path: &str,
        index: &str,
    ) -> Result<()> {
        self.check_value(text, definition.value.as_ref(), definition.required, position, path, index)?;
        out.text_element(&definition.xmltag, namespace, text)
    }

    fn check_value(
        &self,
        text: &str,
        spec: Option<&ValueSpec>,
        required: bool,
        position: FieldPosition,
        path: &str,
        index: &str,
    ) -> Result<()> {
        if text.is_empty() {
            if !required {
                return Ok(());
            }
            return match self.kind {
                SegmentKind::Control => Err(self.missing(path, index)),
                SegmentKind::Data if self.validate => Err(Error::Validation {
                    segment: self.segment.segcode.clone(),
                    position,
                    expected: spec.map_or_else(|| "a value".to_string(), ValueSpec::expected),
                    value: String::new(),
                    reason: "mandatory value is empty".to_string(),
                    segment_number: self.segment_number,
                }),
                SegmentKind::Data => Ok(()),
            };
        }

        let Some(spec) = spec.filter(|_| self.validate) else {
            return Ok(());
        };
        let result = validate_value(text, spec, self.decimal);
        if result.is_valid {
            return Ok(());
        }
        trace!("Segment {} {} rejected '{}'", self.segment.segcode, position, text);
        Err(Error::Validation {
            segment: self.segment.segcode.clone(),
            position,
            expected: spec.expected(),
            value: text.to_string(),
            reason: result.message.unwrap_or_default(),
            segment_number: self.segment_number,
        })
    }
}
