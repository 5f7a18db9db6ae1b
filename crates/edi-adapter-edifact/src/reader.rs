//! Segment tokenizer
//!
//! [`SegmentReader`] pulls characters from the input through the active
//! [`Charset`] and splits them into segments using the delimiter set on
//! top of its delimiter stack. One segment is buffered at a time: a
//! caller can look at the next segment's code, decide to stop before it,
//! and leave it in place for whoever reads next.

use crate::charset::Charset;
use crate::config::ParserConfig;
use crate::{Error, Result};
use edi_schema::Delimiters;
use std::collections::VecDeque;
use std::io::BufRead;
use tracing::trace;

/// Tokenized fields of one segment: field, then component, then sub-component
pub type SegmentFields = Vec<Vec<Vec<String>>>;

/// Outcome of [`SegmentReader::next_segment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// A segment was read and is now the current segment
    Segment,
    /// The next segment matched the stop predicate and is still buffered
    Stopped,
    EndOfStream,
}

pub struct SegmentReader<'a> {
    input: Box<dyn BufRead + 'a>,
    charset: Charset,
    pushback: VecDeque<char>,
    /// Never empty; the last entry is the active set
    delimiters: Vec<Delimiters>,
    ignore_new_lines: bool,
    max_segment_length: usize,
    /// Includes the segment code at index 0
    fields: SegmentFields,
    raw: String,
    /// The buffered segment has been read but not yet consumed
    pending: bool,
    segment_number: usize,
    at_start: bool,
}

impl<'a> SegmentReader<'a> {
    pub fn new(input: impl BufRead + 'a, config: &ParserConfig) -> Self {
        Self {
            input: Box::new(input),
            charset: config.default_encoding,
            pushback: VecDeque::new(),
            delimiters: vec![config.delimiters],
            ignore_new_lines: config.ignore_new_lines,
            max_segment_length: config.max_segment_length,
            fields: Vec::new(),
            raw: String::new(),
            pending: false,
            segment_number: 0,
            at_start: true,
        }
    }

    /// The delimiter set currently used for tokenizing
    #[must_use]
    pub fn delimiters(&self) -> &Delimiters {
        // the stack is created with one entry and pop keeps it
        &self.delimiters[self.delimiters.len() - 1]
    }

    pub fn push_delimiters(&mut self, delimiters: Delimiters) {
        trace!("Pushing delimiters {:?}", delimiters);
        self.delimiters.push(delimiters);
    }

    /// Restore the previous delimiter set. The base set is never removed.
    pub fn pop_delimiters(&mut self) -> Option<Delimiters> {
        if self.delimiters.len() > 1 {
            self.delimiters.pop()
        } else {
            None
        }
    }

    /// Switch the byte decoder for everything not yet read
    pub fn set_charset(&mut self, charset: Charset) {
        self.charset = charset;
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// 1-based number of the current (or buffered) segment; UNA is not counted
    #[must_use]
    pub fn segment_number(&self) -> usize {
        self.segment_number
    }

    /// Code of the current segment
    #[must_use]
    pub fn code(&self) -> &str {
        self.fields
            .first()
            .and_then(|f| f.first())
            .and_then(|c| c.first())
            .map_or("", String::as_str)
    }

    /// Fields of the current segment, excluding the code
    #[must_use]
    pub fn fields(&self) -> &[Vec<Vec<String>>] {
        self.fields.get(1..).unwrap_or_default()
    }

    /// First sub-component of a component of the current segment, with
    /// `field` counted from 0 after the code
    #[must_use]
    pub fn value(&self, field: usize, component: usize) -> Option<&str> {
        self.fields()
            .get(field)?
            .get(component)?
            .first()
            .map(String::as_str)
    }

    /// Raw text of the current segment after its code and field separator,
    /// with release characters left in place
    #[must_use]
    pub fn raw_remainder(&self) -> &str {
        let rest = self.raw.strip_prefix(self.code()).unwrap_or(&self.raw);
        rest.strip_prefix(self.delimiters().field).unwrap_or(rest)
    }

    /// Read a UNA service string advice if the stream starts with one.
    ///
    /// Only meaningful before the first segment; later calls return `None`.
    ///
    /// # Errors
    ///
    /// Returns a tokenizer error if the stream ends inside the advice.
    pub fn read_una(&mut self) -> Result<Option<Delimiters>> {
        if !self.at_start {
            return Ok(None);
        }
        self.at_start = false;

        let mut prefix = String::new();
        while prefix.len() < 3 {
            match self.next_char()? {
                Some(c) => prefix.push(c),
                None => break,
            }
        }
        if prefix != "UNA" {
            self.pushback.extend(prefix.chars());
            return Ok(None);
        }

        let mut chars = [' '; 6];
        for slot in &mut chars {
            *slot = self.next_char()?.ok_or_else(|| {
                Error::tokenize("Service string advice (UNA) is truncated", 0)
            })?;
        }
        if let Some(c) = repeated_service_char(&chars) {
            return Err(Error::tokenize(
                format!("Service string advice (UNA) uses '{c}' for more than one service character"),
                0,
            ));
        }
        let delimiters = Delimiters::from_una(chars);
        trace!("Read {}", delimiters.to_una());
        Ok(Some(delimiters))
    }

    /// Code of the next segment without consuming it, `None` at end of stream
    ///
    /// # Errors
    ///
    /// Returns a tokenizer error if the segment cannot be read.
    pub fn peek_code(&mut self) -> Result<Option<String>> {
        if self.fill()? {
            Ok(Some(self.code().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Make the next segment current unless `stop` accepts its code, in
    /// which case it stays buffered for the next reader.
    ///
    /// # Errors
    ///
    /// Returns a tokenizer error if the segment cannot be read.
    pub fn next_segment(&mut self, stop: impl Fn(&str) -> bool) -> Result<Next> {
        if !self.fill()? {
            return Ok(Next::EndOfStream);
        }
        if stop(self.code()) {
            return Ok(Next::Stopped);
        }
        self.pending = false;
        Ok(Next::Segment)
    }

    /// Mark the buffered segment as consumed
    pub fn consume(&mut self) {
        self.pending = false;
    }

    /// Whether the current or buffered segment holds only whitespace
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Whether a segment is buffered and not yet consumed
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    fn fill(&mut self) -> Result<bool> {
        if self.pending {
            return Ok(true);
        }
        self.at_start = false;
        if self.read_segment()? {
            self.pending = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn next_char(&mut self) -> Result<Option<char>> {
        if let Some(c) = self.pushback.pop_front() {
            return Ok(Some(c));
        }
        Ok(self.charset.decode_next(self.input.as_mut())?)
    }

    /// Tokenize the next non-empty segment into the buffer
    fn read_segment(&mut self) -> Result<bool> {
        let d = *self.delimiters();
        let skip_new_lines = self.ignore_new_lines && d.segment != '\n' && d.segment != '\r';

        loop {
            self.fields.clear();
            self.fields.push(vec![vec![String::new()]]);
            self.raw.clear();

            let mut length = 0usize;
            let mut released = false;
            let mut terminated = false;

            while let Some(c) = self.next_char()? {
                if skip_new_lines && length == 0 && (c == '\n' || c == '\r') {
                    continue;
                }
                if released {
                    self.push_char(c);
                    released = false;
                } else if Some(c) == d.escape {
                    released = true;
                } else if c == d.segment {
                    terminated = true;
                    break;
                } else if c == d.field {
                    self.fields.push(vec![vec![String::new()]]);
                } else if c == d.component {
                    if let Some(field) = self.fields.last_mut() {
                        field.push(vec![String::new()]);
                    }
                } else if Some(c) == d.sub_component {
                    if let Some(component) = self.fields.last_mut().and_then(|f| f.last_mut()) {
                        component.push(String::new());
                    }
                } else {
                    self.push_char(c);
                }

                self.raw.push(c);
                length += 1;
                if length > self.max_segment_length {
                    return Err(Error::tokenize(
                        format!("Segment exceeds the maximum length of {} characters", self.max_segment_length),
                        self.segment_number + 1,
                    ));
                }
            }

            if released {
                return Err(Error::tokenize(
                    "Malformed escape sequence: release character at end of input",
                    self.segment_number + 1,
                ));
            }
            if length == 0 {
                if terminated {
                    continue;
                }
                return Ok(false);
            }

            self.segment_number += 1;
            trace!("Segment {}: {}", self.segment_number, self.raw);
            return Ok(true);
        }
    }

    fn push_char(&mut self, c: char) {
        if let Some(value) = self
            .fields
            .last_mut()
            .and_then(|f| f.last_mut())
            .and_then(|component| component.last_mut())
        {
            value.push(c);
        }
    }
}

/// A character the advice assigns to two roles. A space in the release or
/// reserved position means the role is unused.
fn repeated_service_char(chars: &[char; 6]) -> Option<char> {
    let used: Vec<char> = chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| !(matches!(i, 3 | 4) && c == ' '))
        .map(|(_, &c)| c)
        .collect();
    used.iter()
        .enumerate()
        .find(|&(i, c)| used[i + 1..].contains(c))
        .map(|(_, &c)| c)
}
