//! Character sets selected by the UNB syntax identifier
//!
//! The static code table maps every UN/EDIFACT syntax identifier to a
//! character set. Only the sets this reader can decode are kept; the
//! others are reported once when the table is built and only become an
//! error when an interchange actually names one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::LazyLock;
use tracing::warn;

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Byte decoder used by the segment reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// 7-bit ASCII; other bytes decode to U+FFFD
    #[serde(rename = "ascii", alias = "us-ascii")]
    Ascii,
    /// ISO-8859-1
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
    #[default]
    #[serde(rename = "utf8", alias = "utf-8")]
    Utf8,
}

/// Syntax identifier codes and the character set each one names
const SYNTAX_IDENTIFIERS: &[(&str, Option<Charset>, &str)] = &[
    ("UNOA", Some(Charset::Ascii), "ISO 646 upper case"),
    ("UNOB", Some(Charset::Ascii), "ISO 646"),
    ("UNOC", Some(Charset::Latin1), "ISO-8859-1"),
    ("UNOD", None, "ISO-8859-2"),
    ("UNOE", None, "ISO-8859-5"),
    ("UNOF", None, "ISO-8859-7"),
    ("UNOG", None, "ISO-8859-3"),
    ("UNOH", None, "ISO-8859-4"),
    ("UNOI", None, "ISO-8859-6"),
    ("UNOJ", None, "ISO-8859-8"),
    ("UNOK", None, "ISO-8859-9"),
    ("UNOW", Some(Charset::Utf8), "UTF-8"),
    ("UNOX", None, "ISO 2022"),
    ("UNOY", Some(Charset::Utf8), "ISO 10646-1"),
    ("1", Some(Charset::Ascii), "ISO 646 upper case"),
    ("2", Some(Charset::Ascii), "ISO 646"),
    ("3", Some(Charset::Latin1), "ISO-8859-1"),
    ("4", None, "ISO-8859-2"),
    ("5", None, "ISO-8859-5"),
    ("6", None, "ISO-8859-7"),
    ("7", None, "ISO-8859-3"),
    ("8", Some(Charset::Utf8), "UTF-8"),
];

static CHARSETS: LazyLock<HashMap<&'static str, Charset>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for (code, charset, name) in SYNTAX_IDENTIFIERS {
        match charset {
            Some(charset) => {
                table.insert(*code, *charset);
            }
            None => warn!("Syntax identifier {} ({}) is not supported and is excluded", code, name),
        }
    }
    table
});

impl Charset {
    /// Character set named by a UNB syntax identifier, `None` when the
    /// code is unknown or its character set is not supported
    #[must_use]
    pub fn for_syntax_identifier(code: &str) -> Option<Charset> {
        CHARSETS.get(code).copied()
    }

    /// Decode the next character from `input`, `None` at end of input
    ///
    /// # Errors
    ///
    /// Propagates read errors from `input`.
    pub fn decode_next(self, input: &mut dyn BufRead) -> io::Result<Option<char>> {
        let Some(first) = next_byte(input)? else {
            return Ok(None);
        };
        let c = match self {
            Charset::Ascii if first.is_ascii() => char::from(first),
            Charset::Ascii => REPLACEMENT,
            Charset::Latin1 => char::from(first),
            Charset::Utf8 => decode_utf8(first, input)?,
        };
        Ok(Some(c))
    }
}

fn next_byte(input: &mut dyn BufRead) -> io::Result<Option<u8>> {
    let byte = input.fill_buf()?.first().copied();
    if byte.is_some() {
        input.consume(1);
    }
    Ok(byte)
}

fn decode_utf8(first: u8, input: &mut dyn BufRead) -> io::Result<char> {
    let width = match first {
        0x00..=0x7F => return Ok(char::from(first)),
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Ok(REPLACEMENT),
    };

    let mut bytes = [first, 0, 0, 0];
    for slot in bytes.iter_mut().take(width).skip(1) {
        match input.fill_buf()?.first().copied() {
            Some(b) if b & 0xC0 == 0x80 => {
                input.consume(1);
                *slot = b;
            }
            // leave the offending byte for the next character
            _ => return Ok(REPLACEMENT),
        }
    }

    Ok(std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .unwrap_or(REPLACEMENT))
}
