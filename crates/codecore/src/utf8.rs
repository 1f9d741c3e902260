//! UTF-8 encoding and decoding with chunk-resumable state.
//!
//! The encoder consumes UTF-16 code units so that a surrogate pair split
//! across chunk boundaries can be carried between `add` calls and fused
//! into one four-byte sequence; an unpaired surrogate is written as the
//! raw three-byte encoding of its code unit. The decoder is a byte-at-a-time
//! state machine that accepts arbitrary chunk boundaries, rejects overlong
//! forms, surrogate code points, and values above U+10FFFF, and drops a
//! byte-order mark only when it is the very first decoded character. In
//! lossy mode each malformed sequence becomes one U+FFFD instead of an
//! error.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use bstr::BString;
use thiserror::Error;

use crate::convert::{ByteSink, Converter, TextSink};

const REPLACEMENT: char = '\u{FFFD}';
const BOM: u32 = 0xFEFF;

/// Why a byte sequence was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8ErrorKind {
    /// A byte that can never appear in UTF-8.
    InvalidByte,
    /// A continuation byte outside any sequence.
    UnexpectedContinuation,
    /// A sequence cut short by a non-continuation byte.
    MissingContinuation,
    /// A code point encoded in more bytes than it needs.
    Overlong,
    /// A surrogate code point or a value above U+10FFFF.
    InvalidCodePoint,
}

impl fmt::Display for Utf8ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidByte => "invalid byte",
            Self::UnexpectedContinuation => "unexpected continuation byte",
            Self::MissingContinuation => "missing continuation byte",
            Self::Overlong => "overlong encoding",
            Self::InvalidCodePoint => "invalid code point",
        })
    }
}

/// Strict decoding failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Utf8DecodeError {
    /// A malformed sequence, with the offset of the offending byte within
    /// the chunk that carried it.
    #[error("{kind} at byte {index} in {input:?}")]
    Invalid {
        kind: Utf8ErrorKind,
        index: usize,
        input: BString,
    },
    /// The input ended in the middle of a multi-byte sequence.
    #[error("unfinished UTF-8 sequence at end of input")]
    Unfinished,
}

fn is_lead_surrogate(unit: u16) -> bool {
    unit & 0xFC00 == 0xD800
}

fn is_trail_surrogate(unit: u16) -> bool {
    unit & 0xFC00 == 0xDC00
}

fn combine_surrogates(lead: u16, trail: u16) -> u32 {
    0x10000 + ((u32::from(lead) & 0x3FF) << 10 | (u32::from(trail) & 0x3FF))
}

#[allow(clippy::cast_possible_truncation)]
fn write_code_point(out: &mut Vec<u8>, cp: u32) {
    if cp <= 0x7F {
        out.push(cp as u8);
    } else if cp <= 0x7FF {
        out.push(0xC0 | (cp >> 6) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else if cp <= 0xFFFF {
        out.push(0xE0 | (cp >> 12) as u8);
        out.push(0x80 | (cp >> 6 & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    } else {
        out.push(0xF0 | (cp >> 18) as u8);
        out.push(0x80 | (cp >> 12 & 0x3F) as u8);
        out.push(0x80 | (cp >> 6 & 0x3F) as u8);
        out.push(0x80 | (cp & 0x3F) as u8);
    }
}

/// Encodes a string. Rust strings are already UTF-8, so this is a copy.
#[must_use]
pub fn encode(input: &str) -> Vec<u8> {
    input.as_bytes().to_vec()
}

/// Encodes a UTF-16 code unit sequence, pairing surrogates where possible.
#[must_use]
pub fn encode_utf16(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len() * 3);
    let mut sink = Utf8Encoder::new().start_chunked(&mut out);
    sink.add(units);
    sink.close();
    out
}

/// UTF-16 to UTF-8 converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Encoder;

impl Utf8Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn start_chunked<S: ByteSink>(self, output: S) -> Utf8EncodeSink<S> {
        Utf8EncodeSink {
            output,
            carry: 0,
            closed: false,
        }
    }
}

impl Converter for Utf8Encoder {
    type Input = str;
    type Output = Vec<u8>;
    type Error = core::convert::Infallible;

    fn convert(&self, input: &str) -> Result<Vec<u8>, Self::Error> {
        Ok(encode(input))
    }
}

/// Chunked UTF-16 to UTF-8 encoder. A lead surrogate at the end of a chunk
/// is held back until the next chunk decides whether it pairs.
pub struct Utf8EncodeSink<S: ByteSink> {
    output: S,
    carry: u16,
    closed: bool,
}

impl<S: ByteSink> Utf8EncodeSink<S> {
    /// # Panics
    ///
    /// Panics when called after `close`.
    pub fn add(&mut self, units: &[u16]) {
        assert!(!self.closed, "add on a closed sink");
        let mut out = Vec::with_capacity(units.len() * 3 + 4);
        for &unit in units {
            if self.carry != 0 {
                let lead = self.carry;
                self.carry = 0;
                if is_trail_surrogate(unit) {
                    write_code_point(&mut out, combine_surrogates(lead, unit));
                    continue;
                }
                write_code_point(&mut out, u32::from(lead));
            }
            if is_lead_surrogate(unit) {
                self.carry = unit;
            } else {
                write_code_point(&mut out, u32::from(unit));
            }
        }
        if !out.is_empty() {
            self.output.add(&out);
        }
    }

    /// Flushes a pending lead surrogate as its raw three-byte form and
    /// closes the downstream sink.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.carry != 0 {
            let mut out = Vec::with_capacity(3);
            write_code_point(&mut out, u32::from(self.carry));
            self.carry = 0;
            self.output.add(&out);
        }
        self.output.close();
    }
}

/// Decodes bytes strictly, stripping a leading byte-order mark.
pub fn decode(input: &[u8]) -> Result<String, Utf8DecodeError> {
    Utf8Decoder::new().convert(input)
}

/// Decodes bytes, replacing each malformed sequence with U+FFFD.
#[must_use]
pub fn decode_lossy(input: &[u8]) -> String {
    Utf8Decoder::lossy().convert(input).unwrap_or_default()
}

/// UTF-8 to text converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder {
    allow_malformed: bool,
}

impl Utf8Decoder {
    /// A strict decoder: malformed input is an error.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_malformed: false,
        }
    }

    /// A lossy decoder: each malformed sequence decodes to U+FFFD.
    #[must_use]
    pub fn lossy() -> Self {
        Self {
            allow_malformed: true,
        }
    }

    pub fn start_chunked<S: TextSink>(&self, output: S) -> Utf8DecodeSink<S> {
        Utf8DecodeSink {
            output,
            allow_malformed: self.allow_malformed,
            value: 0,
            expected: 0,
            extra: 0,
            first_char: true,
            closed: false,
        }
    }
}

impl Converter for Utf8Decoder {
    type Input = [u8];
    type Output = String;
    type Error = Utf8DecodeError;

    fn convert(&self, input: &[u8]) -> Result<String, Utf8DecodeError> {
        let mut out = String::new();
        let mut sink = self.start_chunked(&mut out);
        sink.add(input)?;
        sink.close()?;
        Ok(out)
    }
}

/// Chunked UTF-8 decoder. Sequences may split anywhere, including inside
/// a byte-order mark; decoded text for a chunk is delivered downstream
/// only after the whole chunk was accepted.
pub struct Utf8DecodeSink<S: TextSink> {
    output: S,
    allow_malformed: bool,
    /// Code point bits accumulated so far.
    value: u32,
    /// Continuation bytes still required.
    expected: u8,
    /// Continuation bytes of the current sequence in total.
    extra: u8,
    first_char: bool,
    closed: bool,
}

impl<S: TextSink> Utf8DecodeSink<S> {
    /// # Panics
    ///
    /// Panics when called after `close`.
    pub fn add(&mut self, chunk: &[u8]) -> Result<(), Utf8DecodeError> {
        assert!(!self.closed, "add on a closed sink");
        let mut out = String::with_capacity(chunk.len());
        let mut i = 0;
        while i < chunk.len() {
            let byte = chunk[i];
            if self.expected > 0 {
                if byte & 0xC0 == 0x80 {
                    self.value = self.value << 6 | u32::from(byte & 0x3F);
                    self.expected -= 1;
                    if self.expected == 0 {
                        self.finish_sequence(&mut out, chunk, i)?;
                    }
                    i += 1;
                } else {
                    // The broken sequence yields one error; the byte that
                    // broke it is then examined again as a fresh start.
                    self.expected = 0;
                    self.extra = 0;
                    self.malformed(&mut out, chunk, i, Utf8ErrorKind::MissingContinuation)?;
                }
                continue;
            }
            match byte {
                0x00..=0x7F => {
                    out.push(byte as char);
                    self.first_char = false;
                }
                0x80..=0xBF => {
                    self.malformed(&mut out, chunk, i, Utf8ErrorKind::UnexpectedContinuation)?;
                }
                0xC0..=0xDF => self.begin(u32::from(byte & 0x1F), 1),
                0xE0..=0xEF => self.begin(u32::from(byte & 0x0F), 2),
                0xF0..=0xF4 => self.begin(u32::from(byte & 0x07), 3),
                _ => {
                    self.malformed(&mut out, chunk, i, Utf8ErrorKind::InvalidByte)?;
                }
            }
            i += 1;
        }
        if !out.is_empty() {
            self.output.add(&out);
        }
        Ok(())
    }

    /// Rejects a pending unfinished sequence (or, in lossy mode, flushes
    /// it as U+FFFD) and closes the downstream sink.
    pub fn close(&mut self) -> Result<(), Utf8DecodeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.expected > 0 {
            self.expected = 0;
            self.extra = 0;
            self.value = 0;
            if !self.allow_malformed {
                return Err(Utf8DecodeError::Unfinished);
            }
            self.output.add("\u{FFFD}");
        }
        self.output.close();
        Ok(())
    }

    fn begin(&mut self, bits: u32, count: u8) {
        self.value = bits;
        self.expected = count;
        self.extra = count;
    }

    fn finish_sequence(
        &mut self,
        out: &mut String,
        chunk: &[u8],
        i: usize,
    ) -> Result<(), Utf8DecodeError> {
        const LIMITS: [u32; 3] = [0x7F, 0x7FF, 0xFFFF];
        let value = self.value;
        let extra = self.extra;
        self.value = 0;
        self.extra = 0;
        if value <= LIMITS[usize::from(extra) - 1] {
            return self.malformed(out, chunk, i, Utf8ErrorKind::Overlong);
        }
        if value > 0x10FFFF || (0xD800..=0xDFFF).contains(&value) {
            return self.malformed(out, chunk, i, Utf8ErrorKind::InvalidCodePoint);
        }
        if self.first_char && value == BOM {
            self.first_char = false;
            return Ok(());
        }
        self.first_char = false;
        match char::from_u32(value) {
            Some(c) => {
                out.push(c);
                Ok(())
            }
            None => self.malformed(out, chunk, i, Utf8ErrorKind::InvalidCodePoint),
        }
    }

    fn malformed(
        &mut self,
        out: &mut String,
        chunk: &[u8],
        index: usize,
        kind: Utf8ErrorKind,
    ) -> Result<(), Utf8DecodeError> {
        if self.allow_malformed {
            out.push(REPLACEMENT);
            self.first_char = false;
            return Ok(());
        }
        Err(Utf8DecodeError::Invalid {
            kind,
            index,
            input: BString::from(chunk),
        })
    }
}
