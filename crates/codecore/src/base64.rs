//! Base64 encoding and decoding per RFC 4648, in the standard and
//! URL-safe alphabets.
//!
//! Both directions are incremental state machines whose whole state packs
//! into one integer, so chunk boundaries can fall anywhere, including
//! between a character and its padding. The decoder accepts characters
//! from either alphabet in the same input and requires canonical `=`
//! padding; [`normalize`] is the lenient entry point that decodes
//! percent-escapes and appends missing padding without decoding.

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::convert::{ByteSink, Converter, TextSink};

const STANDARD_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const URL_SAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const PADDING: u8 = b'=';

const INVALID: i8 = -2;
const PAD: i8 = -1;

/// Maps a byte to its 6-bit value, `PAD` for `=`, `INVALID` otherwise.
/// Accepts `+/` and `-_` simultaneously.
static INVERSE: [i8; 256] = build_inverse();

#[allow(clippy::cast_possible_truncation)]
const fn build_inverse() -> [i8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[STANDARD_ALPHABET[i] as usize] = i as i8;
        i += 1;
    }
    table[b'-' as usize] = 62;
    table[b'_' as usize] = 63;
    table[PADDING as usize] = PAD;
    table
}

/// Decoding failure. Indexes are relative to the chunk that carried the
/// offending character.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Base64DecodeError {
    #[error("invalid character at index {index} in {source_text:?}")]
    InvalidCharacter { index: usize, source_text: String },
    #[error("invalid padding at index {index} in {source_text:?}")]
    InvalidPadding { index: usize, source_text: String },
    #[error("missing padding character at end of input")]
    MissingPadding,
    #[error("input length not a multiple of four")]
    InvalidLength,
    #[error("invalid percent escape at index {index} in {source_text:?}")]
    InvalidPercentEscape { index: usize, source_text: String },
}

// Encoder state: the number of pending input bytes (0..=2) in the low two
// bits, their bits above.
const fn encoder_state(count: u32, bits: u32) -> u32 {
    bits << 2 | count
}

#[allow(clippy::cast_possible_truncation)]
fn encode_chunk(alphabet: &[u8; 64], state: u32, bytes: &[u8], is_last: bool) -> (u32, String) {
    let mut count = state & 3;
    let mut bits = state >> 2;
    let mut out = String::with_capacity((bytes.len() / 3 + 2) * 4);
    for &byte in bytes {
        bits = (bits << 8 | u32::from(byte)) & 0xFF_FFFF;
        count += 1;
        if count == 3 {
            out.push(alphabet[(bits >> 18 & 0x3F) as usize] as char);
            out.push(alphabet[(bits >> 12 & 0x3F) as usize] as char);
            out.push(alphabet[(bits >> 6 & 0x3F) as usize] as char);
            out.push(alphabet[(bits & 0x3F) as usize] as char);
            count = 0;
            bits = 0;
        }
    }
    if is_last && count > 0 {
        if count == 1 {
            let b = bits << 4;
            out.push(alphabet[(b >> 6 & 0x3F) as usize] as char);
            out.push(alphabet[(b & 0x3F) as usize] as char);
            out.push('=');
            out.push('=');
        } else {
            let b = bits << 2;
            out.push(alphabet[(b >> 12 & 0x3F) as usize] as char);
            out.push(alphabet[(b >> 6 & 0x3F) as usize] as char);
            out.push(alphabet[(b & 0x3F) as usize] as char);
            out.push('=');
        }
        count = 0;
        bits = 0;
    }
    (encoder_state(count, bits), out)
}

/// Encodes bytes in the standard alphabet with padding.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let (_, out) = encode_chunk(STANDARD_ALPHABET, 0, bytes, true);
    out
}

/// Encodes bytes in the URL-safe alphabet with padding.
#[must_use]
pub fn encode_url_safe(bytes: &[u8]) -> String {
    let (_, out) = encode_chunk(URL_SAFE_ALPHABET, 0, bytes, true);
    out
}

/// Decodes padded Base64 text in either alphabet.
pub fn decode(text: &str) -> Result<Vec<u8>, Base64DecodeError> {
    Base64Decoder::new().convert(text)
}

/// Bytes to Base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder {
    url_safe: bool,
}

impl Base64Encoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { url_safe: false }
    }

    #[must_use]
    pub const fn url_safe() -> Self {
        Self { url_safe: true }
    }

    fn alphabet(self) -> &'static [u8; 64] {
        if self.url_safe {
            URL_SAFE_ALPHABET
        } else {
            STANDARD_ALPHABET
        }
    }

    pub fn start_chunked<S: TextSink>(&self, output: S) -> Base64EncodeSink<S> {
        Base64EncodeSink {
            output,
            alphabet: self.alphabet(),
            state: 0,
            closed: false,
        }
    }
}

impl Converter for Base64Encoder {
    type Input = [u8];
    type Output = String;
    type Error = core::convert::Infallible;

    fn convert(&self, input: &[u8]) -> Result<String, Self::Error> {
        let (_, out) = encode_chunk(self.alphabet(), 0, input, true);
        Ok(out)
    }
}

/// Chunked Base64 encoder. Padding is decided only at `close`, so chunks
/// need not arrive in multiples of three bytes.
pub struct Base64EncodeSink<S: TextSink> {
    output: S,
    alphabet: &'static [u8; 64],
    state: u32,
    closed: bool,
}

impl<S: TextSink> Base64EncodeSink<S> {
    /// # Panics
    ///
    /// Panics when called after `close`.
    pub fn add(&mut self, bytes: &[u8]) {
        assert!(!self.closed, "add on a closed sink");
        let (state, out) = encode_chunk(self.alphabet, self.state, bytes, false);
        self.state = state;
        if !out.is_empty() {
            self.output.add(&out);
        }
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let (state, out) = encode_chunk(self.alphabet, self.state, &[], true);
        self.state = state;
        if !out.is_empty() {
            self.output.add(&out);
        }
        self.output.close();
    }
}

// Decoder state: non-negative while accumulating a quantum (character
// count in the low two bits, their bits above); negative once padding has
// begun, holding -(outstanding padding) - 1.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_chunk(out: &mut Vec<u8>, mut state: i32, text: &str) -> Result<i32, Base64DecodeError> {
    for (i, byte) in text.bytes().enumerate() {
        if state < 0 {
            if byte == PADDING && state < -1 {
                state += 1;
                continue;
            }
            return Err(Base64DecodeError::InvalidPadding {
                index: i,
                source_text: String::from(text),
            });
        }
        let value = INVERSE[usize::from(byte)];
        if value >= 0 {
            let count = state & 3;
            let bits = (state >> 2) << 6 | i32::from(value);
            if count == 3 {
                out.push((bits >> 16) as u8);
                out.push((bits >> 8) as u8);
                out.push(bits as u8);
                state = 0;
            } else {
                state = bits << 2 | (count + 1);
            }
            continue;
        }
        if value == PAD {
            let count = state & 3;
            let bits = state >> 2;
            match count {
                // The final quantum had three characters: two bytes out,
                // padding complete.
                3 => {
                    out.push((bits >> 10) as u8);
                    out.push((bits >> 2) as u8);
                    state = -1;
                }
                // Two characters: one byte out, one more `=` owed.
                2 => {
                    out.push((bits >> 4) as u8);
                    state = -2;
                }
                _ => {
                    return Err(Base64DecodeError::InvalidPadding {
                        index: i,
                        source_text: String::from(text),
                    });
                }
            }
            continue;
        }
        return Err(Base64DecodeError::InvalidCharacter {
            index: i,
            source_text: String::from(text),
        });
    }
    Ok(state)
}

/// Base64 text to bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Decoder;

impl Base64Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn start_chunked<S: ByteSink>(&self, output: S) -> Base64DecodeSink<S> {
        Base64DecodeSink {
            output,
            state: 0,
            closed: false,
        }
    }
}

impl Converter for Base64Decoder {
    type Input = str;
    type Output = Vec<u8>;
    type Error = Base64DecodeError;

    fn convert(&self, input: &str) -> Result<Vec<u8>, Base64DecodeError> {
        let mut out = Vec::with_capacity(input.len() / 4 * 3);
        let mut sink = self.start_chunked(&mut out);
        sink.add(input)?;
        sink.close()?;
        Ok(out)
    }
}

/// Chunked Base64 decoder.
pub struct Base64DecodeSink<S: ByteSink> {
    output: S,
    state: i32,
    closed: bool,
}

impl<S: ByteSink> Base64DecodeSink<S> {
    /// # Panics
    ///
    /// Panics when called after `close`.
    pub fn add(&mut self, text: &str) -> Result<(), Base64DecodeError> {
        assert!(!self.closed, "add on a closed sink");
        let mut out = Vec::with_capacity(text.len() / 4 * 3 + 3);
        self.state = decode_chunk(&mut out, self.state, text)?;
        if !out.is_empty() {
            self.output.add(&out);
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), Base64DecodeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.state < -1 {
            return Err(Base64DecodeError::MissingPadding);
        }
        if self.state >= 0 && self.state & 3 != 0 {
            return Err(Base64DecodeError::InvalidLength);
        }
        self.output.close();
        Ok(())
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Rewrites `text` into strict Base64 without decoding it: `%xx` escapes
/// are replaced by the character they name, and missing padding is
/// appended to an unpadded final quantum. Present padding must already be
/// correct, and every character must belong to one of the two alphabets.
pub fn normalize(text: &str) -> Result<String, Base64DecodeError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(bytes.len() + 2);
    let mut padding = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let (byte, consumed) = if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return Err(Base64DecodeError::InvalidPercentEscape {
                    index: i,
                    source_text: String::from(text),
                });
            }
            match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(hi), Some(lo)) => (hi << 4 | lo, 3),
                _ => {
                    return Err(Base64DecodeError::InvalidPercentEscape {
                        index: i,
                        source_text: String::from(text),
                    });
                }
            }
        } else {
            (bytes[i], 1)
        };
        if byte == PADDING {
            padding += 1;
            if padding > 2 {
                return Err(Base64DecodeError::InvalidPadding {
                    index: i,
                    source_text: String::from(text),
                });
            }
            out.push('=');
        } else {
            if padding > 0 {
                return Err(Base64DecodeError::InvalidPadding {
                    index: i,
                    source_text: String::from(text),
                });
            }
            if INVERSE[usize::from(byte)] < 0 {
                return Err(Base64DecodeError::InvalidCharacter {
                    index: i,
                    source_text: String::from(text),
                });
            }
            out.push(byte as char);
        }
        i += consumed;
    }
    match out.len() % 4 {
        0 => Ok(out),
        2 | 3 if padding == 0 => {
            while out.len() % 4 != 0 {
                out.push('=');
            }
            Ok(out)
        }
        _ if padding > 0 => Err(Base64DecodeError::MissingPadding),
        _ => Err(Base64DecodeError::InvalidLength),
    }
}

/// A paired encoder and decoder over one alphabet.
#[derive(Debug, Clone, Copy)]
pub struct Base64Codec {
    url_safe: bool,
}

/// The `+/` alphabet.
pub const STANDARD: Base64Codec = Base64Codec { url_safe: false };
/// The `-_` alphabet.
pub const URL_SAFE: Base64Codec = Base64Codec { url_safe: true };

impl Base64Codec {
    #[must_use]
    pub fn encoder(&self) -> Base64Encoder {
        Base64Encoder {
            url_safe: self.url_safe,
        }
    }

    #[must_use]
    pub fn decoder(&self) -> Base64Decoder {
        Base64Decoder
    }

    #[must_use]
    pub fn encode(&self, bytes: &[u8]) -> String {
        let (_, out) = encode_chunk(self.encoder().alphabet(), 0, bytes, true);
        out
    }

    pub fn decode(&self, text: &str) -> Result<Vec<u8>, Base64DecodeError> {
        self.decoder().convert(text)
    }

    pub fn normalize(&self, text: &str) -> Result<String, Base64DecodeError> {
        normalize(text)
    }
}
