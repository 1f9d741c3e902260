//! JSON text to values.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use thiserror::Error;

use crate::convert::{Converter, ValueSink};
use crate::json::object::Object;
use crate::json::raw::RawValue;
use crate::utf8;
use crate::value::{Array, Value};

/// Decoding failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonDecodeError {
    /// The text is not valid JSON. `line` and `column` are one-based;
    /// `offset` is the byte offset of the same position.
    #[error("{message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        offset: usize,
    },
    /// Byte input that is not valid UTF-8.
    #[error(transparent)]
    Encoding(#[from] utf8::Utf8DecodeError),
}

fn syntax_error(text: &str, error: &serde_json::Error) -> JsonDecodeError {
    let line = error.line();
    let column = error.column();
    JsonDecodeError::Syntax {
        message: error.to_string(),
        line,
        column,
        offset: byte_offset(text, line, column),
    }
}

fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut newlines_left = line - 1;
    let mut line_start = 0;
    for (i, byte) in text.bytes().enumerate() {
        if newlines_left == 0 {
            break;
        }
        if byte == b'\n' {
            newlines_left -= 1;
            line_start = i + 1;
        }
    }
    (line_start + column.saturating_sub(1)).min(text.len())
}

/// Parses JSON text into a value tree. Objects come back lazy: their
/// members convert on first access. A repeated object key keeps its first
/// position and last value.
pub fn decode(text: &str) -> Result<Value, JsonDecodeError> {
    let raw: RawValue = serde_json::from_str(text).map_err(|e| syntax_error(text, &e))?;
    Ok(raw_to_value(raw))
}

/// Decodes UTF-8 bytes as JSON text. A leading byte-order mark is
/// tolerated and skipped.
pub fn decode_utf8(bytes: &[u8]) -> Result<Value, JsonDecodeError> {
    let text = utf8::decode(bytes)?;
    decode(&text)
}

pub(crate) fn raw_to_value(raw: RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Number(n) => Value::Number(n),
        RawValue::String(s) => Value::from(s),
        RawValue::Array(items) => {
            Value::Array(Array::from_vec(items.into_iter().map(raw_to_value).collect()))
        }
        RawValue::Object(entries) => Value::Object(Object::from_raw_entries(entries)),
    }
}

/// Where a value sits in its parent, as seen by a reviver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviverKey<'a> {
    /// An array element.
    Index(usize),
    /// An object member.
    Key(&'a str),
    /// The document root.
    Root,
}

/// Parses JSON text, passing every value bottom-up through `reviver`
/// before it is stored in its parent; the root goes through last, under
/// [`ReviverKey::Root`]. The result is fully eager.
pub fn decode_with<F>(text: &str, mut reviver: F) -> Result<Value, JsonDecodeError>
where
    F: FnMut(ReviverKey<'_>, Value) -> Value,
{
    let raw: RawValue = serde_json::from_str(text).map_err(|e| syntax_error(text, &e))?;
    let root = revive(raw, &mut reviver);
    Ok(reviver(ReviverKey::Root, root))
}

fn revive<F>(raw: RawValue, reviver: &mut F) -> Value
where
    F: FnMut(ReviverKey<'_>, Value) -> Value,
{
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Number(n) => Value::Number(n),
        RawValue::String(s) => Value::from(s),
        RawValue::Array(items) => {
            let revived: Vec<Value> = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let value = revive(item, reviver);
                    reviver(ReviverKey::Index(i), value)
                })
                .collect();
            Value::Array(Array::from_vec(revived))
        }
        RawValue::Object(entries) => {
            let object = Object::new();
            for (key, item) in entries {
                let value = revive(item, reviver);
                let value = reviver(ReviverKey::Key(&key), value);
                object.insert(key, value);
            }
            Value::Object(object)
        }
    }
}

/// Text to value converter.
///
/// ```
/// use codecore::{json, Converter, Value};
///
/// let value = json::JsonDecoder::new().convert("[1, 2]")?;
/// assert_eq!(value, Value::from(vec![Value::from(1.0), Value::from(2.0)]));
/// # Ok::<(), codecore::json::JsonDecodeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Starts a chunked decode. Chunks buffer until `close`, which parses
    /// the whole text and hands the value to `output`; JSON cannot be
    /// parsed to completion earlier than its final byte.
    pub fn start_chunked<S: ValueSink>(&self, output: S) -> JsonDecodeSink<S> {
        JsonDecodeSink {
            output,
            buffer: String::new(),
            closed: false,
        }
    }
}

impl Converter for JsonDecoder {
    type Input = str;
    type Output = Value;
    type Error = JsonDecodeError;

    fn convert(&self, input: &str) -> Result<Value, JsonDecodeError> {
        decode(input)
    }
}

/// Chunked JSON decoder.
pub struct JsonDecodeSink<S: ValueSink> {
    output: S,
    buffer: String,
    closed: bool,
}

impl<S: ValueSink> JsonDecodeSink<S> {
    /// # Panics
    ///
    /// Panics when called after `close`.
    pub fn add(&mut self, chunk: &str) {
        assert!(!self.closed, "add on a closed sink");
        self.buffer.push_str(chunk);
    }

    pub fn close(&mut self) -> Result<(), JsonDecodeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let value = decode(&self.buffer)?;
        self.buffer.clear();
        self.output.add(value);
        self.output.close();
        Ok(())
    }
}
