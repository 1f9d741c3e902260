//! Values to JSON text or UTF-8 bytes.
//!
//! One stringifier drives every output shape through a small text-target
//! seam: a growable `String`, a downstream [`TextSink`], or a fixed-size
//! byte buffer flushed to a [`ByteSink`] as it fills. The walk keeps a
//! stack of container identities and fails on re-entry, so cyclic values
//! are an error rather than a hang; values sharing a subtree encode fine.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

use crate::convert::{ByteSink, Converter, TextSink};
use crate::value::{Array, Value};

/// Encoding failure.
#[derive(Debug, Error)]
pub enum JsonEncodeError {
    /// A container reached along a path through itself.
    #[error("cyclic structure cannot be encoded as JSON")]
    Cycle(Value),
    /// A value with no JSON representation: a non-finite number that the
    /// fallback could not replace. When the fallback itself produced an
    /// unencodable value, `cause` says why.
    #[error("value cannot be encoded as JSON")]
    Unsupported {
        value: Value,
        #[source]
        cause: Option<Box<JsonEncodeError>>,
    },
}

type Fallback = Box<dyn Fn(&Value) -> Option<Value>>;

trait TextTarget {
    fn put(&mut self, piece: &str);
}

impl TextTarget for String {
    fn put(&mut self, piece: &str) {
        self.push_str(piece);
    }
}

/// Forwards every piece straight to a text sink.
struct SinkTarget<'a, S: TextSink> {
    sink: &'a mut S,
}

impl<S: TextSink> TextTarget for SinkTarget<'_, S> {
    fn put(&mut self, piece: &str) {
        self.sink.add(piece);
    }
}

/// Buffers UTF-8 bytes up to a fixed capacity, flushing full buffers
/// downstream. A multi-byte character may be split across flushes.
struct Utf8Target<S: ByteSink> {
    output: S,
    buffer: Vec<u8>,
    capacity: usize,
}

impl<S: ByteSink> Utf8Target<S> {
    fn new(output: S, capacity: usize) -> Self {
        Self {
            output,
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.output.add(&self.buffer);
            self.buffer.clear();
        }
    }
}

impl<S: ByteSink> TextTarget for Utf8Target<S> {
    fn put(&mut self, piece: &str) {
        let mut bytes = piece.as_bytes();
        while !bytes.is_empty() {
            let room = self.capacity - self.buffer.len();
            if room == 0 {
                self.flush();
                continue;
            }
            let n = room.min(bytes.len());
            self.buffer.extend_from_slice(&bytes[..n]);
            bytes = &bytes[n..];
        }
    }
}

struct Stringifier<'e, W: TextTarget> {
    out: &'e mut W,
    indent: Option<&'e str>,
    fallback: Option<&'e Fallback>,
    depth: usize,
    seen: Vec<usize>,
}

impl<W: TextTarget> Stringifier<'_, W> {
    fn write_value(&mut self, value: &Value) -> Result<(), JsonEncodeError> {
        match value {
            Value::Null => {
                self.out.put("null");
                Ok(())
            }
            Value::Bool(true) => {
                self.out.put("true");
                Ok(())
            }
            Value::Bool(false) => {
                self.out.put("false");
                Ok(())
            }
            Value::Number(n) => self.write_number(*n, value),
            Value::String(s) => {
                self.write_string(s);
                Ok(())
            }
            Value::Array(array) => self.write_array(array),
            Value::Object(object) => self.write_object(value, object),
        }
    }

    /// Finite doubles print in their shortest round-trip decimal form,
    /// integral ones without a fraction. Non-finite doubles go through
    /// the fallback or fail.
    fn write_number(&mut self, n: f64, original: &Value) -> Result<(), JsonEncodeError> {
        if n.is_finite() {
            self.out.put(&format!("{n}"));
            return Ok(());
        }
        let Some(fallback) = self.fallback else {
            return Err(JsonEncodeError::Unsupported {
                value: original.clone(),
                cause: None,
            });
        };
        let Some(substitute) = fallback(original) else {
            return Err(JsonEncodeError::Unsupported {
                value: original.clone(),
                cause: None,
            });
        };
        if matches!(&substitute, Value::Number(m) if !m.is_finite()) {
            return Err(JsonEncodeError::Unsupported {
                value: original.clone(),
                cause: None,
            });
        }
        match self.write_value(&substitute) {
            Ok(()) => Ok(()),
            Err(cause) => Err(JsonEncodeError::Unsupported {
                value: original.clone(),
                cause: Some(Box::new(cause)),
            }),
        }
    }

    fn write_string(&mut self, s: &str) {
        self.out.put("\"");
        let mut run_start = 0;
        for (i, c) in s.char_indices() {
            let escape: &str = match c {
                '"' => "\\\"",
                '\\' => "\\\\",
                '\u{08}' => "\\b",
                '\t' => "\\t",
                '\n' => "\\n",
                '\u{0C}' => "\\f",
                '\r' => "\\r",
                c if u32::from(c) < 0x20 => {
                    if run_start < i {
                        self.out.put(&s[run_start..i]);
                    }
                    self.out.put(&format!("\\u{:04x}", u32::from(c)));
                    run_start = i + 1;
                    continue;
                }
                _ => continue,
            };
            if run_start < i {
                self.out.put(&s[run_start..i]);
            }
            self.out.put(escape);
            run_start = i + 1;
        }
        if run_start < s.len() {
            self.out.put(&s[run_start..]);
        }
        self.out.put("\"");
    }

    fn write_indent(&mut self) {
        if let Some(indent) = self.indent {
            for _ in 0..self.depth {
                self.out.put(indent);
            }
        }
    }

    fn write_array(&mut self, array: &Array) -> Result<(), JsonEncodeError> {
        let id = array.identity();
        if self.seen.contains(&id) {
            return Err(JsonEncodeError::Cycle(Value::Array(array.clone())));
        }
        self.seen.push(id);
        let items = array.to_vec();
        if items.is_empty() {
            self.out.put("[]");
            self.seen.pop();
            return Ok(());
        }
        if self.indent.is_some() {
            self.out.put("[\n");
            self.depth += 1;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.out.put(",\n");
                }
                self.write_indent();
                self.write_value(item)?;
            }
            self.depth -= 1;
            self.out.put("\n");
            self.write_indent();
            self.out.put("]");
        } else {
            self.out.put("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.out.put(",");
                }
                self.write_value(item)?;
            }
            self.out.put("]");
        }
        self.seen.pop();
        Ok(())
    }

    fn write_object(
        &mut self,
        original: &Value,
        object: &crate::json::Object,
    ) -> Result<(), JsonEncodeError> {
        let id = object.identity();
        if self.seen.contains(&id) {
            return Err(JsonEncodeError::Cycle(original.clone()));
        }
        self.seen.push(id);
        let entries = object.snapshot();
        if entries.is_empty() {
            self.out.put("{}");
            self.seen.pop();
            return Ok(());
        }
        if self.indent.is_some() {
            self.out.put("{\n");
            self.depth += 1;
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    self.out.put(",\n");
                }
                self.write_indent();
                self.write_string(key);
                self.out.put(": ");
                self.write_value(item)?;
            }
            self.depth -= 1;
            self.out.put("\n");
            self.write_indent();
            self.out.put("}");
        } else {
            self.out.put("{");
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    self.out.put(",");
                }
                self.write_string(key);
                self.out.put(":");
                self.write_value(item)?;
            }
            self.out.put("}");
        }
        self.seen.pop();
        Ok(())
    }
}

/// Encodes a value as compact JSON text.
pub fn encode(value: &Value) -> Result<String, JsonEncodeError> {
    JsonEncoder::new().convert(value)
}

/// Encodes a value as pretty-printed JSON text using `indent` per level.
pub fn encode_pretty(value: &Value, indent: &str) -> Result<String, JsonEncodeError> {
    JsonEncoder::with_indent(indent).convert(value)
}

/// Encodes a value straight to compact JSON UTF-8 bytes.
pub fn encode_to_bytes(value: &Value) -> Result<Vec<u8>, JsonEncodeError> {
    JsonUtf8Encoder::new().convert(value)
}

/// Value to JSON text converter.
///
/// A fallback closure, when set, is consulted for each non-finite number;
/// whatever it returns is encoded in place of the offending value.
pub struct JsonEncoder {
    indent: Option<String>,
    fallback: Option<Fallback>,
}

impl JsonEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: None,
            fallback: None,
        }
    }

    /// An encoder that pretty-prints with `indent` per nesting level.
    #[must_use]
    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: Some(indent.into()),
            fallback: None,
        }
    }

    #[must_use]
    pub fn fallback(mut self, fallback: impl Fn(&Value) -> Option<Value> + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    fn run<W: TextTarget>(&self, out: &mut W, value: &Value) -> Result<(), JsonEncodeError> {
        let mut stringifier = Stringifier {
            out,
            indent: self.indent.as_deref(),
            fallback: self.fallback.as_ref(),
            depth: 0,
            seen: Vec::new(),
        };
        stringifier.write_value(value)
    }

    /// Starts a chunked encode that accepts exactly one value and streams
    /// its text to `output` as it is produced.
    pub fn start_chunked<S: TextSink>(&self, output: S) -> JsonEncodeSink<'_, S> {
        JsonEncodeSink {
            encoder: self,
            output,
            used: false,
            closed: false,
        }
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonEncoder")
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

impl Converter for JsonEncoder {
    type Input = Value;
    type Output = String;
    type Error = JsonEncodeError;

    fn convert(&self, input: &Value) -> Result<String, JsonEncodeError> {
        let mut out = String::new();
        self.run(&mut out, input)?;
        Ok(out)
    }
}

/// Chunked JSON text encoder. Accepts exactly one value.
pub struct JsonEncodeSink<'e, S: TextSink> {
    encoder: &'e JsonEncoder,
    output: S,
    used: bool,
    closed: bool,
}

impl<S: TextSink> JsonEncodeSink<'_, S> {
    /// Encodes `value`, streaming text downstream as it is produced. On
    /// an error, text already streamed stays delivered.
    ///
    /// # Panics
    ///
    /// Panics on a second value or when the sink is closed.
    pub fn add(&mut self, value: &Value) -> Result<(), JsonEncodeError> {
        assert!(!self.closed, "add on a closed sink");
        assert!(!self.used, "a JSON encode sink accepts exactly one value");
        self.used = true;
        let mut target = SinkTarget {
            sink: &mut self.output,
        };
        self.encoder.run(&mut target, value)
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.output.close();
    }
}

/// Value to JSON UTF-8 bytes converter, buffering output internally.
pub struct JsonUtf8Encoder {
    indent: Option<String>,
    fallback: Option<Fallback>,
    buffer_size: usize,
}

impl JsonUtf8Encoder {
    pub const DEFAULT_BUFFER_SIZE: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: None,
            fallback: None,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: Some(indent.into()),
            fallback: None,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn fallback(mut self, fallback: impl Fn(&Value) -> Option<Value> + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Sets the flush granularity in bytes; sizes below one byte clamp
    /// up. Byte chunks reaching the downstream sink never exceed it.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    fn run<S: ByteSink>(&self, output: S, value: &Value) -> Result<(), JsonEncodeError> {
        let mut target = Utf8Target::new(output, self.buffer_size);
        let mut stringifier = Stringifier {
            out: &mut target,
            indent: self.indent.as_deref(),
            fallback: self.fallback.as_ref(),
            depth: 0,
            seen: Vec::new(),
        };
        stringifier.write_value(value)?;
        target.flush();
        Ok(())
    }

    /// Starts a chunked encode that accepts exactly one value and flushes
    /// byte chunks of at most the configured buffer size to `output`.
    pub fn start_chunked<S: ByteSink>(&self, output: S) -> JsonUtf8EncodeSink<'_, S> {
        JsonUtf8EncodeSink {
            encoder: self,
            output,
            used: false,
            closed: false,
        }
    }
}

impl Default for JsonUtf8Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonUtf8Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonUtf8Encoder")
            .field("indent", &self.indent)
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

impl Converter for JsonUtf8Encoder {
    type Input = Value;
    type Output = Vec<u8>;
    type Error = JsonEncodeError;

    fn convert(&self, input: &Value) -> Result<Vec<u8>, JsonEncodeError> {
        let mut out = Vec::new();
        self.run(&mut out, input)?;
        Ok(out)
    }
}

/// Chunked JSON byte encoder. Accepts exactly one value.
pub struct JsonUtf8EncodeSink<'e, S: ByteSink> {
    encoder: &'e JsonUtf8Encoder,
    output: S,
    used: bool,
    closed: bool,
}

impl<S: ByteSink> JsonUtf8EncodeSink<'_, S> {
    /// # Panics
    ///
    /// Panics on a second value or when the sink is closed.
    pub fn add(&mut self, value: &Value) -> Result<(), JsonEncodeError> {
        assert!(!self.closed, "add on a closed sink");
        assert!(!self.used, "a JSON encode sink accepts exactly one value");
        self.used = true;
        self.encoder.run(&mut self.output, value)
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.output.close();
    }
}
