//! The JSON codec.
//!
//! Decoding parses the full text up front but materializes values
//! lazily: the root of a decoded object keeps its members in the parser's
//! raw form until each is first read, which makes plucking a couple of
//! fields out of a large document cheap. Reads convert and cache; the
//! first mutation converts everything at once. Decoding with a reviver
//! closure skips laziness entirely, since the reviver must see every
//! value anyway.
//!
//! Encoding walks the value tree with a cycle stack, escapes control
//! characters, the quote and the backslash, and prints finite doubles in
//! their shortest round-trip form, so `decode(encode(v))` reproduces `v`
//! exactly. Non-finite numbers have no JSON form; an optional fallback
//! closure may substitute an encodable value for them. Output can be
//! text, or UTF-8 bytes flushed through a fixed-size buffer when the
//! destination wants bytes anyway.
//!
//! ```
//! use codecore::{json, Value};
//!
//! let value = json::decode(r#"{"name": "tide", "depth": 3}"#)?;
//! let object = value.as_object().unwrap();
//! assert_eq!(object.get("depth"), Some(Value::from(3.0)));
//!
//! object.insert("depth", 4.0);
//! assert_eq!(json::encode(&value)?, r#"{"name":"tide","depth":4}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decode;
mod encode;
mod object;
mod raw;

pub use decode::{
    JsonDecodeError, JsonDecodeSink, JsonDecoder, ReviverKey, decode, decode_utf8, decode_with,
};
pub use encode::{
    JsonEncodeError, JsonEncodeSink, JsonEncoder, JsonUtf8EncodeSink, JsonUtf8Encoder, encode,
    encode_pretty, encode_to_bytes,
};
pub use object::{Object, ObjectEntries};

pub(crate) use decode::raw_to_value;
pub(crate) use raw::RawValue;
