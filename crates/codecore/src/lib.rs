//! Data-interchange codecs and hash-backed collections for a dynamic
//! value model.
//!
//! Three codecs share one conversion protocol: JSON between text and a
//! reference-semantics [`Value`] tree, UTF-8 between bytes and text with
//! chunk-resumable state, and Base64 in the standard and URL-safe
//! alphabets. Each works one-shot through [`Converter::convert`] or
//! incrementally through chunked sinks, and converters chain with
//! [`Converter::fuse`]. Alongside them, [`collections`] provides hash
//! maps and sets with pluggable key equality and detached cursors that
//! detect concurrent modification.
//!
//! ```
//! use codecore::{json, Value};
//!
//! let value = json::decode(r#"{"name": "tide", "depth": 3}"#)?;
//! let object = value.as_object().unwrap();
//! assert_eq!(object.get("name"), Some(Value::from("tide")));
//!
//! let text = json::encode(&value)?;
//! assert_eq!(text, r#"{"name":"tide","depth":3}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![no_std]
#![allow(missing_docs)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod base64;
pub mod collections;
pub mod convert;
pub mod json;
pub mod utf8;
mod value;

#[cfg(test)]
mod tests;

pub use collections::{ConcurrentModification, HashMap, HashSet, LinkedHashMap, LinkedHashSet};
pub use convert::{ByteSink, Converter, FuseError, Fused, TextSink, ValueSink};
pub use json::Object;
pub use value::{Array, Value};
