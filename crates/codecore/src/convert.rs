//! The chunked-conversion protocol shared by every codec in the crate.
//!
//! A conversion has two shapes: one-shot through [`Converter::convert`],
//! and incremental through a codec-specific sink that accepts input in
//! chunks and forwards output to one of the sink traits below. The codecs
//! guarantee that feeding the same input in any chunking produces the same
//! output as the one-shot call.

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::value::Value;

/// Receives byte output in chunks.
pub trait ByteSink {
    fn add(&mut self, chunk: &[u8]);
    fn close(&mut self);

    /// Adds `chunk[start..end]`, closing the sink afterwards when
    /// `is_last` is set.
    ///
    /// # Panics
    ///
    /// Panics if `start..end` is not a valid range into `chunk`.
    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) {
        assert!(
            start <= end && end <= chunk.len(),
            "range {start}..{end} out of bounds for a chunk of {} bytes",
            chunk.len()
        );
        self.add(&chunk[start..end]);
        if is_last {
            self.close();
        }
    }
}

/// Receives text output in chunks.
pub trait TextSink {
    fn add(&mut self, chunk: &str);
    fn close(&mut self);

    /// Adds `chunk[start..end]`, closing the sink afterwards when
    /// `is_last` is set.
    ///
    /// # Panics
    ///
    /// Panics if `start..end` is out of bounds or does not fall on
    /// character boundaries.
    fn add_slice(&mut self, chunk: &str, start: usize, end: usize, is_last: bool) {
        assert!(
            start <= end && end <= chunk.len(),
            "range {start}..{end} out of bounds for a chunk of {} bytes",
            chunk.len()
        );
        self.add(&chunk[start..end]);
        if is_last {
            self.close();
        }
    }
}

/// Receives decoded values.
pub trait ValueSink {
    fn add(&mut self, value: Value);
    fn close(&mut self);
}

impl ByteSink for Vec<u8> {
    fn add(&mut self, chunk: &[u8]) {
        self.extend_from_slice(chunk);
    }

    fn close(&mut self) {}
}

impl TextSink for String {
    fn add(&mut self, chunk: &str) {
        self.push_str(chunk);
    }

    fn close(&mut self) {}
}

impl ValueSink for Vec<Value> {
    fn add(&mut self, value: Value) {
        self.push(value);
    }

    fn close(&mut self) {}
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn add(&mut self, chunk: &[u8]) {
        (**self).add(chunk);
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn add_slice(&mut self, chunk: &[u8], start: usize, end: usize, is_last: bool) {
        (**self).add_slice(chunk, start, end, is_last);
    }
}

impl<S: TextSink + ?Sized> TextSink for &mut S {
    fn add(&mut self, chunk: &str) {
        (**self).add(chunk);
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn add_slice(&mut self, chunk: &str, start: usize, end: usize, is_last: bool) {
        (**self).add_slice(chunk, start, end, is_last);
    }
}

impl<S: ValueSink + ?Sized> ValueSink for &mut S {
    fn add(&mut self, value: Value) {
        (**self).add(value);
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// A one-shot conversion from borrowed input to owned output.
pub trait Converter {
    type Input: ?Sized;
    type Output;
    type Error;

    fn convert(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

    /// Chains two converters into one that feeds this converter's output
    /// into `second`.
    ///
    /// ```
    /// use codecore::{base64, utf8, Converter};
    ///
    /// let decoder = base64::Base64Decoder::new().fuse(utf8::Utf8Decoder::new());
    /// assert_eq!(decoder.convert("aGVsbG8=").unwrap(), "hello");
    /// ```
    fn fuse<B: Converter>(self, second: B) -> Fused<Self, B>
    where
        Self: Sized,
    {
        Fused {
            first: self,
            second,
        }
    }
}

/// Two converters run back to back. Built by [`Converter::fuse`].
#[derive(Clone, Copy, Debug)]
pub struct Fused<A, B> {
    first: A,
    second: B,
}

impl<A, B> Converter for Fused<A, B>
where
    A: Converter,
    B: Converter,
    A::Output: AsRef<B::Input>,
{
    type Input = A::Input;
    type Output = B::Output;
    type Error = FuseError<A::Error, B::Error>;

    fn convert(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        let intermediate = self.first.convert(input).map_err(FuseError::First)?;
        self.second
            .convert(intermediate.as_ref())
            .map_err(FuseError::Second)
    }
}

/// Error from a fused conversion, tagged by the stage that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FuseError<E1, E2> {
    #[error("first stage: {0}")]
    First(E1),
    #[error("second stage: {0}")]
    Second(E2),
}
