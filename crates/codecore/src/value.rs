//! The dynamic value tree produced and consumed by the JSON codec.
//!
//! Containers have reference semantics: cloning a [`Value`] clones a
//! handle, and mutations through any handle are visible through all of
//! them. That makes shared and even cyclic structure constructible, which
//! the encoder detects rather than looping on.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::collections::RefIdentity;
use crate::json::Object;

/// A JSON-shaped value: null, a boolean, a double, a string, or a shared
/// handle to an array or object.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Array),
    Object(Object),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// Deep structural equality, with a same-handle fast path on containers.
/// Arrays compare elementwise in order; objects compare per key. Two
/// distinct cyclic values may not terminate; a value sharing handles with
/// itself compares fine.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl AsRef<Value> for Value {
    fn as_ref(&self) -> &Value {
        self
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::String(s)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Self::Array(array)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Array::from_vec(items))
    }
}

/// A shared, growable array of values.
#[derive(Clone, Default)]
pub struct Array {
    items: Rc<RefCell<Vec<Value>>>,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Rc::new(RefCell::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        self.items.borrow_mut()[index] = value.into();
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.items.borrow_mut().push(value.into());
    }

    pub fn pop(&self) -> Option<Value> {
        self.items.borrow_mut().pop()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        self.items.borrow_mut().insert(index, value.into());
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> Value {
        self.items.borrow_mut().remove(index)
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    /// A snapshot of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    /// Iterates over a snapshot of the current contents.
    pub fn iter(&self) -> impl Iterator<Item = Value> {
        self.to_vec().into_iter()
    }

    /// Whether two handles refer to the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.items).cast::<()>() as usize
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.items.borrow() == *other.items.borrow()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self::from_vec(items)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl RefIdentity for Array {
    fn ref_id(&self) -> usize {
        self.identity()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = Vec::new();
        fmt_value(self, f, &mut seen)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = Vec::new();
        fmt_value(&Value::Array(self.clone()), f, &mut seen)
    }
}

/// Cycle-aware rendering: a container already on the path prints as a
/// placeholder instead of recursing.
fn fmt_value(value: &Value, f: &mut fmt::Formatter<'_>, seen: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("Null"),
        Value::Bool(b) => write!(f, "Bool({b})"),
        Value::Number(n) => write!(f, "Number({n})"),
        Value::String(s) => write!(f, "String({s:?})"),
        Value::Array(array) => {
            let id = array.identity();
            if seen.contains(&id) {
                return f.write_str("Array(<cycle>)");
            }
            seen.push(id);
            f.write_str("Array([")?;
            for (i, item) in array.to_vec().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_value(item, f, seen)?;
            }
            f.write_str("])")?;
            seen.pop();
            Ok(())
        }
        Value::Object(object) => {
            let id = object.identity();
            if seen.contains(&id) {
                return f.write_str("Object({<cycle>})");
            }
            seen.push(id);
            f.write_str("Object({")?;
            for (i, (key, item)) in object.snapshot().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key:?}: ")?;
                fmt_value(item, f, seen)?;
            }
            f.write_str("})")?;
            seen.pop();
            Ok(())
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let seen = RefCell::new(Vec::new());
        SerializeGuard { value: self, seen: &seen }.serialize(serializer)
    }
}

/// Serializes one node, refusing paths that revisit a container.
struct SerializeGuard<'a> {
    value: &'a Value,
    seen: &'a RefCell<Vec<usize>>,
}

impl serde::Serialize for SerializeGuard<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error as _, SerializeMap, SerializeSeq};
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(array) => {
                let id = array.identity();
                if self.seen.borrow().contains(&id) {
                    return Err(S::Error::custom("cyclic structure"));
                }
                self.seen.borrow_mut().push(id);
                let items = array.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(&SerializeGuard {
                        value: item,
                        seen: self.seen,
                    })?;
                }
                let ok = seq.end()?;
                self.seen.borrow_mut().pop();
                Ok(ok)
            }
            Value::Object(object) => {
                let id = object.identity();
                if self.seen.borrow().contains(&id) {
                    return Err(S::Error::custom("cyclic structure"));
                }
                self.seen.borrow_mut().push(id);
                let entries = object.snapshot();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in &entries {
                    map.serialize_entry(
                        key,
                        &SerializeGuard {
                            value: item,
                            seen: self.seen,
                        },
                    )?;
                }
                let ok = map.end()?;
                self.seen.borrow_mut().pop();
                Ok(ok)
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(crate::json::raw_to_value(crate::json::RawValue::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn deep_equality_ignores_handle_identity() {
        let a = Value::from(vec![Value::from(1.0), Value::from("x")]);
        let b = Value::from(vec![Value::from(1.0), Value::from("x")]);
        assert_eq!(a, b);
        assert_ne!(a, Value::from(vec![Value::from(1.0)]));
    }

    #[test]
    fn clone_is_a_handle() {
        let array = Array::new();
        let alias = array.clone();
        array.push(true);
        assert_eq!(alias.len(), 1);
        assert!(array.ptr_eq(&alias));
    }

    #[test]
    fn debug_renders_cycles_as_placeholder() {
        use alloc::format;
        let array = Array::new();
        array.push(Value::Array(array.clone()));
        let rendered = format!("{array:?}");
        assert_eq!(rendered, "Array([Array(<cycle>)])");
    }

    #[test]
    fn number_equality_is_ieee() {
        assert_eq!(Value::from(0.0), Value::from(-0.0));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }
}
