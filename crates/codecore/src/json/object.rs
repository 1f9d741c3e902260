//! Shared JSON objects with deferred member conversion.
//!
//! An object decoded from JSON starts out lazy: members are stored as the
//! parser's raw tree and converted to [`Value`]s one at a time on first
//! read. Converting a member caches the result in place and is not a
//! structural change, so live cursors survive it. The first mutation
//! upgrades the whole object (every remaining raw member is converted),
//! after which it behaves like one built by hand.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::collections::map::OrderedEntries;
use crate::collections::{ConcurrentModification, LinkedHashMap, RefIdentity};
use crate::json::decode::raw_to_value;
use crate::json::raw::RawValue;
use crate::value::Value;

/// One member: either converted and cached, or still the parser's tree.
pub(crate) enum Slot {
    Ready(Value),
    Raw(RawValue),
}

pub(crate) struct ObjectRepr {
    entries: LinkedHashMap<String, Slot>,
    lazy: bool,
}

/// A shared, insertion-ordered string-keyed map of values.
///
/// Cloning clones a handle: all clones observe the same entries. The
/// non-string-key problem of general maps does not arise here, keys are
/// `String` by construction.
#[derive(Clone)]
pub struct Object {
    inner: Rc<RefCell<ObjectRepr>>,
}

fn force_slot(slot: &mut Slot) {
    if let Slot::Raw(_) = slot {
        let Slot::Raw(raw) = core::mem::replace(slot, Slot::Ready(Value::Null)) else {
            return;
        };
        *slot = Slot::Ready(raw_to_value(raw));
    }
}

fn into_value(slot: Slot) -> Value {
    match slot {
        Slot::Ready(value) => value,
        Slot::Raw(raw) => raw_to_value(raw),
    }
}

/// Converts every remaining raw member in place. Value rewrites are not
/// structural, so this never trips cursors by itself.
fn upgrade(repr: &mut ObjectRepr) {
    if repr.lazy {
        repr.entries.update_all(|_, slot| force_slot(slot));
        repr.lazy = false;
    }
}

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObjectRepr {
                entries: LinkedHashMap::new(),
                lazy: false,
            })),
        }
    }

    /// Builds an eager object from ordered entries. A repeated key keeps
    /// its first position and last value.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let object = Self::new();
        {
            let mut repr = object.inner.borrow_mut();
            for (key, value) in entries {
                repr.entries.insert(key, Slot::Ready(value));
            }
        }
        object
    }

    pub(crate) fn from_raw_entries(raw: Vec<(String, RawValue)>) -> Self {
        let mut entries = LinkedHashMap::with_capacity(raw.len());
        for (key, value) in raw {
            entries.insert(key, Slot::Raw(value));
        }
        Self {
            inner: Rc::new(RefCell::new(ObjectRepr { entries, lazy: true })),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Key presence, answered without converting anything.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// The keys in insertion order, without converting anything.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Looks up a member, converting and caching it on first access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut repr = self.inner.borrow_mut();
        let slot = repr.entries.get_mut(key)?;
        force_slot(slot);
        match slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Raw(_) => None,
        }
    }

    /// Inserts or overwrites a member, upgrading the object first.
    /// Returns the previous value when the key was present.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let mut repr = self.inner.borrow_mut();
        upgrade(&mut repr);
        repr.entries
            .insert(key.into(), Slot::Ready(value.into()))
            .map(into_value)
    }

    /// Removes a member, upgrading the object first.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut repr = self.inner.borrow_mut();
        upgrade(&mut repr);
        repr.entries.remove(key).map(into_value)
    }

    pub fn clear(&self) {
        let mut repr = self.inner.borrow_mut();
        repr.entries.clear();
        repr.lazy = false;
    }

    /// Starts a detached cursor over the members in insertion order.
    /// Stepping it converts the member it lands on; stepping it after a
    /// structural change reports [`ConcurrentModification`].
    #[must_use]
    pub fn entries(&self) -> ObjectEntries {
        ObjectEntries {
            cursor: self.inner.borrow().entries.entries(),
        }
    }

    /// Whether two handles refer to the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }

    /// Converts every member and snapshots the entries in order. The
    /// borrow is released before returning, so callers may re-enter.
    pub(crate) fn snapshot(&self) -> Vec<(String, Value)> {
        let mut repr = self.inner.borrow_mut();
        repr.entries.update_all(|_, slot| force_slot(slot));
        let mut out = Vec::with_capacity(repr.entries.len());
        for (key, slot) in repr.entries.iter() {
            if let Slot::Ready(value) = slot {
                out.push((key.clone(), value.clone()));
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn is_lazy(&self) -> bool {
        self.inner.borrow().lazy
    }

    #[cfg(test)]
    pub(crate) fn slot_is_raw(&self, key: &str) -> bool {
        matches!(self.inner.borrow().entries.get(key), Some(Slot::Raw(_)))
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

/// Order-insensitive per-key deep equality, with a same-handle fast path.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        for key in self.keys() {
            match (self.get(&key), other.get(&key)) {
                (Some(a), Some(b)) if a == b => {}
                _ => return false,
            }
        }
        true
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl RefIdentity for Object {
    fn ref_id(&self) -> usize {
        self.identity()
    }
}

impl core::fmt::Debug for Object {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

/// Detached cursor over an [`Object`].
pub struct ObjectEntries {
    cursor: OrderedEntries,
}

impl ObjectEntries {
    /// Advances to the next member, converting it if still raw.
    pub fn next(
        &mut self,
        object: &Object,
    ) -> Result<Option<(String, Value)>, ConcurrentModification> {
        let key = {
            let repr = object.inner.borrow();
            match self.cursor.next(&repr.entries)? {
                Some((key, _)) => key.clone(),
                None => return Ok(None),
            }
        };
        Ok(object.get(&key).map(|value| (key, value)))
    }
}
