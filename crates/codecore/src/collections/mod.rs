//! Hash-backed maps and sets with pluggable key equality.
//!
//! Two engines back four façades. [`HashMap`] and [`HashSet`] iterate in
//! arena order with no promise beyond "entries you did not touch stay
//! where they were"; [`LinkedHashMap`] and [`LinkedHashSet`] maintain a
//! doubly linked list through their entries and iterate in insertion
//! order. All four take an equality strategy as a type parameter,
//! defaulting to plain `Hash + Eq` value equality.
//!
//! Iteration comes in two shapes. The `Iterator` implementations borrow
//! the collection for their whole lifetime, so the borrow checker rules
//! out mutation mid-walk. The detached cursors returned by `entries` and
//! `elements` instead re-present the collection at every step and return
//! [`ConcurrentModification`] once it has been structurally modified,
//! which is the contract mirrored by the JSON object views in this crate.
//! Structural means inserting a new key, removing a present one, or
//! clearing a non-empty collection; overwriting a value is not.
//!
//! ```
//! use codecore::collections::LinkedHashMap;
//!
//! let mut map = LinkedHashMap::new();
//! map.insert("b", 2);
//! map.insert("a", 1);
//! map.insert("b", 20);
//! let keys: Vec<&&str> = map.keys().collect();
//! assert_eq!(keys, [&"b", &"a"]);
//!
//! let mut cursor = map.entries();
//! assert_eq!(cursor.next(&map), Ok(Some((&"b", &20))));
//! map.remove(&"a");
//! assert!(cursor.next(&map).is_err());
//! ```

use thiserror::Error;

pub mod equality;
mod linked;
pub mod map;
pub mod set;
mod table;

pub use equality::{
    CustomEquality, DefaultEquality, IdentityEquality, KeyEquality, KeyProbe, RefIdentity,
};
pub use map::{HashMap, LinkedHashMap};
pub use set::{HashSet, LinkedHashSet};

/// A detached cursor was stepped after its collection changed shape.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("collection was modified during iteration")]
pub struct ConcurrentModification;
