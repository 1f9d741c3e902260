//! Set façades over the table engines. A set is a map from elements to
//! nothing; the first stored element of an equivalence class is canonical
//! and survives later insertions of equal elements.

use core::fmt;
use core::hash::Hash;

use super::ConcurrentModification;
use super::equality::{DefaultEquality, IdentityEquality, KeyEquality, KeyProbe};
use super::linked::LinkedTable;
use super::table::Table;
use super::{linked, table};

/// A hash set with a pluggable equality strategy.
pub struct HashSet<T, E = DefaultEquality> {
    table: Table<T, (), E>,
}

/// A hash set that iterates in element insertion order.
pub struct LinkedHashSet<T, E = DefaultEquality> {
    table: LinkedTable<T, (), E>,
}

impl<T: Clone, E: Clone> Clone for HashSet<T, E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Clone, E: Clone> Clone for LinkedHashSet<T, E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

macro_rules! set_impl {
    ($set:ident, $engine:ident, $iter:ident, $into_iter:ident, $cursor:ident) => {
        impl<T> $set<T> {
            #[must_use]
            pub fn new() -> Self {
                Self {
                    table: $engine::with_equality(DefaultEquality::default()),
                }
            }

            #[must_use]
            pub fn with_capacity(capacity: usize) -> Self {
                Self {
                    table: $engine::with_capacity(DefaultEquality::default(), capacity),
                }
            }
        }

        impl<T> $set<T, IdentityEquality> {
            /// A set of distinct allocations rather than distinct values.
            #[must_use]
            pub fn identity() -> Self {
                Self {
                    table: $engine::with_equality(IdentityEquality),
                }
            }
        }

        impl<T, E> $set<T, E> {
            pub fn with_equality(equality: E) -> Self {
                Self {
                    table: $engine::with_equality(equality),
                }
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.table.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.table.is_empty()
            }

            pub fn clear(&mut self) {
                self.table.clear();
            }

            pub fn iter(&self) -> $iter<'_, T> {
                $iter {
                    inner: self.table.iter(),
                }
            }

            /// Starts a detached cursor over the elements.
            pub fn elements(&self) -> $cursor {
                $cursor {
                    raw: self.table.cursor(),
                }
            }
        }

        impl<T, E: KeyEquality<T>> $set<T, E> {
            /// Adds `value`; returns whether the set grew. When an equal
            /// element is already present the stored element is kept and
            /// `value` is dropped.
            pub fn insert(&mut self, value: T) -> bool {
                self.table.insert(value, ()).is_none()
            }

            pub fn contains<Q: ?Sized>(&self, value: &Q) -> bool
            where
                E: KeyProbe<Q, T>,
            {
                self.table.contains_key(value)
            }

            /// Returns the stored element equal to `value`, if any.
            pub fn lookup<Q: ?Sized>(&self, value: &Q) -> Option<&T>
            where
                E: KeyProbe<Q, T>,
            {
                self.table.get_entry(value).map(|(element, ())| element)
            }

            pub fn remove<Q: ?Sized>(&mut self, value: &Q) -> bool
            where
                E: KeyProbe<Q, T>,
            {
                self.table.remove(value).is_some()
            }
        }

        impl<T, E: KeyEquality<T> + Default> Default for $set<T, E> {
            fn default() -> Self {
                Self::with_equality(E::default())
            }
        }

        impl<T: fmt::Debug, E> fmt::Debug for $set<T, E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set().entries(self.iter()).finish()
            }
        }

        impl<T, E: KeyEquality<T>> Extend<T> for $set<T, E> {
            fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
                for value in iter {
                    self.insert(value);
                }
            }
        }

        impl<T: Hash + Eq> FromIterator<T> for $set<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut set = Self::new();
                set.extend(iter);
                set
            }
        }

        impl<'a, T, E> IntoIterator for &'a $set<T, E> {
            type Item = &'a T;
            type IntoIter = $iter<'a, T>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }

        impl<T, E> IntoIterator for $set<T, E> {
            type Item = T;
            type IntoIter = $into_iter<T>;

            fn into_iter(self) -> Self::IntoIter {
                $into_iter {
                    inner: self.table.into_entries(),
                }
            }
        }
    };
}

set_impl!(HashSet, Table, Iter, IntoIter, Elements);
set_impl!(LinkedHashSet, LinkedTable, OrderedIter, OrderedIntoIter, OrderedElements);

pub struct Iter<'a, T> {
    inner: table::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }
}

pub struct IntoIter<T> {
    inner: table::IntoIter<T, ()>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }
}

pub struct OrderedIter<'a, T> {
    inner: linked::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for OrderedIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }
}

pub struct OrderedIntoIter<T> {
    inner: linked::IntoIter<T, ()>,
}

impl<T> Iterator for OrderedIntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }
}

/// Detached cursor over a [`HashSet`].
#[derive(Clone, Copy, Debug)]
pub struct Elements {
    raw: table::RawCursor,
}

impl Elements {
    pub fn next<'a, T, E>(
        &mut self,
        set: &'a HashSet<T, E>,
    ) -> Result<Option<&'a T>, ConcurrentModification> {
        Ok(set.table.cursor_next(&mut self.raw)?.map(|(element, ())| element))
    }
}

/// Detached cursor over a [`LinkedHashSet`], yielding insertion order.
#[derive(Clone, Copy, Debug)]
pub struct OrderedElements {
    raw: linked::RawCursor,
}

impl OrderedElements {
    pub fn next<'a, T, E>(
        &mut self,
        set: &'a LinkedHashSet<T, E>,
    ) -> Result<Option<&'a T>, ConcurrentModification> {
        Ok(set.table.cursor_next(&mut self.raw)?.map(|(element, ())| element))
    }
}
