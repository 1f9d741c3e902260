//! Map façades over the table engines.

use core::fmt;
use core::hash::Hash;

use super::ConcurrentModification;
use super::equality::{DefaultEquality, IdentityEquality, KeyEquality, KeyProbe};
use super::linked::LinkedTable;
use super::table::Table;
use super::{linked, table};

/// A hash map with a pluggable equality strategy and no iteration-order
/// guarantee beyond "untouched entries stay put".
pub struct HashMap<K, V, E = DefaultEquality> {
    table: Table<K, V, E>,
}

/// A hash map that iterates in key insertion order.
///
/// Overwriting a value keeps the key's position; removing a key and
/// inserting it again moves it to the end.
pub struct LinkedHashMap<K, V, E = DefaultEquality> {
    table: LinkedTable<K, V, E>,
}

impl<K: Clone, V: Clone, E: Clone> Clone for HashMap<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K: Clone, V: Clone, E: Clone> Clone for LinkedHashMap<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

macro_rules! map_impl {
    ($map:ident, $engine:ident, $iter:ident, $into_iter:ident, $cursor:ident) => {
        impl<K, V> $map<K, V> {
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

        impl<K, V> $map<K, V, IdentityEquality> {
            /// A map keyed by reference identity rather than value equality.
            #[must_use]
            pub fn identity() -> Self {
                Self {
                    table: $engine::with_equality(IdentityEquality),
                }
            }
        }

        impl<K, V, E> $map<K, V, E> {
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

            /// Applies `f` to every value in place without invalidating
            /// live cursors.
            pub fn update_all(&mut self, f: impl FnMut(&K, &mut V)) {
                self.table.update_all(f);
            }

            pub fn iter(&self) -> $iter<'_, K, V> {
                $iter {
                    inner: self.table.iter(),
                }
            }

            pub fn keys<'a>(&'a self) -> impl Iterator<Item = &'a K> {
                self.iter().map(|(key, _)| key)
            }

            pub fn values<'a>(&'a self) -> impl Iterator<Item = &'a V> {
                self.iter().map(|(_, value)| value)
            }

            /// Starts a detached cursor. Stepping it after a structural
            /// change to the map reports [`ConcurrentModification`].
            pub fn entries(&self) -> $cursor {
                $cursor {
                    raw: self.table.cursor(),
                }
            }
        }

        impl<K, V, E: KeyEquality<K>> $map<K, V, E> {
            pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
            where
                E: KeyProbe<Q, K>,
            {
                self.table.contains_key(key)
            }

            pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
            where
                E: KeyProbe<Q, K>,
            {
                self.table.get(key)
            }

            pub fn get_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<&mut V>
            where
                E: KeyProbe<Q, K>,
            {
                self.table.get_mut(key)
            }

            /// Returns the previous value when `key` was already present.
            pub fn insert(&mut self, key: K, value: V) -> Option<V> {
                self.table.insert(key, value)
            }

            pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
                self.table.get_or_insert_with(key, make)
            }

            pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
            where
                E: KeyProbe<Q, K>,
            {
                self.table.remove(key)
            }
        }

        impl<K, V, E: KeyEquality<K> + Default> Default for $map<K, V, E> {
            fn default() -> Self {
                Self::with_equality(E::default())
            }
        }

        impl<K: fmt::Debug, V: fmt::Debug, E> fmt::Debug for $map<K, V, E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map().entries(self.iter()).finish()
            }
        }

        impl<K, V, E: KeyEquality<K>> Extend<(K, V)> for $map<K, V, E> {
            fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
                for (key, value) in iter {
                    self.insert(key, value);
                }
            }
        }

        impl<K: Hash + Eq, V> FromIterator<(K, V)> for $map<K, V> {
            fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
                let mut map = Self::new();
                map.extend(iter);
                map
            }
        }

        impl<'a, K, V, E> IntoIterator for &'a $map<K, V, E> {
            type Item = (&'a K, &'a V);
            type IntoIter = $iter<'a, K, V>;

            fn into_iter(self) -> Self::IntoIter {
                self.iter()
            }
        }

        impl<K, V, E> IntoIterator for $map<K, V, E> {
            type Item = (K, V);
            type IntoIter = $into_iter<K, V>;

            fn into_iter(self) -> Self::IntoIter {
                $into_iter {
                    inner: self.table.into_entries(),
                }
            }
        }
    };
}

map_impl!(HashMap, Table, Iter, IntoIter, Entries);
map_impl!(LinkedHashMap, LinkedTable, OrderedIter, OrderedIntoIter, OrderedEntries);

pub struct Iter<'a, K, V> {
    inner: table::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct IntoIter<K, V> {
    inner: table::IntoIter<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct OrderedIter<'a, K, V> {
    inner: linked::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for OrderedIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

pub struct OrderedIntoIter<K, V> {
    inner: linked::IntoIter<K, V>,
}

impl<K, V> Iterator for OrderedIntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Detached cursor over a [`HashMap`]. Each step re-presents the map and
/// fails once the map has seen a structural change.
#[derive(Clone, Copy, Debug)]
pub struct Entries {
    raw: table::RawCursor,
}

impl Entries {
    pub fn next<'a, K, V, E>(
        &mut self,
        map: &'a HashMap<K, V, E>,
    ) -> Result<Option<(&'a K, &'a V)>, ConcurrentModification> {
        map.table.cursor_next(&mut self.raw)
    }
}

/// Detached cursor over a [`LinkedHashMap`], yielding insertion order.
#[derive(Clone, Copy, Debug)]
pub struct OrderedEntries {
    raw: linked::RawCursor,
}

impl OrderedEntries {
    pub fn next<'a, K, V, E>(
        &mut self,
        map: &'a LinkedHashMap<K, V, E>,
    ) -> Result<Option<(&'a K, &'a V)>, ConcurrentModification> {
        map.table.cursor_next(&mut self.raw)
    }
}
