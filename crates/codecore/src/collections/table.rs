//! Unordered hash table engine: a slotted arena of entries plus a
//! `hashbrown::HashTable` index mapping hashes to arena positions.
//!
//! Vacated slots go on an intrusive free list and are reused before the
//! arena grows, so a slot index stays valid for the lifetime of its entry.
//! Iteration scans the arena, which keeps positions of untouched entries
//! stable across removals of other entries.

use alloc::vec::Vec;

use hashbrown::HashTable;
use hashbrown::hash_table::Entry;

use super::ConcurrentModification;
use super::equality::{KeyEquality, KeyProbe};

/// Modification counters wrap here rather than at the integer boundary.
pub(crate) const MOD_MASK: u32 = (1 << 30) - 1;

pub(crate) struct Node<K, V> {
    pub key: K,
    pub value: V,
    pub hash: u64,
}

pub(crate) enum Slot<K, V> {
    Occupied(Node<K, V>),
    /// Free slot, holding the next index on the free list.
    Vacant(Option<usize>),
}

impl<K: Clone, V: Clone> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            hash: self.hash,
        }
    }
}

impl<K: Clone, V: Clone> Clone for Slot<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Occupied(node) => Self::Occupied(node.clone()),
            Self::Vacant(next) => Self::Vacant(*next),
        }
    }
}

pub(crate) struct Table<K, V, E> {
    nodes: Vec<Slot<K, V>>,
    index: HashTable<usize>,
    free: Option<usize>,
    live: usize,
    mods: u32,
    equality: E,
}

impl<K: Clone, V: Clone, E: Clone> Clone for Table<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            free: self.free,
            live: self.live,
            mods: self.mods,
            equality: self.equality.clone(),
        }
    }
}

fn alloc_slot<K, V>(
    nodes: &mut Vec<Slot<K, V>>,
    free: &mut Option<usize>,
    node: Node<K, V>,
) -> usize {
    match free.take() {
        Some(i) => {
            if let Slot::Vacant(next) = &nodes[i] {
                *free = *next;
            }
            nodes[i] = Slot::Occupied(node);
            i
        }
        None => {
            nodes.push(Slot::Occupied(node));
            nodes.len() - 1
        }
    }
}

impl<K, V, E> Table<K, V, E> {
    pub fn with_equality(equality: E) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashTable::new(),
            free: None,
            live: 0,
            mods: 0,
            equality,
        }
    }

    pub fn with_capacity(equality: E, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashTable::with_capacity(capacity),
            free: None,
            live: 0,
            mods: 0,
            equality,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn bump(&mut self) {
        self.mods = (self.mods + 1) & MOD_MASK;
    }

    /// Removing every entry is one structural change; clearing an empty
    /// table is not a change at all.
    pub fn clear(&mut self) {
        if self.live == 0 {
            return;
        }
        self.nodes.clear();
        self.index.clear();
        self.free = None;
        self.live = 0;
        self.bump();
    }

    /// Rewrites every value in place. Not a structural change: entry
    /// positions and live cursors are unaffected.
    pub fn update_all(&mut self, mut f: impl FnMut(&K, &mut V)) {
        for slot in &mut self.nodes {
            if let Slot::Occupied(node) = slot {
                f(&node.key, &mut node.value);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.nodes.iter(),
        }
    }

    pub fn into_entries(self) -> IntoIter<K, V> {
        IntoIter {
            slots: self.nodes.into_iter(),
        }
    }

    pub fn cursor(&self) -> RawCursor {
        RawCursor {
            at: 0,
            mods: self.mods,
        }
    }

    /// Advances a detached cursor. Fails if the table saw a structural
    /// change after the cursor was created.
    pub fn cursor_next<'a>(
        &'a self,
        cursor: &mut RawCursor,
    ) -> Result<Option<(&'a K, &'a V)>, ConcurrentModification> {
        if cursor.mods != self.mods {
            return Err(ConcurrentModification);
        }
        while cursor.at < self.nodes.len() {
            let i = cursor.at;
            cursor.at += 1;
            if let Slot::Occupied(node) = &self.nodes[i] {
                return Ok(Some((&node.key, &node.value)));
            }
        }
        Ok(None)
    }
}

impl<K, V, E: KeyEquality<K>> Table<K, V, E> {
    fn find_index<Q: ?Sized>(&self, key: &Q) -> Option<usize>
    where
        E: KeyProbe<Q, K>,
    {
        if self.live == 0 || !self.equality.accepts_probe(key) {
            return None;
        }
        let hash = self.equality.hash_probe(key);
        let nodes = &self.nodes;
        let equality = &self.equality;
        self.index
            .find(hash, |&i| match &nodes[i] {
                Slot::Occupied(node) => equality.probe_matches(key, &node.key),
                Slot::Vacant(_) => false,
            })
            .copied()
    }

    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        E: KeyProbe<Q, K>,
    {
        self.find_index(key).is_some()
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        E: KeyProbe<Q, K>,
    {
        let i = self.find_index(key)?;
        match &self.nodes[i] {
            Slot::Occupied(node) => Some(&node.value),
            Slot::Vacant(_) => None,
        }
    }

    pub fn get_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<&mut V>
    where
        E: KeyProbe<Q, K>,
    {
        let i = self.find_index(key)?;
        match &mut self.nodes[i] {
            Slot::Occupied(node) => Some(&mut node.value),
            Slot::Vacant(_) => None,
        }
    }

    pub fn get_entry<Q: ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        E: KeyProbe<Q, K>,
    {
        let i = self.find_index(key)?;
        match &self.nodes[i] {
            Slot::Occupied(node) => Some((&node.key, &node.value)),
            Slot::Vacant(_) => None,
        }
    }

    /// Inserts or overwrites. Overwriting an existing key replaces the
    /// value but keeps the stored key and is not a structural change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.equality.hash_key(&key);
        let Self {
            nodes,
            index,
            free,
            live,
            mods,
            equality,
        } = self;
        match index.entry(
            hash,
            |&i| match &nodes[i] {
                Slot::Occupied(node) => equality.keys_equal(&node.key, &key),
                Slot::Vacant(_) => false,
            },
            |&i| match &nodes[i] {
                Slot::Occupied(node) => node.hash,
                Slot::Vacant(_) => 0,
            },
        ) {
            Entry::Occupied(entry) => {
                let i = *entry.get();
                match &mut nodes[i] {
                    Slot::Occupied(node) => Some(core::mem::replace(&mut node.value, value)),
                    Slot::Vacant(_) => None,
                }
            }
            Entry::Vacant(entry) => {
                let i = alloc_slot(nodes, free, Node { key, value, hash });
                entry.insert(i);
                *live += 1;
                *mods = (*mods + 1) & MOD_MASK;
                None
            }
        }
    }

    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let hash = self.equality.hash_key(&key);
        let Self {
            nodes,
            index,
            free,
            live,
            mods,
            equality,
        } = self;
        let i = match index.entry(
            hash,
            |&i| match &nodes[i] {
                Slot::Occupied(node) => equality.keys_equal(&node.key, &key),
                Slot::Vacant(_) => false,
            },
            |&i| match &nodes[i] {
                Slot::Occupied(node) => node.hash,
                Slot::Vacant(_) => 0,
            },
        ) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let i = alloc_slot(
                    nodes,
                    free,
                    Node {
                        key,
                        value: make(),
                        hash,
                    },
                );
                entry.insert(i);
                *live += 1;
                *mods = (*mods + 1) & MOD_MASK;
                i
            }
        };
        match &mut nodes[i] {
            Slot::Occupied(node) => &mut node.value,
            Slot::Vacant(_) => unreachable!("slot at a freshly resolved index is occupied"),
        }
    }

    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        E: KeyProbe<Q, K>,
    {
        if self.live == 0 || !self.equality.accepts_probe(key) {
            return None;
        }
        let hash = self.equality.hash_probe(key);
        let Self {
            nodes,
            index,
            free,
            live,
            mods,
            equality,
        } = self;
        let entry = index
            .find_entry(hash, |&i| match &nodes[i] {
                Slot::Occupied(node) => equality.probe_matches(key, &node.key),
                Slot::Vacant(_) => false,
            })
            .ok()?;
        let (i, _) = entry.remove();
        let Slot::Occupied(node) = core::mem::replace(&mut nodes[i], Slot::Vacant(*free)) else {
            return None;
        };
        *free = Some(i);
        *live -= 1;
        *mods = (*mods + 1) & MOD_MASK;
        Some(node.value)
    }
}

/// Borrowed arena-order iteration.
pub(crate) struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(node) = slot {
                return Some((&node.key, &node.value));
            }
        }
        None
    }
}

pub(crate) struct IntoIter<K, V> {
    slots: alloc::vec::IntoIter<Slot<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(node) = slot {
                return Some((node.key, node.value));
            }
        }
        None
    }
}

/// Position of a detached cursor: an arena offset plus the modification
/// count it was created under.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawCursor {
    at: usize,
    mods: u32,
}
