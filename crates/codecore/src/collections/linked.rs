//! Insertion-ordered hash table engine.
//!
//! The same slotted arena and `HashTable` index as the unordered engine,
//! with a doubly linked list threaded through the occupied slots. New keys
//! link at the tail; overwriting a present key leaves its link untouched;
//! removing and re-inserting a key moves it to the end.

use alloc::vec::Vec;

use hashbrown::HashTable;
use hashbrown::hash_table::Entry;

use super::ConcurrentModification;
use super::equality::{KeyEquality, KeyProbe};
use super::table::MOD_MASK;

pub(crate) struct Node<K, V> {
    pub key: K,
    pub value: V,
    pub hash: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

pub(crate) enum Slot<K, V> {
    Occupied(Node<K, V>),
    Vacant(Option<usize>),
}

impl<K: Clone, V: Clone> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            hash: self.hash,
            prev: self.prev,
            next: self.next,
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

pub(crate) struct LinkedTable<K, V, E> {
    nodes: Vec<Slot<K, V>>,
    index: HashTable<usize>,
    free: Option<usize>,
    live: usize,
    mods: u32,
    first: Option<usize>,
    last: Option<usize>,
    equality: E,
}

impl<K: Clone, V: Clone, E: Clone> Clone for LinkedTable<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            free: self.free,
            live: self.live,
            mods: self.mods,
            first: self.first,
            last: self.last,
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

fn link_tail<K, V>(
    nodes: &mut [Slot<K, V>],
    first: &mut Option<usize>,
    last: &mut Option<usize>,
    i: usize,
) {
    match *last {
        Some(tail) => {
            if let Slot::Occupied(node) = &mut nodes[tail] {
                node.next = Some(i);
            }
        }
        None => *first = Some(i),
    }
    *last = Some(i);
}

impl<K, V, E> LinkedTable<K, V, E> {
    pub fn with_equality(equality: E) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashTable::new(),
            free: None,
            live: 0,
            mods: 0,
            first: None,
            last: None,
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
            first: None,
            last: None,
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

    pub fn clear(&mut self) {
        if self.live == 0 {
            return;
        }
        self.nodes.clear();
        self.index.clear();
        self.free = None;
        self.live = 0;
        self.first = None;
        self.last = None;
        self.bump();
    }

    /// Rewrites values in arena order. Not a structural change.
    pub fn update_all(&mut self, mut f: impl FnMut(&K, &mut V)) {
        for slot in &mut self.nodes {
            if let Slot::Occupied(node) = slot {
                f(&node.key, &mut node.value);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            at: self.first,
        }
    }

    pub fn into_entries(self) -> IntoIter<K, V> {
        IntoIter {
            nodes: self.nodes,
            at: self.first,
        }
    }

    pub fn cursor(&self) -> RawCursor {
        RawCursor {
            at: self.first,
            mods: self.mods,
        }
    }

    pub fn cursor_next<'a>(
        &'a self,
        cursor: &mut RawCursor,
    ) -> Result<Option<(&'a K, &'a V)>, ConcurrentModification> {
        if cursor.mods != self.mods {
            return Err(ConcurrentModification);
        }
        let Some(i) = cursor.at else {
            return Ok(None);
        };
        match self.nodes.get(i) {
            Some(Slot::Occupied(node)) => {
                cursor.at = node.next;
                Ok(Some((&node.key, &node.value)))
            }
            _ => Ok(None),
        }
    }
}

impl<K, V, E: KeyEquality<K>> LinkedTable<K, V, E> {
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

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.equality.hash_key(&key);
        let Self {
            nodes,
            index,
            free,
            live,
            mods,
            first,
            last,
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
                let node = Node {
                    key,
                    value,
                    hash,
                    prev: *last,
                    next: None,
                };
                let i = alloc_slot(nodes, free, node);
                entry.insert(i);
                link_tail(nodes, first, last, i);
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
            first,
            last,
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
                let node = Node {
                    key,
                    value: make(),
                    hash,
                    prev: *last,
                    next: None,
                };
                let i = alloc_slot(nodes, free, node);
                entry.insert(i);
                link_tail(nodes, first, last, i);
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
            first,
            last,
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
        match node.prev {
            Some(p) => {
                if let Slot::Occupied(prev_node) = &mut nodes[p] {
                    prev_node.next = node.next;
                }
            }
            None => *first = node.next,
        }
        match node.next {
            Some(n) => {
                if let Slot::Occupied(next_node) = &mut nodes[n] {
                    next_node.prev = node.prev;
                }
            }
            None => *last = node.prev,
        }
        *free = Some(i);
        *live -= 1;
        *mods = (*mods + 1) & MOD_MASK;
        Some(node.value)
    }
}

/// Borrowed iteration in insertion order.
pub(crate) struct Iter<'a, K, V> {
    nodes: &'a [Slot<K, V>],
    at: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.at?;
        match &self.nodes[i] {
            Slot::Occupied(node) => {
                self.at = node.next;
                Some((&node.key, &node.value))
            }
            Slot::Vacant(_) => None,
        }
    }
}

/// Owning iteration in insertion order.
pub(crate) struct IntoIter<K, V> {
    nodes: Vec<Slot<K, V>>,
    at: Option<usize>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.at?;
        match core::mem::replace(&mut self.nodes[i], Slot::Vacant(None)) {
            Slot::Occupied(node) => {
                self.at = node.next;
                Some((node.key, node.value))
            }
            Slot::Vacant(_) => None,
        }
    }
}

/// A detached cursor over the link chain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RawCursor {
    at: Option<usize>,
    mods: u32,
}
