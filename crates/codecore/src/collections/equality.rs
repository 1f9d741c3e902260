//! Key equality strategies for the hash-backed collections.
//!
//! A map or set fixes its strategy at construction time through a type
//! parameter; every keyed operation afterwards goes through the strategy
//! without further dispatch. Three strategies are provided: value equality
//! through `Hash + Eq` ([`DefaultEquality`]), reference identity
//! ([`IdentityEquality`]), and caller-supplied closures
//! ([`CustomEquality`]).

use alloc::rc::Rc;
use core::fmt;
use core::hash::{BuildHasher, Hash};

use hashbrown::{DefaultHashBuilder, Equivalent};

/// Hashing and equality over owned keys of a table.
pub trait KeyEquality<K> {
    /// Hashes a key about to be stored or matched.
    fn hash_key(&self, key: &K) -> u64;
    /// Compares two keys for equality under this strategy.
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

/// Hashing and equality of a lookup probe against stored keys.
///
/// Separate from [`KeyEquality`] so that the default strategy can accept
/// borrowed probes (`&str` against `String` keys) while the identity and
/// custom strategies probe with the key type itself.
pub trait KeyProbe<Q: ?Sized, K>: KeyEquality<K> {
    /// Hashes a probe; must agree with [`KeyEquality::hash_key`] for keys
    /// the probe can match.
    fn hash_probe(&self, probe: &Q) -> u64;
    /// Whether the probe matches a stored key.
    fn probe_matches(&self, probe: &Q, key: &K) -> bool;
    /// Guard applied before lookups and removals, never before insertion.
    /// A rejected probe reports "not found" without the hash or equality
    /// functions ever running.
    fn accepts_probe(&self, probe: &Q) -> bool {
        let _ = probe;
        true
    }
}

/// Value equality: `Hash + Eq`, hashed through the default hasher.
#[derive(Clone, Default)]
pub struct DefaultEquality {
    hasher: DefaultHashBuilder,
}

impl fmt::Debug for DefaultEquality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultEquality")
    }
}

impl<K: Hash + Eq> KeyEquality<K> for DefaultEquality {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

impl<K, Q> KeyProbe<Q, K> for DefaultEquality
where
    K: Hash + Eq,
    Q: Hash + Equivalent<K> + ?Sized,
{
    #[inline]
    fn hash_probe(&self, probe: &Q) -> u64 {
        self.hasher.hash_one(probe)
    }

    #[inline]
    fn probe_matches(&self, probe: &Q, key: &K) -> bool {
        probe.equivalent(key)
    }
}

/// A stable per-allocation identity, used by [`IdentityEquality`].
pub trait RefIdentity {
    /// An address-derived identity: equal ids mean the same allocation.
    fn ref_id(&self) -> usize;
}

impl<T: ?Sized> RefIdentity for Rc<T> {
    fn ref_id(&self) -> usize {
        Rc::as_ptr(self).cast::<()>() as usize
    }
}

impl<T: ?Sized> RefIdentity for &T {
    fn ref_id(&self) -> usize {
        core::ptr::from_ref::<T>(*self).cast::<()>() as usize
    }
}

/// Reference identity: two keys are equal only if they are the same
/// allocation, regardless of their contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityEquality;

fn mix_identity(id: usize) -> u64 {
    let h = (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^ (h >> 32)
}

impl<K: RefIdentity> KeyEquality<K> for IdentityEquality {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        mix_identity(key.ref_id())
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.ref_id() == b.ref_id()
    }
}

impl<K: RefIdentity> KeyProbe<K, K> for IdentityEquality {
    #[inline]
    fn hash_probe(&self, probe: &K) -> u64 {
        mix_identity(probe.ref_id())
    }

    #[inline]
    fn probe_matches(&self, probe: &K, key: &K) -> bool {
        probe.ref_id() == key.ref_id()
    }
}

/// Caller-supplied equality, hash, and optional probe-validity functions.
///
/// The closures live behind `Rc`, so the strategy (and any map built on it)
/// stays cheaply cloneable.
///
/// ```
/// use codecore::collections::{CustomEquality, HashMap};
///
/// let fold = CustomEquality::new(
///     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
///     |key: &String| {
///         key.bytes()
///             .map(|b| u64::from(b.to_ascii_lowercase()))
///             .fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ b).wrapping_mul(0x0100_0000_01b3))
///     },
/// );
/// let mut map = HashMap::with_equality(fold);
/// map.insert("Content-Length".to_string(), 42);
/// assert_eq!(map.get(&"content-length".to_string()), Some(&42));
/// ```
pub struct CustomEquality<K> {
    equals: Rc<dyn Fn(&K, &K) -> bool>,
    hash: Rc<dyn Fn(&K) -> u64>,
    valid_key: Option<Rc<dyn Fn(&K) -> bool>>,
}

impl<K> CustomEquality<K> {
    /// Builds a strategy from an equality predicate and a hash function.
    ///
    /// The two must agree: equal keys must hash identically.
    pub fn new(
        equals: impl Fn(&K, &K) -> bool + 'static,
        hash: impl Fn(&K) -> u64 + 'static,
    ) -> Self {
        Self {
            equals: Rc::new(equals),
            hash: Rc::new(hash),
            valid_key: None,
        }
    }

    /// Restricts which probes the strategy will consider on lookup and
    /// removal. Probes failing the guard report "not found" without the
    /// equality or hash functions running. Insertion is not guarded.
    #[must_use]
    pub fn with_valid_key(mut self, valid_key: impl Fn(&K) -> bool + 'static) -> Self {
        self.valid_key = Some(Rc::new(valid_key));
        self
    }
}

impl<K> Clone for CustomEquality<K> {
    fn clone(&self) -> Self {
        Self {
            equals: Rc::clone(&self.equals),
            hash: Rc::clone(&self.hash),
            valid_key: self.valid_key.clone(),
        }
    }
}

impl<K> fmt::Debug for CustomEquality<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomEquality")
    }
}

impl<K> KeyEquality<K> for CustomEquality<K> {
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        (self.equals)(a, b)
    }
}

impl<K> KeyProbe<K, K> for CustomEquality<K> {
    #[inline]
    fn hash_probe(&self, probe: &K) -> u64 {
        (self.hash)(probe)
    }

    #[inline]
    fn probe_matches(&self, probe: &K, key: &K) -> bool {
        (self.equals)(probe, key)
    }

    #[inline]
    fn accepts_probe(&self, probe: &K) -> bool {
        self.valid_key.as_ref().is_none_or(|valid| valid(probe))
    }
}
