use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;

use crate::collections::{
    ConcurrentModification, CustomEquality, HashMap, HashSet, LinkedHashMap, LinkedHashSet,
};

/// Invariant: a linked map iterates keys in first-insertion order.
#[test]
fn linked_map_iterates_in_insertion_order() {
    let mut map = LinkedHashMap::new();
    map.insert("b", 2);
    map.insert("a", 1);
    map.insert("c", 3);
    let keys: Vec<&str> = map.keys().copied().collect();
    assert_eq!(keys, ["b", "a", "c"]);
}

/// Invariant: overwriting keeps a key's position; remove plus reinsert
/// moves it to the end.
#[test]
fn overwrite_keeps_position_reinsert_moves_to_end() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    map.insert("a", 10);
    let keys: Vec<&str> = map.keys().copied().collect();
    assert_eq!(keys, ["a", "b"]);

    map.remove(&"a");
    map.insert("a", 100);
    let keys: Vec<&str> = map.keys().copied().collect();
    assert_eq!(keys, ["b", "a"]);
}

#[test]
fn string_keys_answer_str_probes() {
    let mut map = HashMap::new();
    map.insert("key".to_string(), 7);
    assert!(map.contains_key("key"));
    assert_eq!(map.get("key"), Some(&7));
    if let Some(value) = map.get_mut("key") {
        *value += 1;
    }
    assert_eq!(map.remove("key"), Some(8));
    assert!(map.is_empty());
}

#[test]
fn get_or_insert_with_runs_the_factory_once() {
    let mut map = HashMap::new();
    let mut calls = 0;
    let value = map.get_or_insert_with("k".to_string(), || {
        calls += 1;
        10
    });
    *value += 1;
    let value = map.get_or_insert_with("k".to_string(), || {
        calls += 1;
        99
    });
    assert_eq!(*value, 11);
    assert_eq!(calls, 1);
}

/// Invariant: rewriting values is not a structural change; inserting a
/// new key is.
#[test]
fn update_all_does_not_trip_cursors() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    let mut cursor = map.entries();
    assert_eq!(cursor.next(&map), Ok(Some((&"a", &1))));

    map.update_all(|_, value| *value *= 10);
    assert_eq!(cursor.next(&map), Ok(Some((&"b", &20))));

    map.insert("c", 3);
    assert_eq!(cursor.next(&map), Err(ConcurrentModification));
}

#[test]
fn overwriting_a_value_is_not_structural() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    let mut cursor = map.entries();
    map.insert("a", 2);
    assert_eq!(cursor.next(&map), Ok(Some((&"a", &2))));
}

#[test]
fn removing_an_absent_key_is_not_structural() {
    let mut map = HashMap::new();
    map.insert("a".to_string(), 1);
    let mut cursor = map.entries();
    assert_eq!(map.remove("zzz"), None);
    assert_eq!(cursor.next(&map), Ok(Some((&"a".to_string(), &1))));
}

#[test]
fn clearing_an_empty_map_is_not_structural() {
    let mut map = HashMap::new();
    let mut cursor = map.entries();
    map.clear();
    assert_eq!(cursor.next(&map), Ok(None));

    map.insert(1, 1);
    assert_eq!(cursor.next(&map), Err(ConcurrentModification));
}

#[test]
fn clearing_a_nonempty_set_trips_cursors() {
    let mut set = HashSet::new();
    set.insert(1);
    set.insert(2);
    let mut cursor = set.elements();
    assert!(cursor.next(&set).unwrap().is_some());
    set.clear();
    assert_eq!(cursor.next(&set), Err(ConcurrentModification));
}

#[test]
fn identity_equality_distinguishes_equal_contents() {
    let a = Rc::new(41);
    let b = Rc::new(41);
    let mut map = HashMap::identity();
    map.insert(Rc::clone(&a), "first");
    map.insert(Rc::clone(&b), "second");
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&a), Some(&"first"));
    assert_eq!(map.get(&b), Some(&"second"));
    assert_eq!(map.remove(&a), Some("first"));
    assert_eq!(map.len(), 1);
}

#[test]
fn identity_set_holds_distinct_allocations() {
    let a: Rc<str> = Rc::from("x");
    let b: Rc<str> = Rc::from("x");
    let mut set = HashSet::identity();
    assert!(set.insert(Rc::clone(&a)));
    assert!(set.insert(Rc::clone(&b)));
    assert!(!set.insert(Rc::clone(&a)));
    assert_eq!(set.len(), 2);
    assert!(set.contains(&b));
}

fn ascii_fold_hash(key: &String) -> u64 {
    key.bytes()
        .map(|b| u64::from(b.to_ascii_lowercase()))
        .fold(0xcbf2_9ce4_8422_2325, |h, b| {
            (h ^ b).wrapping_mul(0x0100_0000_01b3)
        })
}

#[test]
fn custom_equality_unifies_case_variants() {
    let fold =
        CustomEquality::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b), ascii_fold_hash);
    let mut map = LinkedHashMap::with_equality(fold);
    assert_eq!(map.insert("Content-Length".to_string(), 1), None);
    assert_eq!(map.insert("content-length".to_string(), 2), Some(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"CONTENT-LENGTH".to_string()), Some(&2));
}

/// Invariant: a set keeps the first stored element of an equivalence
/// class as canonical.
#[test]
fn sets_keep_the_first_element_as_canonical() {
    let fold =
        CustomEquality::new(|a: &String, b: &String| a.eq_ignore_ascii_case(b), ascii_fold_hash);
    let mut set = LinkedHashSet::with_equality(fold);
    assert!(set.insert("Apple".to_string()));
    assert!(!set.insert("APPLE".to_string()));
    assert_eq!(set.lookup(&"apple".to_string()), Some(&"Apple".to_string()));
    assert_eq!(set.len(), 1);
}

/// Invariant: the probe guard applies to lookup and removal, never to
/// insertion, and rejected probes never reach the hash function.
#[test]
fn the_probe_guard_blocks_lookups_not_insertion() {
    let hash_calls = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&hash_calls);
    let strategy = CustomEquality::new(
        |a: &i32, b: &i32| a == b,
        move |key: &i32| {
            counter.set(counter.get() + 1);
            u64::from(key.unsigned_abs())
        },
    )
    .with_valid_key(|key: &i32| *key >= 0);

    let mut map = HashMap::with_equality(strategy);
    map.insert(-1, "negative");
    assert_eq!(map.len(), 1);

    let hashes_before = hash_calls.get();
    assert!(!map.contains_key(&-1));
    assert_eq!(map.remove(&-1), None);
    assert_eq!(hash_calls.get(), hashes_before);
    assert_eq!(map.len(), 1);

    map.insert(2, "two");
    assert_eq!(map.get(&2), Some(&"two"));
}

#[test]
fn linked_set_preserves_order_through_into_iter() {
    let mut set = LinkedHashSet::new();
    set.insert(3);
    set.insert(1);
    set.insert(2);
    set.remove(&1);
    set.insert(1);
    let order: Vec<i32> = set.into_iter().collect();
    assert_eq!(order, [3, 2, 1]);
}

#[test]
fn from_iterator_and_extend_build_maps() {
    let mut map: LinkedHashMap<i32, i32> = (0..3).map(|i| (i, i * i)).collect();
    map.extend([(3, 9)]);
    let keys: Vec<i32> = map.keys().copied().collect();
    assert_eq!(keys, [0, 1, 2, 3]);
    assert_eq!(map.get(&2), Some(&4));
}

#[test]
fn clones_do_not_share_storage() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    let snapshot = map.clone();
    map.insert("b", 2);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(map.len(), 2);
}

#[test]
fn debug_renders_entries_in_order() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    assert_eq!(format!("{map:?}"), r#"{"a": 1, "b": 2}"#);
}

#[test]
fn borrowed_iteration_sees_every_entry() {
    let mut map = LinkedHashMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    let total: i32 = map.values().sum();
    assert_eq!(total, 3);
    let pairs: Vec<(&&str, &i32)> = (&map).into_iter().collect();
    assert_eq!(pairs, [(&"a", &1), (&"b", &2)]);
}

/// Invariant: arena slots of untouched entries survive removals, so an
/// unordered cursor keeps yielding entries it has not passed yet.
#[test]
fn unordered_iteration_skips_vacated_slots() {
    let mut map = HashMap::new();
    for i in 0..8 {
        map.insert(i, i * 2);
    }
    map.remove(&3);
    map.remove(&6);
    let mut seen: Vec<i32> = map.keys().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, [0, 1, 2, 4, 5, 7]);

    // A vacated slot is reused before the arena grows.
    map.insert(100, 200);
    assert_eq!(map.len(), 7);
    assert_eq!(map.get(&100), Some(&200));
}

#[test]
fn owned_iteration_consumes_the_map() {
    let mut map = HashMap::new();
    map.insert("a".to_string(), 1);
    map.insert("b".to_string(), 2);
    let mut pairs: Vec<(String, i32)> = map.into_iter().collect();
    pairs.sort();
    assert_eq!(pairs, [("a".to_string(), 1), ("b".to_string(), 2)]);
}
