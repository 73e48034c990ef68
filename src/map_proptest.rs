#![cfg(test)]

// Property tests for UnorderedMap kept inside the crate so they can check
// the anchor array and list structure after every operation.

use crate::map::UnorderedMap;
use crate::node::Handle;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Emplace(usize, i32),
    Erase(usize),
    Remove(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Rehash(usize),
    Reserve(usize),
    SetLoadFactor(u8),
    CloneCompare,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Emplace(i, v)),
            2 => idx.clone().prop_map(OpI::Erase),
            1 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => (1usize..200).prop_map(OpI::Rehash),
            1 => (1usize..200).prop_map(OpI::Reserve),
            1 => (1u8..=16).prop_map(OpI::SetLoadFactor),
            1 => Just(OpI::CloneCompare),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S>(mut sut: UnorderedMap<Key, i32, S>, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) | OpI::InsertWith(i, v) | OpI::Emplace(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let len_before = sut.len();
                let (h, inserted) = match op {
                    OpI::Insert(..) => sut.insert(k.clone(), v),
                    OpI::InsertWith(..) => sut.insert_with(k.clone(), || v),
                    _ => sut.emplace((k.clone(), v)),
                };
                prop_assert_eq!(inserted, !already, "inserted iff key was absent");
                if inserted {
                    prop_assert_eq!(sut.len(), len_before + 1);
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(sut.len(), len_before);
                    prop_assert_eq!(Some(&h), live.get(&k), "duplicate returns the existing handle");
                    prop_assert_eq!(h.value(&sut), model.get(&k), "duplicate leaves value alone");
                }
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.erase(h).expect("live handle erases");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&kk));
                    stale.push(h);
                }
                prop_assert!(sut.find(&k).is_none());
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let got = sut.remove(k.0.as_str());
                prop_assert_eq!(got, model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let s = sut.find(&k);
                prop_assert_eq!(s.is_some(), model.contains_key(&k));
                if let Some(h) = s {
                    prop_assert_eq!(Some(&h), live.get(&k));
                    prop_assert_eq!(h.key(&sut), Some(&k));
                    prop_assert_eq!(h.value(&sut), model.get(&k));
                }
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = h.value_mut(&mut sut).expect("live handle resolves");
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
            OpI::Rehash(n) => {
                sut.rehash(n);
                prop_assert!(sut.capacity() >= n);
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::Reserve(n) => {
                let before = sut.capacity();
                sut.reserve(n);
                prop_assert_eq!(sut.capacity(), before.max(n));
            }
            OpI::SetLoadFactor(q) => {
                let f = f64::from(q) / 4.0;
                sut.set_max_load_factor(f).expect("positive factor");
                let cap = sut.capacity();
                prop_assert!(sut.load_factor() <= f);
                sut.set_max_load_factor(f).expect("positive factor");
                prop_assert_eq!(sut.capacity(), cap, "same factor twice is a no-op");
            }
            OpI::CloneCompare => {
                let copy = sut.clone();
                copy.assert_invariants();
                prop_assert!(copy == sut);
                let a: Vec<_> = copy.keys().cloned().collect();
                let b: Vec<_> = sut.keys().cloned().collect();
                prop_assert_eq!(a, b, "copy preserves list order");
            }
        }

        // Post-conditions after each op
        sut.assert_invariants();
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none(), "stale handles never resolve");
        }
        for (k, &h) in &live {
            prop_assert_eq!(h.value(&sut), model.get(k), "live handles survive rehash");
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Unique keys: inserting a present key returns its handle and `false`.
// - Structure: list and anchors agree and bucket runs stay contiguous after
//   every insert, erase, rehash and load-factor change.
// - `len / capacity <= max_load_factor` after every insertion.
// - Handles survive rehash; erased handles never resolve again.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(UnorderedMap::with_capacity(4), pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares one bucket
// run, which stresses the in-run walk of find and erase.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Few-bucket variant: a low-entropy hasher with 3 distinct hashes so runs
// of several buckets interleave in the list and erase crosses run borders.
#[derive(Clone, Default)]
struct ModBuildHasher;
struct ModHasher(u64);
impl BuildHasher for ModBuildHasher {
    type Hasher = ModHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ModHasher(0)
    }
}
impl Hasher for ModHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 3
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(UnorderedMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_few_hashes((pool, ops) in arb_scenario()) {
        run_state_machine(UnorderedMap::with_hasher(ModBuildHasher), pool, ops)?;
    }
}
