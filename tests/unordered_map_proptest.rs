use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use unordered_map::UnorderedMap;

fn runs_are_contiguous(m: &UnorderedMap<u16, u32>) -> bool {
    let mut seen = BTreeSet::new();
    let mut current = None;
    for h in m.handles() {
        let b = h.bucket(m).expect("listed handle resolves");
        if current != Some(b) {
            if !seen.insert(b) {
                return false;
            }
            current = Some(b);
        }
    }
    true
}

// Random insert/remove/load-factor sequences through the public API only.
// After every step the map agrees with a std HashMap, iteration yields each
// element once, bucket runs are contiguous and the load factor holds.
proptest! {
    #[test]
    fn prop_public_api_matches_model(
        initial in 1usize..16,
        ops in proptest::collection::vec((0u8..=3u8, 0u16..64u16, any::<u32>()), 1..200),
    ) {
        let mut m: UnorderedMap<u16, u32> = UnorderedMap::with_capacity(initial);
        let mut model: HashMap<u16, u32> = HashMap::new();

        for (op, k, v) in ops {
            match op {
                0 | 1 => {
                    let (_, inserted) = m.insert(k, v);
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                    prop_assert!(m.load_factor() <= m.max_load_factor());
                }
                2 => {
                    prop_assert_eq!(m.remove(&k), model.remove(&k));
                }
                3 => {
                    let f = f64::from(v % 8 + 1) / 4.0;
                    m.set_max_load_factor(f).expect("positive factor");
                    prop_assert!(m.load_factor() <= f);
                }
                _ => unreachable!(),
            }

            prop_assert_eq!(m.len(), model.len());
            let mut listed: Vec<(u16, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
            listed.sort_unstable();
            let mut expected: Vec<(u16, u32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
            expected.sort_unstable();
            prop_assert_eq!(listed, expected);
            prop_assert!(runs_are_contiguous(&m));
            let total: usize = (0..m.capacity()).map(|b| m.bucket_len(b)).sum();
            prop_assert_eq!(total, m.len());
        }
    }
}

// A copy compares equal, iterates in the same order, and does not share
// storage with its source.
proptest! {
    #[test]
    fn prop_clone_is_equal_and_independent(keys in proptest::collection::vec(any::<u16>(), 0..100)) {
        let source: UnorderedMap<u16, u32> = keys.iter().map(|&k| (k, u32::from(k))).collect();
        let mut copy = source.clone();
        prop_assert!(copy == source);
        let a: Vec<u16> = source.keys().copied().collect();
        let b: Vec<u16> = copy.keys().copied().collect();
        prop_assert_eq!(a, b);

        for v in copy.values_mut() {
            *v = v.wrapping_add(1);
        }
        for (k, v) in source.iter() {
            prop_assert_eq!(*v, u32::from(*k));
        }
    }
}
