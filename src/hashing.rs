//! Key equivalence and hash-to-bucket resolution.

use core::hash::{BuildHasher, Hash};

/// Default hash builder for `UnorderedMap`.
pub use hashbrown::hash_map::DefaultHashBuilder;

/// Equality predicate used to match keys inside a bucket.
///
/// Must agree with the map's hasher: equivalent keys hash identically.
pub trait KeyEq<Q: ?Sized> {
    fn equivalent(&self, stored: &Q, query: &Q) -> bool;
}

/// Equality through `Eq`. The default predicate.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct StdEq;

impl<Q: ?Sized + Eq> KeyEq<Q> for StdEq {
    #[inline]
    fn equivalent(&self, stored: &Q, query: &Q) -> bool {
        stored == query
    }
}

impl<Q: ?Sized, F> KeyEq<Q> for F
where
    F: Fn(&Q, &Q) -> bool,
{
    #[inline]
    fn equivalent(&self, stored: &Q, query: &Q) -> bool {
        self(stored, query)
    }
}

#[inline]
pub(crate) fn make_hash<S, Q>(hasher: &S, q: &Q) -> u64
where
    S: BuildHasher,
    Q: ?Sized + Hash,
{
    hasher.hash_one(q)
}

/// `hash mod capacity`. Capacity is never zero.
#[inline]
pub(crate) fn bucket_for(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    (hash % capacity as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_eq_matches_eq() {
        assert!(StdEq.equivalent("a", "a"));
        assert!(!StdEq.equivalent(&1u8, &2u8));
    }

    #[test]
    fn closures_act_as_predicates() {
        let ci = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
        assert!(ci.equivalent("Key", "kEY"));
        assert!(!ci.equivalent("Key", "Kez"));
    }

    #[test]
    fn bucket_is_hash_modulo_capacity() {
        assert_eq!(bucket_for(130, 64), 2);
        assert_eq!(bucket_for(63, 64), 63);
        assert_eq!(bucket_for(u64::MAX, 1), 0);
        assert_eq!(bucket_for(10, 7), 3);
    }

    #[test]
    fn default_builder_is_deterministic_per_instance() {
        let s = DefaultHashBuilder::default();
        assert_eq!(make_hash(&s, "x"), make_hash(&s, "x"));
    }
}
