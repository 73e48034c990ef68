//! Bucket anchor array.
//!
//! Entry `h` is empty when bucket `h` holds no element, otherwise it is the
//! link preceding the first node of bucket `h` in the global list. The array
//! knows nothing about nodes; the map keeps it in lock-step with the list.

use crate::error::{MapError, Result};
use crate::node::Link;

#[derive(Debug, Clone)]
pub(crate) struct BucketIndex {
    anchors: Vec<Option<Link>>,
    occupied: usize,
}

impl BucketIndex {
    pub(crate) fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(b) => b,
            Err(e) => panic!("BucketIndex::new({capacity}): {e}"),
        }
    }

    /// Fails with [`MapError::CapacityOverflow`] when the array cannot be
    /// allocated, instead of aborting.
    pub(crate) fn try_new(capacity: usize) -> Result<Self> {
        debug_assert!(capacity > 0);
        let mut anchors = Vec::new();
        anchors
            .try_reserve_exact(capacity)
            .map_err(|_| MapError::CapacityOverflow { requested: capacity })?;
        anchors.resize(capacity, None);
        Ok(Self {
            anchors,
            occupied: 0,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.anchors.len()
    }

    /// Number of non-empty buckets.
    #[inline]
    pub(crate) fn occupied(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub(crate) fn anchor(&self, bucket: usize) -> Option<Link> {
        self.anchors[bucket]
    }

    /// Plants the anchor of a bucket that was empty.
    pub(crate) fn occupy(&mut self, bucket: usize, prev: Link) {
        debug_assert!(self.anchors[bucket].is_none());
        self.anchors[bucket] = Some(prev);
        self.occupied += 1;
    }

    /// Moves the anchor of an occupied bucket to a new predecessor.
    pub(crate) fn redirect(&mut self, bucket: usize, prev: Link) {
        debug_assert!(self.anchors[bucket].is_some());
        self.anchors[bucket] = Some(prev);
    }

    pub(crate) fn vacate(&mut self, bucket: usize) {
        debug_assert!(self.anchors[bucket].is_some());
        self.anchors[bucket] = None;
        self.occupied -= 1;
    }

    /// Empties every bucket, keeping the capacity.
    pub(crate) fn reset(&mut self) {
        self.anchors.iter_mut().for_each(|a| *a = None);
        self.occupied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupy_redirect_vacate_track_occupancy() {
        let mut b = BucketIndex::new(4);
        assert_eq!(b.capacity(), 4);
        assert_eq!(b.occupied(), 0);

        b.occupy(1, Link::Head);
        b.occupy(3, Link::Head);
        assert_eq!(b.occupied(), 2);
        assert_eq!(b.anchor(1), Some(Link::Head));
        assert_eq!(b.anchor(0), None);

        b.redirect(3, Link::Head);
        assert_eq!(b.occupied(), 2);

        b.vacate(1);
        assert_eq!(b.anchor(1), None);
        assert_eq!(b.occupied(), 1);

        b.reset();
        assert_eq!(b.occupied(), 0);
        assert_eq!(b.anchor(3), None);
        assert_eq!(b.capacity(), 4);
    }

    #[test]
    fn oversized_array_is_an_error() {
        assert_eq!(
            BucketIndex::try_new(usize::MAX).err(),
            Some(MapError::CapacityOverflow {
                requested: usize::MAX
            })
        );
        assert_eq!(BucketIndex::try_new(3).map(|b| b.capacity()), Ok(3));
    }
}
