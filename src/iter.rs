//! Iterators over the global list.
//!
//! All of them walk node successors starting at the sentinel, so a full
//! pass costs O(len) regardless of the bucket count, and elements of one
//! bucket come out back to back.

use core::iter::FusedIterator;
use core::marker::PhantomData;

use slotmap::SecondaryMap;

use crate::alloc::{SlotAlloc, SlotKey};
use crate::node::{Handle, Node};

/// Iterator over `(&K, &V)` in list order.
pub struct Iter<'a, K, V, PA, NA> {
    pub(crate) nodes: &'a NA,
    pub(crate) payloads: &'a PA,
    pub(crate) cur: Option<SlotKey>,
    pub(crate) remaining: usize,
    pub(crate) _pd: PhantomData<&'a (K, V)>,
}

impl<'a, K: 'a, V: 'a, PA, NA> Iterator for Iter<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let nodes: &'a NA = self.nodes;
        let payloads: &'a PA = self.payloads;
        let node = nodes.get(k).expect("listed node must be live");
        self.cur = node.next;
        self.remaining -= 1;
        let (key, value) = payloads
            .get(node.payload)
            .expect("live node must own a payload");
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a, PA, NA> ExactSizeIterator for Iter<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<'a, K: 'a, V: 'a, PA, NA> FusedIterator for Iter<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<K, V, PA, NA> Clone for Iter<'_, K, V, PA, NA> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            payloads: self.payloads,
            cur: self.cur,
            remaining: self.remaining,
            _pd: PhantomData,
        }
    }
}

/// Iterator over `(&K, &mut V)` in list order.
///
/// The disjoint references come from the payload strategy's own
/// `iter_mut` up front, keyed by payload slot, and are handed out as the
/// list is walked.
pub struct IterMut<'a, K, V, NA> {
    pub(crate) nodes: &'a NA,
    pub(crate) pending: SecondaryMap<SlotKey, (&'a K, &'a mut V)>,
    pub(crate) cur: Option<SlotKey>,
    pub(crate) remaining: usize,
}

impl<'a, K, V, NA> IterMut<'a, K, V, NA> {
    pub(crate) fn new<PA>(nodes: &'a NA, payloads: &'a mut PA, head: Option<SlotKey>, len: usize) -> Self
    where
        PA: SlotAlloc<(K, V)>,
    {
        let mut pending = SecondaryMap::with_capacity(len);
        for (slot, (key, value)) in payloads.iter_mut() {
            pending.insert(slot, (&*key, value));
        }
        Self {
            nodes,
            pending,
            cur: head,
            remaining: len,
        }
    }
}

impl<'a, K: 'a, V: 'a, NA> Iterator for IterMut<'a, K, V, NA>
where
    NA: SlotAlloc<Node>,
{
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let nodes: &'a NA = self.nodes;
        let node = nodes.get(k).expect("listed node must be live");
        self.cur = node.next;
        self.remaining -= 1;
        Some(
            self.pending
                .remove(node.payload)
                .expect("live node must own a payload"),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a, NA> ExactSizeIterator for IterMut<'a, K, V, NA> where NA: SlotAlloc<Node> {}

impl<'a, K: 'a, V: 'a, NA> FusedIterator for IterMut<'a, K, V, NA> where NA: SlotAlloc<Node> {}

pub struct Keys<'a, K, V, PA, NA> {
    pub(crate) inner: Iter<'a, K, V, PA, NA>,
}

impl<'a, K: 'a, V: 'a, PA, NA> Iterator for Keys<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, PA, NA> ExactSizeIterator for Keys<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<'a, K: 'a, V: 'a, PA, NA> FusedIterator for Keys<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

pub struct Values<'a, K, V, PA, NA> {
    pub(crate) inner: Iter<'a, K, V, PA, NA>,
}

impl<'a, K: 'a, V: 'a, PA, NA> Iterator for Values<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, PA, NA> ExactSizeIterator for Values<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<'a, K: 'a, V: 'a, PA, NA> FusedIterator for Values<'a, K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

pub struct ValuesMut<'a, K, V, NA> {
    pub(crate) inner: IterMut<'a, K, V, NA>,
}

impl<'a, K: 'a, V: 'a, NA> Iterator for ValuesMut<'a, K, V, NA>
where
    NA: SlotAlloc<Node>,
{
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a, NA> ExactSizeIterator for ValuesMut<'a, K, V, NA> where NA: SlotAlloc<Node> {}

impl<'a, K: 'a, V: 'a, NA> FusedIterator for ValuesMut<'a, K, V, NA> where NA: SlotAlloc<Node> {}

/// Iterator over element handles in list order.
pub struct Handles<'a, NA> {
    pub(crate) nodes: &'a NA,
    pub(crate) cur: Option<SlotKey>,
    pub(crate) remaining: usize,
}

impl<NA> Iterator for Handles<'_, NA>
where
    NA: SlotAlloc<Node>,
{
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let k = self.cur?;
        self.cur = self.nodes.get(k).expect("listed node must be live").next;
        self.remaining -= 1;
        Some(Handle::new(k))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<NA> ExactSizeIterator for Handles<'_, NA> where NA: SlotAlloc<Node> {}

impl<NA> FusedIterator for Handles<'_, NA> where NA: SlotAlloc<Node> {}

/// Owning iterator; releases nodes and payloads as it goes. Elements not
/// yielded are dropped with the iterator.
pub struct IntoIter<K, V, PA, NA> {
    pub(crate) payloads: PA,
    pub(crate) nodes: NA,
    pub(crate) cur: Option<SlotKey>,
    pub(crate) remaining: usize,
    pub(crate) _pd: PhantomData<(K, V)>,
}

impl<K, V, PA, NA> Iterator for IntoIter<K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let k = self.cur?;
        let node = self.nodes.deallocate(k).expect("listed node must be live");
        self.cur = node.next;
        self.remaining -= 1;
        Some(
            self.payloads
                .deallocate(node.payload)
                .expect("live node must own a payload"),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, PA, NA> ExactSizeIterator for IntoIter<K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<K, V, PA, NA> FusedIterator for IntoIter<K, V, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}
