//! UnorderedMap: separate-chaining buckets threaded by one global list.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use core::ops::Index;

use crate::alloc::{HeapAlloc, SlotAlloc, SlotKey};
use crate::buckets::BucketIndex;
use crate::config::{check_load_factor, MapConfig, DEFAULT_CAPACITY, DEFAULT_MAX_LOAD_FACTOR};
use crate::error::{MapError, Result};
use crate::hashing::{bucket_for, make_hash, DefaultHashBuilder, KeyEq, StdEq};
use crate::iter::{Handles, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::node::{Handle, Link, Node, Sentinel};

impl Handle {
    pub fn key<'a, K, V, S, E, PA, NA>(&self, map: &'a UnorderedMap<K, V, S, E, PA, NA>) -> Option<&'a K>
    where
        PA: SlotAlloc<(K, V)>,
        NA: SlotAlloc<Node>,
    {
        map.handle_pair(*self).map(|(k, _)| k)
    }

    pub fn value<'a, K, V, S, E, PA, NA>(&self, map: &'a UnorderedMap<K, V, S, E, PA, NA>) -> Option<&'a V>
    where
        PA: SlotAlloc<(K, V)>,
        NA: SlotAlloc<Node>,
    {
        map.handle_pair(*self).map(|(_, v)| v)
    }

    pub fn value_mut<'a, K, V, S, E, PA, NA>(
        &self,
        map: &'a mut UnorderedMap<K, V, S, E, PA, NA>,
    ) -> Option<&'a mut V>
    where
        PA: SlotAlloc<(K, V)>,
        NA: SlotAlloc<Node>,
    {
        map.handle_value_mut(*self)
    }

    /// Bucket the element was placed in by the last insert or rehash.
    pub fn bucket<K, V, S, E, PA, NA>(&self, map: &UnorderedMap<K, V, S, E, PA, NA>) -> Option<usize>
    where
        PA: SlotAlloc<(K, V)>,
        NA: SlotAlloc<Node>,
    {
        map.nodes.get(self.raw_handle()).map(|n| n.bucket)
    }
}

/// Hash map with unique keys, separate chaining and a single global list.
///
/// Every element sits in one singly-linked list that starts at a sentinel.
/// Elements of the same bucket are contiguous in that list, and bucket `h`
/// stores the link *preceding* its first element, so both lookups and
/// full iteration stay cheap and a node can be spliced in or out in O(1).
///
/// Node metadata and payloads come from two independent [`SlotAlloc`]
/// strategies (`NA` and `PA`); elements are addressed by generational
/// [`Handle`]s that survive rehashing.
pub struct UnorderedMap<
    K,
    V,
    S = DefaultHashBuilder,
    E = StdEq,
    PA = HeapAlloc<(K, V)>,
    NA = HeapAlloc<Node>,
> {
    hasher: S,
    eq: E,
    payloads: PA,
    nodes: NA,
    head: Sentinel,
    buckets: BucketIndex,
    len: usize,
    max_load_factor: f64,
    _pd: PhantomData<(K, V)>,
}

fn or_panic<T>(op: &str, r: Result<T>) -> T {
    match r {
        Ok(t) => t,
        Err(e) => panic!("UnorderedMap::{op}: {e}"),
    }
}

impl<K, V> UnorderedMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A map with `buckets` buckets (at least one).
    pub fn with_capacity(buckets: usize) -> Self {
        Self::from_parts(
            BucketIndex::new(buckets.max(1)),
            DEFAULT_MAX_LOAD_FACTOR,
            DefaultHashBuilder::default(),
            StdEq,
            HeapAlloc::new(),
            HeapAlloc::new(),
        )
    }

    pub fn with_config(config: MapConfig) -> Result<Self> {
        Self::with_config_in(
            config,
            DefaultHashBuilder::default(),
            StdEq,
            HeapAlloc::new(),
            HeapAlloc::new(),
        )
    }
}

impl<K, V, S> UnorderedMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_and_eq(hasher, StdEq)
    }
}

impl<K, V, S, E> UnorderedMap<K, V, S, E> {
    pub fn with_hasher_and_eq(hasher: S, eq: E) -> Self {
        Self::from_parts(
            BucketIndex::new(DEFAULT_CAPACITY),
            DEFAULT_MAX_LOAD_FACTOR,
            hasher,
            eq,
            HeapAlloc::new(),
            HeapAlloc::new(),
        )
    }
}

impl<K, V, S, E, PA, NA> Default for UnorderedMap<K, V, S, E, PA, NA>
where
    S: Default,
    E: Default,
    PA: Default,
    NA: Default,
{
    fn default() -> Self {
        Self::from_parts(
            BucketIndex::new(DEFAULT_CAPACITY),
            DEFAULT_MAX_LOAD_FACTOR,
            S::default(),
            E::default(),
            PA::default(),
            NA::default(),
        )
    }
}

impl<K, V, S, E, PA, NA> UnorderedMap<K, V, S, E, PA, NA> {
    fn from_parts(buckets: BucketIndex, max_load_factor: f64, hasher: S, eq: E, payloads: PA, nodes: NA) -> Self {
        Self {
            hasher,
            eq,
            payloads,
            nodes,
            head: Sentinel::default(),
            buckets,
            len: 0,
            max_load_factor,
            _pd: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.capacity()
    }

    /// Reports the bucket count, not an upper bound on the element count.
    pub fn max_size(&self) -> usize {
        self.buckets.capacity()
    }

    /// Number of buckets holding at least one element.
    pub fn occupied_buckets(&self) -> usize {
        self.buckets.occupied()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_eq(&self) -> &E {
        &self.eq
    }

    /// Handle of the first element in iteration order.
    pub fn first(&self) -> Option<Handle> {
        self.head.next.map(Handle::new)
    }
}

impl<K, V, S, E, PA, NA> UnorderedMap<K, V, S, E, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    /// Builds a map from an explicit policy and explicit parts. Any values
    /// already held by the strategies are dropped.
    pub fn with_config_in(config: MapConfig, hasher: S, eq: E, mut payloads: PA, mut nodes: NA) -> Result<Self> {
        config.validate()?;
        payloads.clear();
        nodes.clear();
        let buckets = BucketIndex::try_new(config.initial_capacity)?;
        Ok(Self::from_parts(
            buckets,
            config.max_load_factor,
            hasher,
            eq,
            payloads,
            nodes,
        ))
    }

    #[inline]
    fn node(&self, k: SlotKey) -> &Node {
        self.nodes.get(k).expect("linked node must be live")
    }

    #[inline]
    fn node_mut(&mut self, k: SlotKey) -> &mut Node {
        self.nodes.get_mut(k).expect("linked node must be live")
    }

    #[inline]
    fn pair(&self, node: &Node) -> &(K, V) {
        self.payloads
            .get(node.payload)
            .expect("live node must own a payload")
    }

    #[inline]
    fn next_of(&self, link: Link) -> Option<SlotKey> {
        match link {
            Link::Head => self.head.next,
            Link::Node(k) => self.node(k).next,
        }
    }

    #[inline]
    fn set_next(&mut self, link: Link, next: Option<SlotKey>) {
        match link {
            Link::Head => self.head.next = next,
            Link::Node(k) => self.node_mut(k).next = next,
        }
    }

    /// Links an allocated node into the list as the first element of its
    /// (already assigned) bucket.
    fn splice(&mut self, k: SlotKey) {
        let bucket = self.node(k).bucket;
        match self.buckets.anchor(bucket) {
            None => {
                // New bucket run goes to the front; the run it displaces is
                // now preceded by `k`.
                let first = self.head.next;
                self.node_mut(k).next = first;
                self.head.next = Some(k);
                self.buckets.occupy(bucket, Link::Head);
                if let Some(f) = first {
                    let displaced = self.node(f).bucket;
                    self.buckets.redirect(displaced, Link::Node(k));
                }
            }
            Some(prev) => {
                let first = self.next_of(prev);
                self.node_mut(k).next = first;
                self.set_next(prev, Some(k));
            }
        }
    }

    /// Removes `k` from the list and the anchor array and releases its node.
    fn unlink(&mut self, k: SlotKey) -> Node {
        let (bucket, succ) = {
            let n = self.node(k);
            (n.bucket, n.next)
        };
        let anchor = self
            .buckets
            .anchor(bucket)
            .expect("bucket of a live node must be occupied");

        let mut prev = anchor;
        loop {
            let next = self
                .next_of(prev)
                .expect("node must follow its bucket anchor");
            if next == k {
                break;
            }
            prev = Link::Node(next);
        }

        self.set_next(prev, succ);
        let succ_bucket = succ.map(|s| self.node(s).bucket);
        if prev == anchor && succ_bucket != Some(bucket) {
            self.buckets.vacate(bucket);
        }
        if let Some(sb) = succ_bucket.filter(|&sb| sb != bucket) {
            self.buckets.redirect(sb, prev);
        }

        self.nodes.deallocate(k).expect("unlinked node must be live")
    }

    /// Allocates payload and node, then links them. Either both
    /// allocations succeed and the node is fully linked, or no element
    /// changes.
    fn link_new(&mut self, hash: u64, pair: (K, V)) -> Result<SlotKey> {
        let payload = self.payloads.allocate(pair).map_err(|e| {
            tracing::debug!(error = %e, len = self.len, "payload allocation failed");
            e
        })?;
        let bucket = bucket_for(hash, self.capacity());
        let k = match self.nodes.allocate(Node::new(payload, hash, bucket)) {
            Ok(k) => k,
            Err(e) => {
                tracing::debug!(error = %e, len = self.len, "node allocation failed");
                drop(self.payloads.deallocate(payload));
                return Err(e.into());
            }
        };
        self.splice(k);
        self.len += 1;
        Ok(k)
    }

    fn exceeds(&self, count: usize, capacity: usize) -> bool {
        count as f64 / capacity as f64 > self.max_load_factor
    }

    /// Doubles the table until one more element fits under the threshold.
    fn grow_for_insert(&mut self) -> Result<()> {
        let wanted = self.len + 1;
        let mut capacity = self.capacity();
        if !self.exceeds(wanted, capacity) {
            return Ok(());
        }
        while self.exceeds(wanted, capacity) {
            capacity = capacity
                .checked_mul(2)
                .ok_or(MapError::CapacityOverflow { requested: usize::MAX })?;
        }
        self.rehash_exact(capacity)
    }

    /// Rebuilds the anchor array for `capacity` buckets by relinking the
    /// existing nodes. No node or payload is reallocated and no user code
    /// runs: buckets come from each node's cached hash. If the new array
    /// cannot be allocated the map is left as it was.
    fn rehash_exact(&mut self, capacity: usize) -> Result<()> {
        debug_assert!(capacity > 0);
        let buckets = BucketIndex::try_new(capacity).map_err(|e| {
            tracing::debug!(error = %e, old_capacity = self.capacity(), "rehash refused");
            e
        })?;
        tracing::debug!(
            old_capacity = self.capacity(),
            new_capacity = capacity,
            len = self.len,
            "rehash"
        );
        self.buckets = buckets;
        let mut cur = self.head.next.take();
        while let Some(k) = cur {
            let node = self.node_mut(k);
            cur = node.next;
            node.bucket = bucket_for(node.hash, capacity);
            self.splice(k);
        }
        Ok(())
    }

    fn min_capacity_for(&self, count: usize, factor: f64) -> usize {
        ((count as f64 / factor).ceil() as usize).max(1)
    }

    /// Rebuilds the table with `buckets` buckets, or with as many as the
    /// current element count needs under the load factor if that is more.
    pub fn try_rehash(&mut self, buckets: usize) -> Result<()> {
        let needed = self.min_capacity_for(self.len, self.max_load_factor);
        self.rehash_exact(buckets.max(needed))
    }

    /// Panics where `try_rehash` reports [`MapError::CapacityOverflow`].
    pub fn rehash(&mut self, buckets: usize) {
        or_panic("rehash", self.try_rehash(buckets))
    }

    /// Grows the table to at least `buckets` buckets. Never shrinks.
    pub fn try_reserve(&mut self, buckets: usize) -> Result<()> {
        if buckets > self.capacity() {
            self.rehash_exact(buckets)?;
        }
        Ok(())
    }

    pub fn reserve(&mut self, buckets: usize) {
        or_panic("reserve", self.try_reserve(buckets))
    }

    /// Sets the growth threshold and resizes immediately.
    ///
    /// The new bucket count scales the current one by
    /// `old_factor / new_factor`, and is never smaller than what the
    /// current element count needs under the new factor. Setting the
    /// current value again does nothing. If the resized table cannot be
    /// allocated, both the table and the old factor are kept.
    pub fn set_max_load_factor(&mut self, factor: f64) -> Result<()> {
        check_load_factor(factor)?;
        if factor == self.max_load_factor {
            return Ok(());
        }
        let scaled = (self.max_load_factor * self.capacity() as f64 / factor).ceil() as usize;
        let capacity = scaled.max(self.min_capacity_for(self.len, factor));
        if capacity != self.capacity() {
            self.rehash_exact(capacity)?;
        }
        tracing::trace!(
            old = self.max_load_factor,
            new = factor,
            capacity,
            "max load factor changed"
        );
        self.max_load_factor = factor;
        Ok(())
    }

    /// Number of elements in bucket `bucket`; zero when out of range.
    pub fn bucket_len(&self, bucket: usize) -> usize {
        if bucket >= self.capacity() {
            return 0;
        }
        let Some(anchor) = self.buckets.anchor(bucket) else {
            return 0;
        };
        let mut n = 0;
        let mut cur = self.next_of(anchor);
        while let Some(k) = cur {
            let node = self.node(k);
            if node.bucket != bucket {
                break;
            }
            n += 1;
            cur = node.next;
        }
        n
    }

    /// Handle of the element following `h` in iteration order.
    pub fn next_handle(&self, h: Handle) -> Option<Handle> {
        self.nodes.get(h.raw_handle())?.next.map(Handle::new)
    }

    pub(crate) fn handle_pair(&self, h: Handle) -> Option<(&K, &V)> {
        let node = self.nodes.get(h.raw_handle())?;
        self.payloads.get(node.payload).map(|(k, v)| (k, v))
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let payload = self.nodes.get(h.raw_handle())?.payload;
        self.payloads.get_mut(payload).map(|(_, v)| v)
    }

    /// Removes the element behind `h` and returns it. A stale handle is
    /// ignored. Handles into another map are a caller error.
    pub fn erase(&mut self, h: Handle) -> Option<(K, V)> {
        let k = h.raw_handle();
        self.nodes.get(k)?;
        let node = self.unlink(k);
        self.len -= 1;
        Some(
            self.payloads
                .deallocate(node.payload)
                .expect("erased node must own a payload"),
        )
    }

    /// Erases elements in iteration order from `first` up to, not
    /// including, `last` (`None` erases through the end). Returns the number
    /// of erased elements.
    pub fn erase_range(&mut self, first: Handle, last: Option<Handle>) -> usize {
        let mut removed = 0;
        let mut cur = Some(first);
        while let Some(h) = cur {
            if Some(h) == last {
                break;
            }
            // Successor is captured before its predecessor goes away.
            let Some(node) = self.nodes.get(h.raw_handle()) else {
                break;
            };
            cur = node.next.map(Handle::new);
            self.erase(h);
            removed += 1;
        }
        removed
    }

    /// Keeps only the elements for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut cur = self.head.next;
        while let Some(k) = cur {
            let (next, payload) = {
                let node = self.node(k);
                (node.next, node.payload)
            };
            cur = next;
            let kept = {
                let (key, value) = self
                    .payloads
                    .get_mut(payload)
                    .expect("live node must own a payload");
                keep(key, value)
            };
            if !kept {
                self.erase(Handle::new(k));
            }
        }
    }

    /// Drops every element; the bucket count is kept.
    pub fn clear(&mut self) {
        self.head.next = None;
        self.buckets.reset();
        self.nodes.clear();
        self.payloads.clear();
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, K, V, PA, NA> {
        Iter {
            nodes: &self.nodes,
            payloads: &self.payloads,
            cur: self.head.next,
            remaining: self.len,
            _pd: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, NA> {
        IterMut::new(&self.nodes, &mut self.payloads, self.head.next, self.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V, PA, NA> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V, PA, NA> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, NA> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub fn handles(&self) -> Handles<'_, NA> {
        Handles {
            nodes: &self.nodes,
            cur: self.head.next,
            remaining: self.len,
        }
    }

    /// Moves the contents out, leaving `self` empty with the same bucket
    /// count, policy and strategy configuration.
    pub fn take(&mut self) -> Self
    where
        S: Clone,
        E: Clone,
    {
        let empty = self.empty_like();
        core::mem::replace(self, empty)
    }

    fn empty_like(&self) -> Self
    where
        S: Clone,
        E: Clone,
    {
        Self::from_parts(
            BucketIndex::new(self.capacity()),
            self.max_load_factor,
            self.hasher.clone(),
            self.eq.clone(),
            self.payloads.empty_like(),
            self.nodes.empty_like(),
        )
    }

    /// Appends deep copies of `source`'s elements to an empty `self` whose
    /// bucket count equals `source`'s. The source list is already split into
    /// contiguous bucket runs, so an anchor is planted whenever the cached
    /// bucket changes and no hashing is needed.
    fn copy_from(&mut self, source: &Self) -> Result<()>
    where
        K: Clone,
        V: Clone,
    {
        debug_assert!(self.is_empty());
        debug_assert_eq!(self.capacity(), source.capacity());
        let mut tail = Link::Head;
        let mut run = None;
        let mut cur = source.head.next;
        while let Some(k) = cur {
            let node = source.node(k);
            cur = node.next;
            let payload = self.payloads.allocate(source.pair(node).clone())?;
            let copied = match self.nodes.allocate(Node::new(payload, node.hash, node.bucket)) {
                Ok(c) => c,
                Err(e) => {
                    drop(self.payloads.deallocate(payload));
                    return Err(e.into());
                }
            };
            if run != Some(node.bucket) {
                self.buckets.occupy(node.bucket, tail);
                run = Some(node.bucket);
            }
            self.set_next(tail, Some(copied));
            tail = Link::Node(copied);
            self.len += 1;
        }
        Ok(())
    }

    /// Deep copy that reports allocation failure instead of panicking.
    pub fn try_clone(&self) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        S: Clone,
        E: Clone,
    {
        let mut copy = self.empty_like();
        copy.copy_from(self)?;
        Ok(copy)
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use std::collections::HashSet;

        let capacity = self.capacity();
        let mut seen_buckets = HashSet::new();
        let mut prev = Link::Head;
        let mut run: Option<usize> = None;
        let mut count = 0;
        let mut cur = self.head.next;
        while let Some(k) = cur {
            let node = self.node(k);
            assert_eq!(node.bucket, bucket_for(node.hash, capacity), "stale cached bucket");
            assert!(self.payloads.get(node.payload).is_some(), "node without payload");
            if run != Some(node.bucket) {
                assert!(seen_buckets.insert(node.bucket), "bucket {} is not contiguous", node.bucket);
                assert_eq!(
                    self.buckets.anchor(node.bucket),
                    Some(prev),
                    "anchor of bucket {} must precede its run",
                    node.bucket
                );
                run = Some(node.bucket);
            }
            count += 1;
            prev = Link::Node(k);
            cur = node.next;
        }
        assert_eq!(count, self.len);
        assert_eq!(self.nodes.len(), self.len);
        assert_eq!(self.payloads.len(), self.len);
        assert_eq!(seen_buckets.len(), self.buckets.occupied());
        for b in 0..capacity {
            assert_eq!(
                self.buckets.anchor(b).is_some(),
                seen_buckets.contains(&b),
                "anchor {} out of sync",
                b
            );
        }
    }
}

impl<K, V, S, E, PA, NA> UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    /// Walks only the run of `hash`'s bucket.
    fn find_node<Q>(&self, hash: u64, q: &Q) -> Option<SlotKey>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        E: KeyEq<Q>,
    {
        let bucket = bucket_for(hash, self.capacity());
        let anchor = self.buckets.anchor(bucket)?;
        let mut cur = self.next_of(anchor);
        while let Some(k) = cur {
            let node = self.node(k);
            if node.bucket != bucket {
                break;
            }
            let stored: &Q = self.pair(node).0.borrow();
            if node.hash == hash && <E as KeyEq<Q>>::equivalent(&self.eq, stored, q) {
                return Some(k);
            }
            cur = node.next;
        }
        None
    }

    fn lookup<Q>(&self, q: &Q) -> Option<SlotKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let hash = make_hash(&self.hasher, q);
        self.find_node(hash, q)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.lookup(q).map(Handle::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.lookup(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let k = self.lookup(q)?;
        let (key, value) = self.pair(self.node(k));
        Some((key, value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let k = self.lookup(q)?;
        self.handle_value_mut(Handle::new(k))
    }

    /// Value for `q`, or [`MapError::KeyNotFound`].
    pub fn at<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get(q).ok_or(MapError::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.get_mut(q).ok_or(MapError::KeyNotFound)
    }

    /// Bucket `q` maps to under the current capacity.
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        bucket_for(make_hash(&self.hasher, q), self.capacity())
    }

    /// Inserts `key -> value` unless an equal key is present, in which case
    /// the map is unchanged and the existing element's handle is returned
    /// with `false`.
    ///
    /// The table grows before the lookup whenever one more element would
    /// push the load factor past its maximum, so a duplicate near the
    /// threshold may still resize.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(Handle, bool)> {
        self.try_insert_with(key, move || value)
    }

    pub fn insert(&mut self, key: K, value: V) -> (Handle, bool) {
        or_panic("insert", self.try_insert(key, value))
    }

    /// Like `try_insert`, but builds the value only when the key is absent.
    pub fn try_insert_with<F>(&mut self, key: K, make: F) -> Result<(Handle, bool)>
    where
        F: FnOnce() -> V,
    {
        self.grow_for_insert()?;
        let hash = make_hash(&self.hasher, &key);
        if let Some(k) = self.find_node(hash, &key) {
            return Ok((Handle::new(k), false));
        }
        let k = self.link_new(hash, (key, make()))?;
        Ok((Handle::new(k), true))
    }

    pub fn insert_with<F>(&mut self, key: K, make: F) -> (Handle, bool)
    where
        F: FnOnce() -> V,
    {
        or_panic("insert_with", self.try_insert_with(key, make))
    }

    /// Builds the pair first, then inserts it; on a duplicate key the
    /// freshly built pair is dropped.
    pub fn try_emplace<P>(&mut self, args: P) -> Result<(Handle, bool)>
    where
        P: Into<(K, V)>,
    {
        let (key, value) = args.into();
        self.try_insert(key, value)
    }

    pub fn emplace<P>(&mut self, args: P) -> (Handle, bool)
    where
        P: Into<(K, V)>,
    {
        or_panic("emplace", self.try_emplace(args))
    }

    /// Inserts every pair of `pairs`, returning how many were new.
    /// Stops at the first allocation failure; pairs inserted before it stay.
    pub fn try_insert_many<I>(&mut self, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inserted = 0;
        for (key, value) in pairs {
            if self.try_insert(key, value)?.1 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub fn insert_many<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        or_panic("insert_many", self.try_insert_many(pairs))
    }

    /// Value for `key`, inserting `V::default()` first when absent.
    pub fn try_get_or_insert_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        let (h, _) = self.try_insert_with(key, V::default)?;
        Ok(self
            .handle_value_mut(h)
            .expect("handle returned by insert must be live"))
    }

    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        or_panic("get_or_insert_default", self.try_get_or_insert_default(key))
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
        E: KeyEq<Q>,
    {
        let k = self.lookup(q)?;
        self.erase(Handle::new(k))
    }
}

impl<K, V, S, E, PA, NA> Clone for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Clone,
    V: Clone,
    S: Clone,
    E: Clone,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    fn clone(&self) -> Self {
        or_panic("clone", self.try_clone())
    }

    /// Copy assignment: replaces the contents and policy of `self` with
    /// copies of `source`'s while keeping `self`'s allocation strategies.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.hasher = source.hasher.clone();
        self.eq = source.eq.clone();
        self.max_load_factor = source.max_load_factor;
        self.buckets = BucketIndex::new(source.capacity());
        if let Err(e) = self.copy_from(source) {
            self.clear();
            panic!("UnorderedMap::clone_from: {e}");
        }
    }
}

impl<K, V, S, E, PA, NA> fmt::Debug for UnorderedMap<K, V, S, E, PA, NA>
where
    K: fmt::Debug,
    V: fmt::Debug,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, E, PA, NA> PartialEq for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, E, PA, NA> Eq for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
}

impl<K, Q, V, S, E, PA, NA> Index<&Q> for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash + Borrow<Q>,
    Q: ?Sized + Hash,
    S: BuildHasher,
    E: KeyEq<K> + KeyEq<Q>,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, S, E, PA, NA> Extend<(K, V)> for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.insert_many(iter);
    }
}

impl<K, V, S, E, PA, NA> FromIterator<(K, V)> for UnorderedMap<K, V, S, E, PA, NA>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
    PA: SlotAlloc<(K, V)> + Default,
    NA: SlotAlloc<Node> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.insert_many(iter);
        map
    }
}

impl<K, V, S, E, PA, NA> IntoIterator for UnorderedMap<K, V, S, E, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, PA, NA>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            cur: self.head.next,
            remaining: self.len,
            payloads: self.payloads,
            nodes: self.nodes,
            _pd: PhantomData,
        }
    }
}

impl<'a, K, V, S, E, PA, NA> IntoIterator for &'a UnorderedMap<K, V, S, E, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, PA, NA>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E, PA, NA> IntoIterator for &'a mut UnorderedMap<K, V, S, E, PA, NA>
where
    PA: SlotAlloc<(K, V)>,
    NA: SlotAlloc<Node>,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, NA>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
