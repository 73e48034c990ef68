//! Element nodes, list links and the public `Handle`.

use crate::alloc::SlotKey;

/// Metadata of one element. The key/value payload lives in the payload
/// strategy; the node only refers to it.
///
/// Public so that node strategies can be named in `UnorderedMap`'s type
/// parameters; its fields are private to the crate.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) payload: SlotKey,
    pub(crate) next: Option<SlotKey>,
    pub(crate) hash: u64,
    /// Bucket as of the last insert or rehash.
    pub(crate) bucket: usize,
}

impl Node {
    pub(crate) fn new(payload: SlotKey, hash: u64, bucket: usize) -> Self {
        Self {
            payload,
            next: None,
            hash,
            bucket,
        }
    }
}

/// A position in the global list: the sentinel head or a real node.
///
/// Bucket anchors store the link *preceding* their bucket's first node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Link {
    Head,
    Node(SlotKey),
}

/// Payload-less head of the global list.
#[derive(Debug, Default)]
pub(crate) struct Sentinel {
    pub(crate) next: Option<SlotKey>,
}

/// Stable reference to an element of an `UnorderedMap`.
///
/// Survives rehashing and unrelated insertions/removals. Once its element is
/// erased the handle never resolves again, even if the slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(SlotKey);

impl Handle {
    #[inline]
    pub(crate) fn new(k: SlotKey) -> Self {
        Handle(k)
    }

    #[inline]
    pub(crate) fn raw_handle(&self) -> SlotKey {
        self.0
    }
}
