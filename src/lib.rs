//! unordered-map: a single-threaded hash map whose buckets are contiguous
//! runs of one global singly-linked list, with stable handles and
//! injectable allocation strategies.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: separate chaining where full iteration costs O(len) instead of
//!   O(buckets), and where one node can be spliced in or out of both the
//!   bucket structure and the iteration order in O(1).
//! - Layers:
//!   - `alloc`: `SlotAlloc<T>` strategies (heap, dense, bounded pool) built on
//!     `slotmap`, addressing values by generational `SlotKey`s.
//!   - `node`: element metadata (`Node`), list positions (`Link`), the
//!     sentinel head and the public `Handle`.
//!   - `buckets`: the anchor array; anchor `h` is the link *preceding* the
//!     first node of bucket `h`, or empty.
//!   - `map`: `UnorderedMap`, which keeps the list and the anchors in
//!     lock-step on insert, erase and rehash.
//!   - `iter`: list-order iterators.
//!
//! Constraints
//! - Single-threaded; no internal synchronization.
//! - Unique keys: inserting a present key is a no-op that returns the
//!   existing element's handle.
//! - Elements of one bucket are contiguous in iteration order at every
//!   point between mutations; order across buckets is unspecified and
//!   changes on rehash.
//! - `len / capacity <= max_load_factor` after every insertion; the table
//!   doubles *before* an insertion that would break it.
//! - Handles survive rehashing and unrelated removals. A handle to an
//!   erased element never resolves again.
//!
//! Hasher and rehashing invariants
//! - Each node stores its key's `u64` hash and its bucket as of the last
//!   insert or rehash. Rehash walks the detached list and re-splices each
//!   node from its cached hash; `K: Hash` is never invoked after insertion
//!   and no node or payload moves.
//!
//! Allocation
//! - Node metadata and payloads come from two independent strategies. An
//!   insertion allocates both before linking anything, so an allocation
//!   failure leaves the map untouched. Fallible `try_*` operations return
//!   `MapError::Alloc`; their plain counterparts panic.
//!
//! Notes and non-goals
//! - No ordered traversal or range queries.
//! - No deterministic iteration order across rehashes.
//! - Handles from another map are a caller error.

mod alloc;
mod buckets;
mod config;
mod error;
mod hashing;
pub mod iter;
mod map;
#[cfg(test)]
mod map_proptest;
mod node;

// Public surface
pub use alloc::{DenseAlloc, HeapAlloc, PoolAlloc, SlotAlloc, SlotKey};
pub use config::{MapConfig, DEFAULT_CAPACITY, DEFAULT_MAX_LOAD_FACTOR};
pub use error::{AllocError, MapError, Result};
pub use hashing::{DefaultHashBuilder, KeyEq, StdEq};
pub use map::UnorderedMap;
pub use node::{Handle, Node};
