//! Allocation strategies: slot arenas addressed by generational keys.
//!
//! The map never holds references into its storage across operations; it
//! holds `SlotKey`s. A strategy decides where values live and whether an
//! allocation may fail. Two independent strategies back every map: one for
//! node metadata and one for key/value payloads.

use crate::error::AllocError;
use slotmap::{DenseSlotMap, SlotMap};

slotmap::new_key_type! {
    /// Generational key addressing a value inside a [`SlotAlloc`].
    pub struct SlotKey;
}

/// An allocation strategy for values of type `T`.
///
/// Keys are generational: once a value is released its key never resolves
/// again, even when the slot is reused.
pub trait SlotAlloc<T> {
    /// Stores `value`, returning its key, or fails without side effects.
    fn allocate(&mut self, value: T) -> Result<SlotKey, AllocError>;

    /// Releases the slot for `key` and returns its value; `None` when stale.
    fn deallocate(&mut self, key: SlotKey) -> Option<T>;

    fn get(&self, key: SlotKey) -> Option<&T>;

    fn get_mut(&mut self, key: SlotKey) -> Option<&mut T>;

    /// Every live value with its key, in storage order. The references are
    /// disjoint and may be held together.
    fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item = (SlotKey, &'a mut T)>
    where
        T: 'a;

    /// Number of live values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every live value.
    fn clear(&mut self);

    /// An empty strategy configured like `self`; used when copying a map.
    fn empty_like(&self) -> Self
    where
        Self: Sized;
}

/// Unbounded heap arena backed by a `SlotMap`. The default strategy.
#[derive(Debug)]
pub struct HeapAlloc<T> {
    slots: SlotMap<SlotKey, T>,
}

impl<T> HeapAlloc<T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }
}

impl<T> Default for HeapAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotAlloc<T> for HeapAlloc<T> {
    #[inline]
    fn allocate(&mut self, value: T) -> Result<SlotKey, AllocError> {
        Ok(self.slots.insert(value))
    }

    #[inline]
    fn deallocate(&mut self, key: SlotKey) -> Option<T> {
        self.slots.remove(key)
    }

    #[inline]
    fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots.get(key)
    }

    #[inline]
    fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item = (SlotKey, &'a mut T)>
    where
        T: 'a,
    {
        self.slots.iter_mut()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn empty_like(&self) -> Self {
        Self::new()
    }
}

/// Arena backed by a `DenseSlotMap`: values are packed contiguously at the
/// cost of one extra indirection per access.
#[derive(Debug)]
pub struct DenseAlloc<T> {
    slots: DenseSlotMap<SlotKey, T>,
}

impl<T> DenseAlloc<T> {
    pub fn new() -> Self {
        Self {
            slots: DenseSlotMap::with_key(),
        }
    }
}

impl<T> Default for DenseAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotAlloc<T> for DenseAlloc<T> {
    #[inline]
    fn allocate(&mut self, value: T) -> Result<SlotKey, AllocError> {
        Ok(self.slots.insert(value))
    }

    #[inline]
    fn deallocate(&mut self, key: SlotKey) -> Option<T> {
        self.slots.remove(key)
    }

    #[inline]
    fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots.get(key)
    }

    #[inline]
    fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item = (SlotKey, &'a mut T)>
    where
        T: 'a,
    {
        self.slots.iter_mut()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn empty_like(&self) -> Self {
        Self::new()
    }
}

/// Bounded pool: at most `limit` live values, storage reserved up front.
/// Allocating past the limit fails with [`AllocError::Exhausted`].
#[derive(Debug)]
pub struct PoolAlloc<T> {
    slots: SlotMap<SlotKey, T>,
    limit: usize,
}

impl<T> PoolAlloc<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(limit),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T> SlotAlloc<T> for PoolAlloc<T> {
    fn allocate(&mut self, value: T) -> Result<SlotKey, AllocError> {
        if self.slots.len() >= self.limit {
            return Err(AllocError::Exhausted { limit: self.limit });
        }
        Ok(self.slots.insert(value))
    }

    #[inline]
    fn deallocate(&mut self, key: SlotKey) -> Option<T> {
        self.slots.remove(key)
    }

    #[inline]
    fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots.get(key)
    }

    #[inline]
    fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    fn iter_mut<'a>(&'a mut self) -> impl Iterator<Item = (SlotKey, &'a mut T)>
    where
        T: 'a,
    {
        self.slots.iter_mut()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn empty_like(&self) -> Self {
        Self::new(self.limit)
    }
}
