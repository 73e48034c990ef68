//! Error types surfaced by the map and its allocation strategies.

use thiserror::Error;

/// Failure reported by a [`SlotAlloc`](crate::SlotAlloc) strategy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum AllocError {
    /// A bounded strategy has no free slot left.
    #[error("allocation strategy exhausted: all {limit} slots are in use")]
    Exhausted { limit: usize },
}

/// Errors returned by `UnorderedMap` operations.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum MapError {
    /// `at`/`at_mut` found no element with an equal key.
    #[error("no element with such key")]
    KeyNotFound,

    /// The payload or node allocation strategy refused an allocation.
    /// The map is left exactly as it was before the call.
    #[error("allocation failed: {0}")]
    Alloc(#[from] AllocError),

    /// Load factor thresholds must be finite and strictly positive.
    #[error("invalid max load factor: {0}")]
    InvalidLoadFactor(f64),

    /// The bucket array can never be empty.
    #[error("capacity must be at least one bucket")]
    InvalidCapacity,

    /// The requested bucket array is too large to allocate. The map keeps
    /// its previous table and policy.
    #[error("bucket array of {requested} entries cannot be allocated")]
    CapacityOverflow { requested: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MapError>;
