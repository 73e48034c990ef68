//! Per-instance sizing policy.

use crate::error::{MapError, Result};

/// Bucket count of a map built without an explicit capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// Growth threshold of a map built without an explicit load factor.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Sizing policy handed to `UnorderedMap::with_config`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapConfig {
    pub initial_capacity: usize,
    pub max_load_factor: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, buckets: usize) -> Self {
        self.initial_capacity = buckets;
        self
    }

    pub fn max_load_factor(mut self, factor: f64) -> Self {
        self.max_load_factor = factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(MapError::InvalidCapacity);
        }
        check_load_factor(self.max_load_factor)
    }
}

pub(crate) fn check_load_factor(factor: f64) -> Result<()> {
    if factor.is_finite() && factor > 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidLoadFactor(factor))
    }
}
