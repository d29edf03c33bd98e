//! Per-accessor decode cache.
//!
//! One decode per accessor index per import session. The slot map hands
//! each index its own mutex, so concurrent callers of the same index
//! serialize on that entry (the first computes, the rest wait and share
//! the single result) while different indices decode in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::DecodedAccessor;
use crate::util::Result;

type Slot = Arc<Mutex<Option<Arc<DecodedAccessor>>>>;

/// Thread-safe get-or-compute cache keyed by accessor index.
#[derive(Default, Debug)]
pub struct DecodeCache {
    slots: RwLock<HashMap<usize, Slot>>,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached value for `index`, computing it at most once.
    ///
    /// Errors are not cached: the import aborts on the first failure, so
    /// a failed slot is never revisited in practice.
    pub fn get_or_compute<F>(&self, index: usize, compute: F) -> Result<Arc<DecodedAccessor>>
    where
        F: FnOnce() -> Result<DecodedAccessor>,
    {
        let slot = {
            let slots = self.slots.read();
            match slots.get(&index) {
                Some(slot) => slot.clone(),
                None => {
                    drop(slots);
                    self.slots.write().entry(index).or_default().clone()
                }
            }
        };

        let mut guard = slot.lock();
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        let value = Arc::new(compute()?);
        *guard = Some(value.clone());
        Ok(value)
    }

    /// Peek at a cached value without computing.
    pub fn get(&self, index: usize) -> Option<Arc<DecodedAccessor>> {
        let slots = self.slots.read();
        let value = slots.get(&index)?.lock().clone();
        value
    }

    /// Number of slots holding a decoded value.
    pub fn len(&self) -> usize {
        let slots = self.slots.read();
        slots.values().filter(|s| s.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
