// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable object pool.
//!
//! Retained surfaces and scratch buffers churn every time a subtree toggles
//! caching or a mask is composited. [`Pool`] keeps released objects around
//! and hands them back out, always resetting them on release so nothing from
//! a previous use leaks into the next.

use alloc::vec::Vec;

/// Restores an object to its freshly constructed state.
pub trait Reset {
    /// Clears all state accumulated since construction.
    fn reset(&mut self);
}

/// A bounded free list of reset objects.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T: Reset> Pool<T> {
    /// Creates an empty pool that retains at most `capacity` released objects.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Pops a pooled object, or builds a new one with `create`.
    pub fn acquire_with(&mut self, create: impl FnOnce() -> T) -> T {
        self.free.pop().unwrap_or_else(create)
    }

    /// Pops a pooled object if one is available.
    pub fn try_acquire(&mut self) -> Option<T> {
        self.free.pop()
    }

    /// Resets `item` and stores it for reuse. Objects beyond the capacity are
    /// dropped.
    pub fn release(&mut self, mut item: T) {
        if self.free.len() >= self.capacity {
            return;
        }
        item.reset();
        self.free.push(item);
    }

    /// Number of objects waiting for reuse.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns `true` if no objects are waiting for reuse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl<T: Default + Reset> Pool<T> {
    /// Pops a pooled object, or builds a default one.
    pub fn acquire(&mut self) -> T {
        self.acquire_with(T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Scratch {
        value: u32,
        log: Vec<u32>,
    }

    impl Reset for Scratch {
        fn reset(&mut self) {
            self.value = 0;
            self.log.clear();
        }
    }

    #[test]
    fn released_objects_come_back_reset() {
        let mut pool = Pool::<Scratch>::new(4);
        let mut a = pool.acquire();
        a.value = 7;
        a.log.extend([1, 2, 3]);
        pool.release(a);
        assert_eq!(pool.len(), 1);

        let b = pool.acquire();
        assert_eq!(b, Scratch::default(), "no residual state");
        assert!(b.log.capacity() >= 3, "storage is reused");
        assert!(pool.is_empty());
    }

    #[test]
    fn capacity_bounds_the_free_list() {
        let mut pool = Pool::<Scratch>::new(1);
        pool.release(Scratch::default());
        pool.release(Scratch::default());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn acquire_with_only_creates_when_empty() {
        let mut pool = Pool::<Scratch>::new(2);
        let fresh = pool.acquire_with(|| Scratch {
            value: 9,
            log: Vec::new(),
        });
        assert_eq!(fresh.value, 9);
        pool.release(fresh);
        let reused = pool.acquire_with(|| Scratch {
            value: 9,
            log: Vec::new(),
        });
        assert_eq!(reused.value, 0, "pooled object wins over the factory");
        assert!(pool.try_acquire().is_none());
    }
}
