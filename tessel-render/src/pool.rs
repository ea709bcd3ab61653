//! Free-list pools for per-pass scratch records.
//!
//! A layout pass borrows records with [`Pool::acquire`] and hands them back
//! with [`Pool::release`]. Acquire never fails: an empty pool allocates.
//! Release drops the record instead of keeping it once `max_retained`
//! records are held, so a burst can never grow the pool without bound.

/// A record that can be scrubbed for reuse.
pub trait Poolable: Default {
    /// Clear per-use state. Owned buffers should keep their capacity.
    fn reset(&mut self);
}

#[derive(Debug)]
pub struct Pool<T: Poolable> {
    free: Vec<T>,
    max_retained: usize,
    fresh_allocations: u64,
    peak_retained: usize,
}

impl<T: Poolable> Pool<T> {
    pub fn new(max_retained: usize) -> Self {
        Self::with_preallocated(0, max_retained)
    }

    /// Create a pool holding `count` ready records (capped at `max_retained`).
    pub fn with_preallocated(count: usize, max_retained: usize) -> Self {
        let count = count.min(max_retained);
        let mut free = Vec::with_capacity(count);
        free.resize_with(count, T::default);
        Self {
            free,
            max_retained,
            fresh_allocations: 0,
            peak_retained: count,
        }
    }

    #[inline]
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(item) => item,
            None => {
                self.fresh_allocations += 1;
                T::default()
            }
        }
    }

    #[inline]
    pub fn release(&mut self, mut item: T) {
        if self.free.len() < self.max_retained {
            item.reset();
            self.free.push(item);
            self.peak_retained = self.peak_retained.max(self.free.len());
        }
    }

    /// Records currently held for reuse.
    pub fn retained(&self) -> usize {
        self.free.len()
    }

    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Records allocated because the pool was empty.
    pub fn fresh_allocations(&self) -> u64 {
        self.fresh_allocations
    }

    pub fn peak_retained(&self) -> usize {
        self.peak_retained
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}
