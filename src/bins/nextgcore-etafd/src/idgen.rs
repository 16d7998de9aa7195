//! Identifier Allocator
//!
//! Cycling integer allocator over `[min, max]` with reuse of freed IDs.
//! Allocation walks forward from the last issued offset and skips IDs that
//! are still live, so freed IDs come back only after the cursor wraps.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{ContextError, ContextResult};

#[derive(Debug)]
struct IdGeneratorInner {
    /// Next offset (relative to `min`) to try
    offset: i64,
    /// Live IDs
    used: HashSet<i64>,
}

/// Thread-safe cycling ID generator
#[derive(Debug)]
pub struct IdGenerator {
    min: i64,
    max: i64,
    inner: Mutex<IdGeneratorInner>,
}

impl IdGenerator {
    /// Create a generator over the inclusive range `[min, max]`
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            inner: Mutex::new(IdGeneratorInner {
                offset: 0,
                used: HashSet::new(),
            }),
        }
    }

    /// Lower bound of the range
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound of the range
    pub fn max(&self) -> i64 {
        self.max
    }

    fn lock(&self) -> MutexGuard<'_, IdGeneratorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn span(&self) -> i64 {
        self.max - self.min + 1
    }

    /// Allocate the next free ID
    pub fn allocate(&self) -> ContextResult<i64> {
        let span = self.span();
        if span <= 0 {
            return Err(ContextError::IdExhausted {
                min: self.min,
                max: self.max,
            });
        }

        let mut inner = self.lock();
        let start = inner.offset;
        loop {
            let id = self.min + inner.offset;
            inner.offset = (inner.offset + 1) % span;
            if inner.used.insert(id) {
                return Ok(id);
            }
            if inner.offset == start {
                return Err(ContextError::IdExhausted {
                    min: self.min,
                    max: self.max,
                });
            }
        }
    }

    /// Return an ID to the pool
    pub fn free(&self, id: i64) -> ContextResult<()> {
        if id < self.min || id > self.max {
            return Err(ContextError::IdOutOfRange {
                id,
                min: self.min,
                max: self.max,
            });
        }
        if self.lock().used.remove(&id) {
            Ok(())
        } else {
            Err(ContextError::IdNotAllocated(id))
        }
    }

    /// Whether `id` is currently live
    pub fn is_allocated(&self, id: i64) -> bool {
        self.lock().used.contains(&id)
    }

    /// Number of live IDs
    pub fn allocated_count(&self) -> usize {
        self.lock().used.len()
    }

    /// Drop every live ID and rewind the cursor
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.offset = 0;
        inner.used.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_allocate_sequential() {
        let idgen = IdGenerator::new(1, 10);
        assert_eq!(idgen.allocate().unwrap(), 1);
        assert_eq!(idgen.allocate().unwrap(), 2);
        assert_eq!(idgen.allocate().unwrap(), 3);
        assert_eq!(idgen.allocated_count(), 3);
    }

    #[test]
    fn test_single_slot_exhaustion() {
        let idgen = IdGenerator::new(1, 1);
        assert_eq!(idgen.allocate().unwrap(), 1);
        let err = idgen.allocate().unwrap_err();
        assert!(err.is_exhausted());
    }

    #[test]
    fn test_freed_id_reused_after_wrap() {
        let idgen = IdGenerator::new(1, 3);
        assert_eq!(idgen.allocate().unwrap(), 1);
        assert_eq!(idgen.allocate().unwrap(), 2);
        idgen.free(1).unwrap();
        assert_eq!(idgen.allocate().unwrap(), 3);
        // Cursor wraps, 1 is free again, 2 is skipped while live
        assert_eq!(idgen.allocate().unwrap(), 1);
        assert!(idgen.allocate().is_err());
    }

    #[test]
    fn test_double_free_rejected() {
        let idgen = IdGenerator::new(1, 5);
        let id = idgen.allocate().unwrap();
        idgen.free(id).unwrap();
        assert!(matches!(
            idgen.free(id),
            Err(ContextError::IdNotAllocated(x)) if x == id
        ));
    }

    #[test]
    fn test_free_out_of_range() {
        let idgen = IdGenerator::new(1, 5);
        assert!(matches!(
            idgen.free(6),
            Err(ContextError::IdOutOfRange { id: 6, .. })
        ));
    }

    #[test]
    fn test_reset() {
        let idgen = IdGenerator::new(1, 2);
        idgen.allocate().unwrap();
        idgen.allocate().unwrap();
        idgen.reset();
        assert_eq!(idgen.allocated_count(), 0);
        assert_eq!(idgen.allocate().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_allocation_unique() {
        let idgen = Arc::new(IdGenerator::new(1, 10_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let idgen = Arc::clone(&idgen);
                thread::spawn(move || {
                    (0..500)
                        .map(|_| idgen.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(all.len(), 4000);
    }
}
