//! Pooled visited markers for grid searches.
//!
//! Each pocket search needs a "visited" flag per cell. Allocating and
//! clearing a grid-sized buffer for every seed would dominate the cost of
//! small searches, so the [`VisitArena`] keeps a pool of buffers and stamps
//! visits with a per-lease generation number instead of clearing.
//!
//! A [`VisitLease`] returns its buffer to the pool when dropped.

use std::sync::{Mutex, PoisonError};

/// A grid-sized buffer of generation stamps.
#[derive(Debug)]
struct VisitMarks {
    /// Generation stamp per cell index; equal to `generation` means visited.
    stamps: Vec<u32>,
    /// Generation of the current lease.
    generation: u32,
}

impl VisitMarks {
    fn with_size(size: usize) -> Self {
        Self {
            stamps: vec![0; size],
            generation: 0,
        }
    }

    /// Start a fresh lease: everything reads as unvisited afterwards.
    fn begin(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }
}

/// Pool of visited-marker buffers sized for one grid.
#[derive(Debug)]
pub struct VisitArena {
    /// Number of cells each buffer covers.
    size: usize,
    /// Idle buffers.
    pool: Mutex<Vec<VisitMarks>>,
}

impl VisitArena {
    /// Create an empty arena for grids of `size` cells.
    pub const fn new(size: usize) -> Self {
        Self {
            size,
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Borrow a cleared buffer, allocating one if the pool is empty.
    pub fn lease(&self) -> VisitLease<'_> {
        let recycled = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut marks = recycled.unwrap_or_else(|| VisitMarks::with_size(self.size));
        marks.begin();
        VisitLease {
            arena: self,
            marks: Some(marks),
        }
    }
}

/// A buffer checked out of a [`VisitArena`].
#[derive(Debug)]
pub struct VisitLease<'a> {
    arena: &'a VisitArena,
    marks: Option<VisitMarks>,
}

impl VisitLease<'_> {
    /// Mark `index` as visited. Returns `true` if it was not visited before
    /// in this lease; out-of-range indices are never marked.
    pub fn mark(&mut self, index: usize) -> bool {
        let Some(marks) = self.marks.as_mut() else {
            return false;
        };
        let generation = marks.generation;
        match marks.stamps.get_mut(index) {
            Some(stamp) if *stamp != generation => {
                *stamp = generation;
                true
            }
            _ => false,
        }
    }

    /// Whether `index` has been marked in this lease.
    pub fn is_marked(&self, index: usize) -> bool {
        self.marks.as_ref().is_some_and(|marks| {
            marks
                .stamps
                .get(index)
                .is_some_and(|stamp| *stamp == marks.generation)
        })
    }
}

impl Drop for VisitLease<'_> {
    fn drop(&mut self) {
        if let Some(marks) = self.marks.take() {
            self.arena
                .pool
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(marks);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_fresh_per_lease() {
        let arena = VisitArena::new(16);
        {
            let mut lease = arena.lease();
            assert!(lease.mark(3));
            assert!(!lease.mark(3));
            assert!(lease.is_marked(3));
            assert!(!lease.mark(99));
        }
        assert_eq!(arena.pool.lock().unwrap().len(), 1);

        let lease = arena.lease();
        assert!(!lease.is_marked(3));
        assert_eq!(arena.pool.lock().unwrap().len(), 0);
    }

    #[test]
    fn concurrent_leases_use_distinct_buffers() {
        let arena = VisitArena::new(4);
        let mut a = arena.lease();
        let mut b = arena.lease();
        assert!(a.mark(1));
        assert!(b.mark(1));
        drop(a);
        drop(b);
        assert_eq!(arena.pool.lock().unwrap().len(), 2);
    }
}
