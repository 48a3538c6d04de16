//! A dense adjacency matrix protected by a fixed-size array of stripe locks.
//!
//! Cells live in a single flat `Vec<AtomicU8>` so reads and single-cell
//! writes never block; the `Vec<Mutex<()>>` alongside it exists purely to
//! serialize the check-then-set sequence a caller needs across a whole
//! stripe of rows, mirroring the ordering technique `union_find` uses for
//! its parent table rather than wrapping the matrix itself in a lock.

use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicU8, Ordering},
};

use crate::error::GenerationError;

/// An `n x n` byte matrix over atomics, guarded for ordering purposes by `k`
/// stripe locks.
pub struct StripedAdjacencyMatrix {
    n: u64,
    cells: Vec<AtomicU8>,
    locks: Vec<Mutex<()>>,
}

impl StripedAdjacencyMatrix {
    /// Creates an `n x n` matrix of zeroed cells with `k` stripe locks.
    ///
    /// # Panics
    /// Panics if `n == 0` or `k == 0`, or if `n * n` overflows `usize`.
    #[must_use]
    pub fn new(n: u64, k: usize) -> Self {
        assert!(n > 0, "matrix dimension must be positive");
        assert!(k > 0, "stripe lock count must be positive");
        let cell_count = usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_mul(n))
            .expect("matrix dimension must fit in memory");

        let mut cells = Vec::with_capacity(cell_count);
        cells.resize_with(cell_count, || AtomicU8::new(0));

        let mut locks = Vec::with_capacity(k);
        locks.resize_with(k, || Mutex::new(()));

        Self { n, cells, locks }
    }

    /// The stripe lock index covering row `vertex`: `min(k - 1, floor(vertex
    /// * k / n))`.
    #[must_use]
    pub fn lock_index_for(&self, vertex: u64) -> usize {
        let k = self.locks.len() as u64;
        let raw = vertex.saturating_mul(k) / self.n;
        usize::try_from(raw.min(k - 1)).unwrap_or(self.locks.len() - 1)
    }

    /// Sorted, deduplicated stripe lock indices covering every vertex in
    /// `vertices`.
    #[must_use]
    pub fn lock_indices_for(&self, vertices: &[u64]) -> Vec<usize> {
        let mut indices: Vec<usize> = vertices.iter().map(|&v| self.lock_index_for(v)).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Acquires the locks at `indices` in ascending order, returning their
    /// guards in the same order. `indices` must already be sorted and
    /// deduplicated, as produced by [`Self::lock_indices_for`].
    ///
    /// # Errors
    /// Returns [`GenerationError::LockIndexOutOfRange`] if an index is out of
    /// range, or [`GenerationError::LockPoisoned`] if a lock was poisoned by
    /// a panicking holder.
    pub fn acquire_ordered(&self, indices: &[usize]) -> Result<Vec<MutexGuard<'_, ()>>, GenerationError> {
        let mut guards = Vec::with_capacity(indices.len());
        for &index in indices {
            let lock = self
                .locks
                .get(index)
                .ok_or(GenerationError::LockIndexOutOfRange {
                    index,
                    lock_count: self.locks.len(),
                })?;
            let guard = lock.lock().map_err(|_| GenerationError::LockPoisoned {
                resource: "adjacency matrix stripe lock",
            })?;
            guards.push(guard);
        }
        Ok(guards)
    }

    fn cell_index(&self, row: u64, col: u64) -> Result<usize, GenerationError> {
        let raw = row.saturating_mul(self.n).saturating_add(col);
        usize::try_from(raw)
            .ok()
            .filter(|&index| index < self.cells.len())
            .ok_or(GenerationError::CellIndexOutOfRange {
                index: usize::try_from(raw).unwrap_or(usize::MAX),
                cell_count: self.cells.len(),
            })
    }

    /// Reads whether `matrix[row][col] == 1`.
    ///
    /// # Errors
    /// Returns [`GenerationError::CellIndexOutOfRange`] if `row` or `col`
    /// fall outside the matrix.
    pub fn get(&self, row: u64, col: u64) -> Result<bool, GenerationError> {
        let index = self.cell_index(row, col)?;
        Ok(self.cells[index].load(Ordering::Acquire) == 1)
    }

    /// Sets `matrix[row][col] = 1`.
    ///
    /// # Errors
    /// Returns [`GenerationError::CellIndexOutOfRange`] if `row` or `col`
    /// fall outside the matrix.
    pub fn set(&self, row: u64, col: u64) -> Result<(), GenerationError> {
        let index = self.cell_index(row, col)?;
        self.cells[index].store(1, Ordering::Release);
        Ok(())
    }

    /// Sets both `matrix[a][b]` and `matrix[b][a]` to `1`, for symmetric
    /// matrices such as `mirror_adjacency_matrix`.
    ///
    /// # Errors
    /// Returns [`GenerationError::CellIndexOutOfRange`] if `a` or `b` fall
    /// outside the matrix.
    pub fn set_symmetric(&self, a: u64, b: u64) -> Result<(), GenerationError> {
        self.set(a, b)?;
        self.set(b, a)
    }

    /// Reads whether either `matrix[a][b]` or `matrix[b][a]` is `1`.
    ///
    /// # Errors
    /// Returns [`GenerationError::CellIndexOutOfRange`] if `a` or `b` fall
    /// outside the matrix.
    pub fn get_symmetric(&self, a: u64, b: u64) -> Result<bool, GenerationError> {
        Ok(self.get(a, b)? || self.get(b, a)?)
    }
}
