//! Kernel row cache
//!
//! Bounded-memory cache of full kernel matrix rows keyed by example index.
//! Rows are computed on demand through the kernel adapter and retained under
//! an LRU policy. A row handed out to a caller is pinned and exempt from
//! eviction until its guard is dropped, so the dominant cost of refilling a
//! row is only paid when it has genuinely fallen out of the budget.

use crate::core::{KernelMachineError, Result};
use crate::kernel::KernelAdapter;
use lru::LruCache;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

#[derive(Debug)]
struct CachedRow {
    values: Rc<Vec<f64>>,
    pins: u32,
}

#[derive(Debug)]
struct CacheInner {
    rows: LruCache<usize, CachedRow>,
    hits: u64,
    misses: u64,
}

/// LRU cache of kernel matrix rows with pinning
#[derive(Debug)]
pub struct KernelCache {
    inner: RefCell<CacheInner>,
    max_rows: usize,
    row_len: usize,
}

impl KernelCache {
    /// Create a cache with a byte budget for rows of `row_len` kernel values.
    ///
    /// A budget smaller than a single row is a configuration error.
    pub fn new(budget_bytes: usize, row_len: usize) -> Result<Self> {
        let row_bytes = row_len * std::mem::size_of::<f64>();
        if row_bytes == 0 || budget_bytes < row_bytes {
            return Err(KernelMachineError::CacheTooSmall {
                budget: budget_bytes,
                required: row_bytes,
            });
        }
        Ok(Self {
            inner: RefCell::new(CacheInner {
                rows: LruCache::unbounded(),
                hits: 0,
                misses: 0,
            }),
            max_rows: budget_bytes / row_bytes,
            row_len,
        })
    }

    /// Whether row `i` is resident, without touching recency
    pub fn is_cached(&self, i: usize) -> bool {
        self.inner.borrow().rows.peek(&i).is_some()
    }

    /// Pin row `i`, computing it through `kernel` if not resident.
    ///
    /// The returned guard dereferences to the row values and unpins on drop.
    /// Fails if the cache is full and every resident row is pinned.
    pub fn lock_row<'a, K: KernelAdapter + ?Sized>(
        &'a self,
        i: usize,
        kernel: &K,
    ) -> Result<RowGuard<'a>> {
        let mut inner = self.inner.borrow_mut();
        if let Some(row) = inner.rows.get_mut(&i) {
            row.pins += 1;
            let values = Rc::clone(&row.values);
            inner.hits += 1;
            return Ok(RowGuard {
                cache: self,
                index: i,
                values,
            });
        }

        inner.misses += 1;
        if inner.rows.len() >= self.max_rows {
            Self::evict_unpinned(&mut inner, i)?;
        }
        let values = Rc::new(
            (0..self.row_len)
                .map(|j| kernel.compute(i, j))
                .collect::<Vec<f64>>(),
        );
        inner.rows.put(
            i,
            CachedRow {
                values: Rc::clone(&values),
                pins: 1,
            },
        );
        Ok(RowGuard {
            cache: self,
            index: i,
            values,
        })
    }

    /// Drop the least recently used unpinned row to make room for `wanted`
    fn evict_unpinned(inner: &mut CacheInner, wanted: usize) -> Result<()> {
        let mut pinned = Vec::new();
        let mut evicted = false;
        while let Some((key, row)) = inner.rows.pop_lru() {
            if row.pins == 0 {
                evicted = true;
                break;
            }
            pinned.push((key, row));
        }
        // pinned rows go back; their refreshed recency is harmless
        for (key, row) in pinned {
            inner.rows.put(key, row);
        }
        if evicted {
            Ok(())
        } else {
            Err(KernelMachineError::AllRowsPinned(wanted))
        }
    }

    fn unpin(&self, i: usize) {
        if let Some(row) = self.inner.borrow_mut().rows.peek_mut(&i) {
            row.pins = row.pins.saturating_sub(1);
        }
    }

    /// Maximum number of resident rows under the byte budget
    pub fn capacity_rows(&self) -> usize {
        self.max_rows
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.borrow();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            capacity: self.max_rows,
            resident: inner.rows.len(),
        }
    }
}

/// Pinned view of one cached kernel row; unpins on drop
#[derive(Debug)]
pub struct RowGuard<'a> {
    cache: &'a KernelCache,
    index: usize,
    values: Rc<Vec<f64>>,
}

impl RowGuard<'_> {
    /// Index of the pinned row
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Deref for RowGuard<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        self.cache.unpin(self.index);
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub resident: usize,
}
