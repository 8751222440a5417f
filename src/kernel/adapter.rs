//! Feature-backed kernel adapter
//!
//! Lifts a pairwise [`KernelFunction`] over a pair of feature collections to
//! the index-based [`KernelAdapter`] surface consumed by the solver, cache
//! and prediction engine.

use crate::core::{FeatureCollection, KernelMachineError, Result, SparseVector};
use crate::kernel::{KernelAdapter, KernelFunction};
use std::sync::Arc;

/// Index-based adapter over left- and right-hand sparse feature collections
pub struct FeatureKernel<F: KernelFunction> {
    function: F,
    lhs: Arc<Vec<SparseVector>>,
    rhs: Arc<Vec<SparseVector>>,
    cache_bytes: usize,
}

impl<F: KernelFunction> FeatureKernel<F> {
    /// Create an adapter with no features attached yet
    pub fn new(function: F, cache_bytes: usize) -> Self {
        Self {
            function,
            lhs: Arc::new(Vec::new()),
            rhs: Arc::new(Vec::new()),
            cache_bytes,
        }
    }

    /// Attach feature collections.
    ///
    /// `lhs` are the training vectors; `rhs` the vectors scored against them.
    /// For training, pass the same collection on both sides.
    pub fn init(
        &mut self,
        lhs: Arc<Vec<SparseVector>>,
        rhs: Arc<Vec<SparseVector>>,
    ) -> Result<()> {
        if lhs.num_vectors() == 0 {
            return Err(KernelMachineError::InvalidParameter(
                "left-hand feature collection is empty".to_string(),
            ));
        }
        self.lhs = lhs;
        self.rhs = rhs;
        Ok(())
    }

    /// The attached left-hand feature collection
    pub fn lhs(&self) -> &Arc<Vec<SparseVector>> {
        &self.lhs
    }

    /// The attached right-hand feature collection
    pub fn rhs(&self) -> &Arc<Vec<SparseVector>> {
        &self.rhs
    }
}

impl<F: KernelFunction> KernelAdapter for FeatureKernel<F> {
    fn num_lhs(&self) -> usize {
        self.lhs.len()
    }

    fn num_rhs(&self) -> usize {
        self.rhs.len()
    }

    fn compute(&self, i: usize, j: usize) -> f64 {
        self.function.compute(&self.lhs[i], &self.rhs[j])
    }

    fn cache_size_bytes(&self) -> usize {
        self.cache_bytes
    }
}
