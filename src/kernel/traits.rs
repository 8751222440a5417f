//! Kernel contracts
//!
//! Two seams: [`KernelFunction`] for pairwise similarity between feature
//! vectors, and [`KernelAdapter`], the index-based surface the solver, the
//! row cache and the prediction engine consume.

use crate::core::{KernelMachineError, Result, SparseVector};

/// Pairwise kernel function
///
/// A kernel K(x, y) must satisfy Mercer's condition to be valid for training.
pub trait KernelFunction: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;
}

/// Optional fast paths a kernel may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelCapability {
    /// Scoring through a precomputed normal after [`KernelAdapter::init_optimization`]
    LinAdd,
    /// Scoring every right-hand-side vector in a single call
    Batch,
}

/// Index-based kernel surface over a pair of feature collections.
///
/// Left-hand indices address training vectors, right-hand indices the vectors
/// scored against them; during training both sides are the training set.
/// `compute` must be safe for concurrent read-only invocation: the prediction
/// engine calls it from several threads over disjoint index ranges.
pub trait KernelAdapter: Send + Sync {
    /// Number of left-hand (training) vectors
    fn num_lhs(&self) -> usize;

    /// Number of right-hand (query) vectors
    fn num_rhs(&self) -> usize;

    /// Kernel value between left-hand vector `i` and right-hand vector `j`
    fn compute(&self, i: usize, j: usize) -> f64;

    /// Declared byte budget for training-time row caching
    fn cache_size_bytes(&self) -> usize;

    /// Capability query; kernels support no fast paths unless they say so
    fn supports(&self, _capability: KernelCapability) -> bool {
        false
    }

    /// Prepare the LinAdd fast path from support vector indices and weights
    fn init_optimization(&mut self, _sv_indices: &[usize], _sv_weights: &[f64]) -> Result<()> {
        Err(KernelMachineError::UnsupportedCapability("linadd"))
    }

    /// Whether [`init_optimization`](Self::init_optimization) has been run
    fn is_optimization_initialized(&self) -> bool {
        false
    }

    /// Score right-hand vector `idx` against the prepared normal
    fn compute_optimized(&self, _idx: usize) -> Result<f64> {
        Err(KernelMachineError::UnsupportedCapability("linadd"))
    }

    /// Score every right-hand vector in one call, writing into `targets`.
    ///
    /// `targets` has one slot per right-hand vector; bias is the caller's
    /// concern.
    fn compute_batch(
        &self,
        _targets: &mut [f64],
        _sv_indices: &[usize],
        _sv_weights: &[f64],
    ) -> Result<()> {
        Err(KernelMachineError::UnsupportedCapability("batch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    impl KernelAdapter for Minimal {
        fn num_lhs(&self) -> usize {
            1
        }
        fn num_rhs(&self) -> usize {
            1
        }
        fn compute(&self, _i: usize, _j: usize) -> f64 {
            1.0
        }
        fn cache_size_bytes(&self) -> usize {
            1024
        }
    }

    #[test]
    fn test_default_capabilities_are_absent() {
        let mut kernel = Minimal;
        assert!(!kernel.supports(KernelCapability::LinAdd));
        assert!(!kernel.supports(KernelCapability::Batch));
        assert!(!kernel.is_optimization_initialized());
        assert!(kernel.init_optimization(&[], &[]).is_err());
        assert!(kernel.compute_optimized(0).is_err());
        assert!(kernel.compute_batch(&mut [0.0], &[], &[]).is_err());
    }
}
