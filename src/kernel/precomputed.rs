//! Precomputed kernel
//!
//! Adapter over an explicitly materialized kernel matrix. Useful for small
//! problems, for kernels computed by external tooling, and for exercising
//! the solver and cache against exact values.

use crate::core::{KernelMachineError, Result, SparseVector};
use crate::kernel::{KernelAdapter, KernelFunction};

/// Kernel adapter backed by an explicit `num_lhs x num_rhs` matrix
#[derive(Debug)]
pub struct PrecomputedKernel {
    matrix: Vec<Vec<f64>>,
    cache_bytes: usize,
}

impl PrecomputedKernel {
    /// Create an adapter from a rectangular matrix of kernel values
    pub fn new(matrix: Vec<Vec<f64>>, cache_bytes: usize) -> Result<Self> {
        if let Some(first) = matrix.first() {
            let width = first.len();
            if matrix.iter().any(|row| row.len() != width) {
                return Err(KernelMachineError::InvalidParameter(
                    "kernel matrix rows have unequal lengths".to_string(),
                ));
            }
        }
        Ok(Self {
            matrix,
            cache_bytes,
        })
    }

    /// Materialize the matrix of a pairwise function over feature collections
    pub fn from_features<F: KernelFunction>(
        function: &F,
        lhs: &[SparseVector],
        rhs: &[SparseVector],
        cache_bytes: usize,
    ) -> Self {
        let matrix = lhs
            .iter()
            .map(|x| rhs.iter().map(|y| function.compute(x, y)).collect())
            .collect();
        Self {
            matrix,
            cache_bytes,
        }
    }
}

impl KernelAdapter for PrecomputedKernel {
    fn num_lhs(&self) -> usize {
        self.matrix.len()
    }

    fn num_rhs(&self) -> usize {
        self.matrix.first().map_or(0, |row| row.len())
    }

    fn compute(&self, i: usize, j: usize) -> f64 {
        self.matrix[i][j]
    }

    fn cache_size_bytes(&self) -> usize {
        self.cache_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::LinearKernel;

    #[test]
    fn test_precomputed_kernel_lookup() {
        let kernel =
            PrecomputedKernel::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 4096).unwrap();
        assert_eq!(kernel.num_lhs(), 2);
        assert_eq!(kernel.num_rhs(), 2);
        assert_eq!(kernel.compute(1, 0), 3.0);
        assert_eq!(kernel.cache_size_bytes(), 4096);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = PrecomputedKernel::new(vec![vec![1.0, 2.0], vec![3.0]], 4096).unwrap_err();
        assert!(matches!(err, KernelMachineError::InvalidParameter(_)));
    }

    #[test]
    fn test_from_features_matches_function() {
        let points = vec![
            SparseVector::new(vec![0], vec![2.0]),
            SparseVector::new(vec![0], vec![-1.0]),
        ];
        let function = LinearKernel::new();
        let kernel = PrecomputedKernel::from_features(&function, &points, &points, 4096);

        assert_eq!(kernel.compute(0, 0), 4.0);
        assert_eq!(kernel.compute(0, 1), -2.0);
        assert_eq!(kernel.compute(1, 1), 1.0);
    }
}
