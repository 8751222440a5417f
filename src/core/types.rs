//! Core type definitions for the kernel machine

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        // Sort by indices
        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Trained kernel machine: support vector indices, their coefficients and a bias.
///
/// The model owns no feature data. Each entry of `support_vectors` is an index
/// into whatever feature collection the kernel was initialized with at training
/// time, paired with the coefficient at the same slot of `alphas` (labels are
/// already folded in, so scoring never needs them).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorModel {
    support_vectors: Vec<usize>,
    alphas: Vec<f64>,
    bias: f64,
}

impl SupportVectorModel {
    /// Create an empty, untrained model
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate exactly `n` support vector slots, discarding any previous content.
    ///
    /// Slots are zero-initialized and must be filled with [`set`](Self::set).
    pub fn create(&mut self, n: usize) {
        self.support_vectors = vec![0; n];
        self.alphas = vec![0.0; n];
    }

    /// Write slot `slot` with a training example index and its coefficient
    pub fn set(
        &mut self,
        slot: usize,
        sv_index: usize,
        alpha: f64,
    ) -> crate::core::Result<()> {
        if slot >= self.support_vectors.len() {
            return Err(crate::core::KernelMachineError::SlotOutOfBounds {
                slot,
                len: self.support_vectors.len(),
            });
        }
        self.support_vectors[slot] = sv_index;
        self.alphas[slot] = alpha;
        Ok(())
    }

    /// Number of support vectors
    pub fn num_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    /// Training example indices of the support vectors
    pub fn support_vector_indices(&self) -> &[usize] {
        &self.support_vectors
    }

    /// Label-folded coefficients, one per support vector
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// Get the bias term
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Set the bias term
    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }
}

/// How a training run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStatus {
    /// Stopping criteria were met
    Converged,
    /// The iteration cap was reached; the returned model is the current iterate
    MaxIterationsReached,
    /// Training was cancelled through the cancel token
    Cancelled,
}

impl TrainStatus {
    /// Whether the solver fully converged
    pub fn converged(&self) -> bool {
        matches!(self, TrainStatus::Converged)
    }
}

/// Result of a training run: the model plus diagnostic information
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The trained model
    pub model: SupportVectorModel,
    /// How the run terminated
    pub status: TrainStatus,
    /// Number of iterations performed
    pub iterations: u64,
}

/// Configuration for the dual ascent solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Primal stopping tolerance
    pub epsilon: f64,
    /// Safety cap on iterations; not expected to bind in practice
    pub max_iterations: u64,
    /// Multiplicative adjustment on both stopping tolerances
    pub stop_factor: f64,
    /// Snapping tolerance for alphas near the box boundary
    pub alpha_eps: f64,
    /// Iterations between objective diagnostics and cancellation polls
    pub diagnostic_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 1e-5,
            max_iterations: 1 << 30,
            stop_factor: 1.0,
            alpha_eps: 1e-12,
            diagnostic_interval: 10_000,
        }
    }
}

impl SolverConfig {
    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the primal stopping tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the stopping tolerance scale factor
    pub fn with_stop_factor(mut self, stop_factor: f64) -> Self {
        self.stop_factor = stop_factor;
        self
    }
}

/// Cooperative cancellation flag shared between a caller and running work.
///
/// Cancellation is polled, never signal-based: the prediction engine checks
/// the flag before every example and the solver checks it on its diagnostic
/// cadence. Cancelled work returns early with partial results; it does not
/// fail.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
