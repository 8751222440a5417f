//! Prediction engine
//!
//! Scores right-hand-side vectors against a trained model:
//! `f(x) = bias + sum_i alpha_i * K(sv_i, x)`. The generic path accumulates
//! per support vector; kernels that declare the batch or linadd capability
//! get their fast paths used instead. Scoring many points fans out over a
//! configured number of workers, each writing a disjoint slice of the
//! output.

use crate::core::{CancelToken, KernelMachineError, Result, SupportVectorModel};
use crate::kernel::{KernelAdapter, KernelCapability};

/// Scores query vectors against a borrowed model and kernel
pub struct PredictionEngine<'a, K: KernelAdapter> {
    model: &'a SupportVectorModel,
    kernel: &'a K,
    num_threads: usize,
    batch_enabled: bool,
    cancel: CancelToken,
}

impl<'a, K: KernelAdapter> PredictionEngine<'a, K> {
    /// Create an engine over a trained model and an initialized kernel
    pub fn new(model: &'a SupportVectorModel, kernel: &'a K) -> Self {
        Self {
            model,
            kernel,
            num_threads: 1,
            batch_enabled: true,
            cancel: CancelToken::new(),
        }
    }

    /// Set the parallelism degree for [`score_all`](Self::score_all).
    ///
    /// One worker runs the sequential code path with identical arithmetic.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    /// Enable or disable the batch-evaluation fast path
    pub fn with_batch_enabled(mut self, enabled: bool) -> Self {
        self.batch_enabled = enabled;
        self
    }

    /// Attach a cooperative cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Score a single right-hand-side vector by index
    pub fn score_one(&self, idx: usize) -> Result<f64> {
        self.validate()?;
        Ok(self.score_point(idx))
    }

    /// Score every right-hand-side vector.
    ///
    /// If cancellation is requested mid-run, the engine stops emitting
    /// further results and returns early; entries not reached stay zero and
    /// the caller detects the condition through the token.
    pub fn score_all(&self) -> Result<Vec<f64>> {
        self.validate()?;
        let m = self.kernel.num_rhs();

        if self.batch_enabled && self.kernel.supports(KernelCapability::Batch) {
            // one call for the whole m x num_sv accumulation
            let mut outputs = vec![0.0; m];
            self.kernel.compute_batch(
                &mut outputs,
                self.model.support_vector_indices(),
                self.model.alphas(),
            )?;
            let bias = self.model.bias();
            for value in &mut outputs {
                *value += bias;
            }
            return Ok(outputs);
        }

        let mut outputs = vec![0.0; m];
        if self.num_threads == 1 {
            for (idx, out) in outputs.iter_mut().enumerate() {
                if self.cancel.is_cancelled() {
                    break;
                }
                *out = self.score_point(idx);
            }
            return Ok(outputs);
        }

        // contiguous ranges of size m / T; the last worker absorbs the rest
        let threads = self.num_threads;
        let step = m / threads;
        rayon::scope(|scope| {
            let mut rest = outputs.as_mut_slice();
            for t in 0..threads {
                let take = if t + 1 == threads { rest.len() } else { step };
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(take);
                rest = tail;
                let start = t * step;
                scope.spawn(move |_| {
                    for (k, out) in chunk.iter_mut().enumerate() {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        *out = self.score_point(start + k);
                    }
                });
            }
        });
        Ok(outputs)
    }

    fn validate(&self) -> Result<()> {
        if self.model.num_support_vectors() == 0 {
            return Err(KernelMachineError::ModelNotTrained);
        }
        if self.kernel.num_rhs() == 0 {
            return Err(KernelMachineError::NoQueryVectors);
        }
        Ok(())
    }

    fn score_point(&self, idx: usize) -> f64 {
        if self.kernel.supports(KernelCapability::LinAdd)
            && self.kernel.is_optimization_initialized()
        {
            if let Ok(value) = self.kernel.compute_optimized(idx) {
                return value + self.model.bias();
            }
        }

        let mut sum = 0.0;
        let indices = self.model.support_vector_indices();
        let alphas = self.model.alphas();
        for (slot, &sv) in indices.iter().enumerate() {
            sum += alphas[slot] * self.kernel.compute(sv, idx);
        }
        sum + self.model.bias()
    }
}
