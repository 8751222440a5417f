//! Collaborator seams consumed by the kernel machine core

use crate::core::SparseVector;

/// Opaque collection of feature vectors.
///
/// The core never touches vector contents directly; everything flows through
/// a kernel. Only the vector count is needed for sizing and validation.
pub trait FeatureCollection: Send + Sync {
    /// Number of vectors in the collection
    fn num_vectors(&self) -> usize;
}

impl FeatureCollection for Vec<SparseVector> {
    fn num_vectors(&self) -> usize {
        self.len()
    }
}

impl FeatureCollection for [SparseVector] {
    fn num_vectors(&self) -> usize {
        self.len()
    }
}

/// Observer notified with the current coefficients while training runs.
///
/// Invoked on the solver's diagnostic cadence. Implementations must not
/// mutate solver state; they only observe.
pub trait StepObserver: Send {
    /// Called with the iteration count, the current alphas and the running bias
    fn on_step(&mut self, iteration: u64, alphas: &[f64], bias: f64);
}

/// Observer that ignores all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&mut self, _iteration: u64, _alphas: &[f64], _bias: f64) {}
}
