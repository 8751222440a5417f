//! Error types for the kernel machine core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelMachineError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Label count mismatch: kernel has {expected} left-hand vectors, got {actual} labels")]
    LabelCountMismatch { expected: usize, actual: usize },

    #[error("Empty training set")]
    EmptyTrainingSet,

    #[error("Cache budget of {budget} bytes cannot hold a single row of {required} bytes")]
    CacheTooSmall { budget: usize, required: usize },

    #[error("All cached rows are pinned; cannot make room for row {0}")]
    AllRowsPinned(usize),

    #[error("Support vector slot {slot} out of bounds for model of size {len}")]
    SlotOutOfBounds { slot: usize, len: usize },

    #[error("Kernel does not support the {0} capability")]
    UnsupportedCapability(&'static str),

    #[error("Kernel has no right-hand-side vectors to score")]
    NoQueryVectors,

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Optimization stalled: {0}")]
    OptimizationStalled(String),

    #[error("Degenerate training set: {0}")]
    DegenerateTrainingSet(String),
}

pub type Result<T> = std::result::Result<T, KernelMachineError>;
