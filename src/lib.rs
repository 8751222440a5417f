//! Kernel machine training and inference core
//!
//! Represents a trained model as a weighted sum of kernel evaluations over
//! support vectors, scores points against it (sequentially or across worker
//! threads), and trains such models with a dual coordinate ascent solver
//! working against a bounded-memory cache of kernel rows.

pub mod cache;
pub mod core;
pub mod kernel;
pub mod predict;
pub mod solver;

// Re-export main types for convenience
pub use crate::cache::{CacheStats, KernelCache, RowGuard};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{KernelMachineError, Result};
pub use crate::kernel::{
    FeatureKernel, GaussianKernel, KernelAdapter, KernelCapability, KernelFunction, LinearKernel,
    PrecomputedKernel,
};
pub use crate::predict::PredictionEngine;
pub use crate::solver::{ConvergenceMonitor, DualAscentSolver};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
