//! Training loop for the kernel machine
//!
//! A dual coordinate ascent solver in the style of minimal primal-dual SVM
//! training: one violating variable is stepped at a time against a cached
//! kernel row, with the bias treated as an extra dual variable.

pub mod dual_ascent;
pub mod monitor;

pub use self::dual_ascent::*;
pub use self::monitor::*;
