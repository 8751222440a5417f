//! Kernel functions and adapters

pub mod adapter;
pub mod gaussian;
pub mod linear;
pub mod precomputed;
pub mod traits;

pub use self::adapter::*;
pub use self::gaussian::*;
pub use self::linear::*;
pub use self::precomputed::*;
pub use self::traits::*;
