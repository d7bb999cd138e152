//! Dense linear algebra for the sumi training engine: `Vector`, `Matrix`
//! and the fan-out parallel matrix multiply.
//!
//! Everything is `f64` and row-major. Operations return new values; shape
//! incompatibilities surface as [`Error::ShapeMismatch`] before any work is
//! done.

mod dot;
mod error;
mod matrix;
mod vector;

pub use error::{Error, Result};
pub use matrix::Matrix;
pub use vector::Vector;

/// Added inside `log` by the cross-entropy to keep `log(0)` finite.
pub const LOG_EPSILON: f64 = 1e-7;
