use thiserror::Error;

/// Numeric failure modes shared by the matrix and tensor crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operand dimensions are incompatible for `op`.
    #[error("{op}: shape mismatch {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    /// A matrix or tensor was requested with a zero-sized axis.
    #[error("{what}: every dimension must be non-zero, got {dims:?}")]
    InvalidConstruction { what: &'static str, dims: Vec<usize> },

    /// Layer geometry that cannot produce a whole-numbered output.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::ShapeMismatch`] from borrowed dimension lists.
    pub fn shape_mismatch(op: &'static str, left: &[usize], right: &[usize]) -> Self {
        Error::ShapeMismatch {
            op,
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}
