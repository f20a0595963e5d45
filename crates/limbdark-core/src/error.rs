//! Error types for limbdark-core operations

/// Result type for limbdark-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the design-matrix engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A limb-darkening coefficient is NaN or infinite
    #[error("Limb-darkening coefficient u[{index}] is not finite")]
    NonFiniteCoefficient { index: usize },

    /// The disk-integrated intensity overflowed or underflowed past recovery
    #[error("Limb-darkened disk flux cannot be normalized")]
    DegenerateNormalization,

    /// A design-matrix entry does not fit the element type
    #[error("Design matrix entry ({row}, {col}) is not finite")]
    NonFiniteOutput { row: usize, col: usize },

    /// A view handed to the engine does not match its shape contract
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// Engine construction failed (resource exhaustion)
    #[error("Engine construction failed: {0}")]
    Construction(String),
}

impl Error {
    /// Build a shape mismatch from any pair of dimension lists
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
