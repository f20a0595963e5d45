//! Errors surfaced to the host by an operator call

use crate::status::LimbDarkStatus;
use limbdark_core::DType;

/// Result type for operator calls
pub type Result<T> = std::result::Result<T, OpError>;

/// Why an operator call failed
///
/// None of these poison the operator instance: the next call starts from
/// the same engine state.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// Wrong rank or length. Raised before allocation.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Wrong element type. Raised before allocation.
    #[error("Type error: expected {expected}, got {actual}")]
    Type { expected: DType, actual: DType },

    /// Host bytes cannot be viewed as the declared elements
    #[error("Invalid buffer view: {0}")]
    InvalidView(String),

    /// The host did not provide a conforming output buffer
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// The engine could not be constructed; the slot stays uninitialized
    #[error("Engine construction failed: {0}")]
    EngineConstruction(String),

    /// Numerical failure inside the engine; output contents are undefined
    #[error("Computation error: {0}")]
    Computation(#[from] limbdark_core::Error),
}

impl OpError {
    /// Status code reported across the C ABI
    pub fn status(&self) -> LimbDarkStatus {
        match self {
            OpError::Shape(_) => LimbDarkStatus::ShapeError,
            OpError::Type { .. } => LimbDarkStatus::TypeError,
            OpError::InvalidView(_) => LimbDarkStatus::InvalidArgument,
            OpError::Allocation(_) => LimbDarkStatus::AllocationError,
            OpError::EngineConstruction(_) => LimbDarkStatus::EngineError,
            OpError::Computation(_) => LimbDarkStatus::ComputationError,
        }
    }

    /// True when the caller supplied a bad input (as opposed to a host or engine failure)
    pub fn is_input_error(&self) -> bool {
        matches!(self, OpError::Shape(_) | OpError::Type { .. } | OpError::InvalidView(_))
    }
}
