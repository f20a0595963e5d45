//! Status codes returned across the C ABI

use crate::error::OpError;

/// Result of a C ABI call. Zero is success; anything else means the output
/// buffer (if one was handed back) must not be read.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimbDarkStatus {
    Ok = 0,
    ShapeError = 1,
    TypeError = 2,
    AllocationError = 3,
    ComputationError = 4,
    InvalidArgument = 5,
    EngineError = 6,
    Panic = 7,
}

impl LimbDarkStatus {
    pub fn is_ok(self) -> bool {
        self == LimbDarkStatus::Ok
    }
}

impl From<&OpError> for LimbDarkStatus {
    fn from(err: &OpError) -> Self {
        err.status()
    }
}

impl From<LimbDarkStatus> for i32 {
    fn from(status: LimbDarkStatus) -> Self {
        status as i32
    }
}
