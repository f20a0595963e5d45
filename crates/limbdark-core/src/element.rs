//! Element types shared with the host runtime
//!
//! Host buffers are tagged with a [`DType`]. An operator build computes in a
//! single [`Element`] type; any other tag on the input is a type error.

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type tag carried by host buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    U32,
}

impl DType {
    /// Size of one element in bytes
    pub const fn size_of(self) -> usize {
        match self {
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    /// NumPy-style name
    pub const fn name(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U32 => "uint32",
        }
    }

    /// Stable integer code used across the C ABI
    pub const fn code(self) -> i32 {
        match self {
            DType::F32 => 0,
            DType::F64 => 1,
            DType::I32 => 2,
            DType::I64 => 3,
            DType::U32 => 4,
        }
    }

    /// Inverse of [`DType::code`]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DType::F32),
            1 => Some(DType::F64),
            2 => Some(DType::I32),
            3 => Some(DType::I64),
            4 => Some(DType::U32),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Floating-point element an operator build computes in
///
/// `bytemuck::Pod` lets host bytes be reinterpreted in place.
pub trait Element: Float + bytemuck::Pod + fmt::Debug + Send + Sync + 'static {
    /// Tag the host must attach to buffers of this type
    const DTYPE: DType;

    /// Widen to f64 (exact for both implementors)
    fn as_f64(self) -> f64;

    /// Narrow from f64, rounding to nearest
    fn from_f64_rounded(value: f64) -> Self;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn from_f64_rounded(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn as_f64(self) -> f64 {
        self
    }

    fn from_f64_rounded(value: f64) -> Self {
        value
    }
}
