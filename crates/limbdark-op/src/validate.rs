//! Input and output validation
//!
//! Input checks run before anything is allocated, so a rejected call leaves
//! no trace on the host.

use crate::error::{OpError, Result};
use crate::host::{InputBuffer, OutputBuffer};
use limbdark_core::{Element, ShapeContract};

/// Check the coefficient vector against the contract
///
/// Order: rank, then dtype, then length, then byte layout.
pub fn validate_input<T: Element>(input: &InputBuffer<'_>, contract: ShapeContract) -> Result<()> {
    if input.ndim() != 1 {
        return Err(OpError::Shape(format!(
            "u must be a vector, got rank {} array of shape {:?}",
            input.ndim(),
            input.shape()
        )));
    }

    if input.dtype() != T::DTYPE {
        return Err(OpError::Type {
            expected: T::DTYPE,
            actual: input.dtype(),
        });
    }

    let len = input.shape()[0];
    if len != contract.coefficients() {
        return Err(OpError::Shape(format!(
            "u must have length UMAX + 1 = {}, got {len}",
            contract.coefficients()
        )));
    }

    check_layout::<T>("input", input.bytes(), len)
}

/// Check a freshly allocated output buffer against the contract
///
/// A mismatch here is the host's fault and is reported as an allocation error.
pub fn validate_output<T: Element, B: OutputBuffer>(output: &mut B, contract: ShapeContract) -> Result<()> {
    let expected = contract.output_shape();
    if output.shape() != expected.as_slice() {
        return Err(OpError::Allocation(format!(
            "host returned shape {:?}, expected {expected:?}",
            output.shape()
        )));
    }

    if output.dtype() != T::DTYPE {
        return Err(OpError::Allocation(format!(
            "host returned {} buffer, expected {}",
            output.dtype(),
            T::DTYPE
        )));
    }

    check_layout::<T>("output", output.bytes_mut(), contract.output_len())
        .map_err(|err| OpError::Allocation(err.to_string()))
}

fn check_layout<T: Element>(what: &str, bytes: &[u8], len: usize) -> Result<()> {
    let expected = len * std::mem::size_of::<T>();
    if bytes.len() != expected {
        return Err(OpError::InvalidView(format!(
            "{what} holds {} bytes, expected {expected}",
            bytes.len()
        )));
    }

    if !bytes.is_empty() && (bytes.as_ptr() as usize) % std::mem::align_of::<T>() != 0 {
        return Err(OpError::InvalidView(format!(
            "{what} is not aligned to {} bytes",
            std::mem::align_of::<T>()
        )));
    }

    Ok(())
}
