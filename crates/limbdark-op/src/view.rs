//! Zero-copy views over host memory

use crate::error::{OpError, Result};
use limbdark_core::Element;
use ndarray::{ArrayView1, ArrayViewMut2};

/// Read-only rank-1 view of `len` elements
pub fn input_view<T: Element>(bytes: &[u8], len: usize) -> Result<ArrayView1<'_, T>> {
    let values: &[T] =
        bytemuck::try_cast_slice(bytes).map_err(|err| OpError::InvalidView(format!("input: {err}")))?;
    ArrayView1::from_shape(len, values).map_err(|err| OpError::InvalidView(format!("input: {err}")))
}

/// Writable row-major view of the host output buffer
///
/// Writes through the view land directly in host storage.
pub fn output_view<T: Element>(bytes: &mut [u8], shape: [usize; 2]) -> Result<ArrayViewMut2<'_, T>> {
    let values: &mut [T] =
        bytemuck::try_cast_slice_mut(bytes).map_err(|err| OpError::InvalidView(format!("output: {err}")))?;
    ArrayViewMut2::from_shape((shape[0], shape[1]), values)
        .map_err(|err| OpError::InvalidView(format!("output: {err}")))
}
