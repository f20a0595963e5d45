//! Host-runtime seam: input descriptors, output allocation, and a native host
//!
//! The operator never allocates output storage itself. It asks a
//! [`HostRuntime`] for a fresh buffer of the declared shape and dtype and
//! writes into it in place; ownership of that buffer stays with the host.

use limbdark_core::{DType, Element};
use ndarray::ArrayView2;
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Borrowed description of a host input array
#[derive(Debug, Clone)]
pub struct InputBuffer<'a> {
    data: &'a [u8],
    shape: Cow<'a, [usize]>,
    dtype: DType,
}

impl<'a> InputBuffer<'a> {
    /// Describe raw host bytes. Nothing is checked here.
    pub fn new(data: &'a [u8], shape: &'a [usize], dtype: DType) -> Self {
        Self {
            data,
            shape: Cow::Borrowed(shape),
            dtype,
        }
    }

    /// Describe a typed rank-1 slice
    pub fn vector<T: Element>(values: &'a [T]) -> Self {
        Self {
            data: bytemuck::cast_slice(values),
            shape: Cow::Owned(vec![values.len()]),
            dtype: T::DTYPE,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }
}

/// Host refused or failed to allocate an output buffer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HostAllocError(pub String);

/// An output buffer owned by the host
pub trait OutputBuffer {
    fn shape(&self) -> &[usize];

    fn dtype(&self) -> DType;

    /// Writable storage, `product(shape) * dtype.size_of()` bytes
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// Allocation service provided by the host runtime
pub trait HostRuntime {
    type Output: OutputBuffer;

    /// Return a new buffer of exactly `shape` and `dtype`
    ///
    /// Every call must hand out fresh storage; the operator never reuses or
    /// aliases an earlier output.
    fn allocate_output(&self, shape: [usize; 2], dtype: DType) -> Result<Self::Output, HostAllocError>;
}

/// Heap array owned by [`NativeHost`]
///
/// Storage is kept in `u64` words so any supported element type can be
/// viewed without realignment.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    shape: Vec<usize>,
    dtype: DType,
    words: Vec<u64>,
    len_bytes: usize,
}

impl HostArray {
    /// Zero-filled array
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let len_bytes = shape.iter().product::<usize>() * dtype.size_of();
        Self {
            shape: shape.to_vec(),
            dtype,
            words: vec![0; len_bytes.div_ceil(8)],
            len_bytes,
        }
    }

    /// Copy typed values under an arbitrary shape
    ///
    /// The shape is taken as given, so deliberately inconsistent arrays can
    /// be built to exercise validation.
    pub fn from_elements<T: Element>(shape: &[usize], values: &[T]) -> Self {
        let src: &[u8] = bytemuck::cast_slice(values);
        let mut array = Self {
            shape: shape.to_vec(),
            dtype: T::DTYPE,
            words: vec![0; src.len().div_ceil(8)],
            len_bytes: src.len(),
        };
        array.bytes_mut().copy_from_slice(src);
        array
    }

    /// Rank-1 array holding `values`
    pub fn vector<T: Element>(values: &[T]) -> Self {
        Self::from_elements(&[values.len()], values)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len_bytes]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len_bytes]
    }

    /// Describe this array as operator input
    pub fn as_input(&self) -> InputBuffer<'_> {
        InputBuffer::new(self.bytes(), &self.shape, self.dtype)
    }

    /// Elements as `T`, or `None` when the dtype differs
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if self.dtype != T::DTYPE {
            return None;
        }
        bytemuck::try_cast_slice::<u8, T>(self.bytes()).ok().map(<[T]>::to_vec)
    }

    /// Rank-2 view, or `None` when the dtype or rank differs
    pub fn view2<T: Element>(&self) -> Option<ArrayView2<'_, T>> {
        if self.dtype != T::DTYPE || self.shape.len() != 2 {
            return None;
        }
        let values: &[T] = bytemuck::try_cast_slice(self.bytes()).ok()?;
        ArrayView2::from_shape((self.shape[0], self.shape[1]), values).ok()
    }
}

impl OutputBuffer for HostArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        HostArray::bytes_mut(self)
    }
}

/// In-process host that allocates [`HostArray`]s on the heap
#[derive(Debug, Default)]
pub struct NativeHost {
    allocations: AtomicUsize,
    byte_limit: Option<usize>,
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any allocation larger than `limit` bytes
    pub fn with_byte_limit(limit: usize) -> Self {
        Self {
            allocations: AtomicUsize::new(0),
            byte_limit: Some(limit),
        }
    }

    /// Successful allocations so far
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }
}

impl HostRuntime for NativeHost {
    type Output = HostArray;

    fn allocate_output(&self, shape: [usize; 2], dtype: DType) -> Result<HostArray, HostAllocError> {
        let bytes = shape[0]
            .checked_mul(shape[1])
            .and_then(|len| len.checked_mul(dtype.size_of()))
            .ok_or_else(|| HostAllocError(format!("output shape {shape:?} overflows")))?;

        if let Some(limit) = self.byte_limit {
            if bytes > limit {
                return Err(HostAllocError(format!(
                    "requested {bytes} bytes for {shape:?} {dtype}, limit is {limit}"
                )));
            }
        }

        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(HostArray::zeros(&shape, dtype))
    }
}
