//! C ABI for hosts that embed the operator
//!
//! The exported operator works on `f64` with degrees fixed at build time
//! (`LIMBDARK_UDEG`, `LIMBDARK_YDEG`). Operators are opaque heap handles;
//! output buffers are allocated by the host through a callback and handed
//! back as the host's own opaque handle. Every call returns a
//! [`LimbDarkStatus`] code and never unwinds across the boundary.

use crate::error::OpError;
use crate::host::{HostAllocError, HostRuntime, InputBuffer, OutputBuffer};
use crate::op::LimbDarkOp;
use crate::slot::EngineState;
use crate::status::LimbDarkStatus;
use limbdark_core::{DType, DesignMatrixEngine, LimbDark, ShapeContract};
use std::any::Any;
use std::cell::Cell;
use std::ffi::{c_char, c_void, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

include!(concat!(env!("OUT_DIR"), "/build_config.rs"));

/// Engine compiled into the C ABI
pub type BuildEngine = LimbDark<f64, BUILD_UDEG, BUILD_YDEG>;

/// Operator compiled into the C ABI
pub type BuildOp = LimbDarkOp<BuildEngine>;

/// Shape contract compiled into the C ABI
pub const BUILD_SHAPE: ShapeContract = ShapeContract::from_degrees(BUILD_UDEG, BUILD_YDEG);

/// Bumped on any incompatible change to the exported signatures
pub const LIMBDARK_ABI_VERSION: u32 = 1;

/// Opaque operator handle
pub type LimbDarkOpHandle = *mut c_void;

/// Host array descriptor
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LimbDarkArray {
    pub data: *const u8,
    pub len_bytes: usize,
    pub ndim: usize,
    pub shape: *const usize,
    /// [`DType::code`]
    pub dtype: i32,
}

/// Host allocation callback
///
/// Must return a fresh host buffer handle of `shape` and `dtype`, writing
/// its writable storage to `data_out` and its size to `len_bytes_out`, or
/// return null on failure. A non-null handle is always handed back through
/// `limbdark_op_perform`'s `output`, even if the call later fails.
pub type LimbDarkAllocFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    ndim: usize,
    shape: *const usize,
    dtype: i32,
    data_out: *mut *mut u8,
    len_bytes_out: *mut usize,
) -> *mut c_void;

/// Host reached through an allocation callback
///
/// Remembers the last handle the host returned so it can be handed back
/// even when the call unwinds.
struct CallbackHost {
    alloc: LimbDarkAllocFn,
    ctx: *mut c_void,
    allocated: Cell<*mut c_void>,
}

impl CallbackHost {
    fn new(alloc: LimbDarkAllocFn, ctx: *mut c_void) -> Self {
        Self {
            alloc,
            ctx,
            allocated: Cell::new(ptr::null_mut()),
        }
    }
}

/// Host buffer returned by the allocation callback
struct CallbackBuffer {
    data: *mut u8,
    len_bytes: usize,
    shape: [usize; 2],
    dtype: DType,
}

impl OutputBuffer for CallbackBuffer {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        if self.data.is_null() {
            return &mut [];
        }
        // SAFETY: the allocation callback promises `len_bytes` writable bytes
        // at `data` for at least the duration of the perform call.
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len_bytes) }
    }
}

impl HostRuntime for CallbackHost {
    type Output = CallbackBuffer;

    fn allocate_output(&self, shape: [usize; 2], dtype: DType) -> Result<CallbackBuffer, HostAllocError> {
        let mut data = ptr::null_mut();
        let mut len_bytes = 0;
        // SAFETY: the caller of `limbdark_op_perform` vouches for `alloc` and `ctx`.
        let handle = unsafe { (self.alloc)(self.ctx, shape.len(), shape.as_ptr(), dtype.code(), &mut data, &mut len_bytes) };
        if handle.is_null() {
            return Err(HostAllocError(format!("host could not allocate {shape:?} {dtype}")));
        }
        self.allocated.set(handle);
        // Layout problems are caught by output validation once the handle
        // has been published.
        Ok(CallbackBuffer {
            data,
            len_bytes,
            shape,
            dtype,
        })
    }
}

unsafe fn set_error_message(error_msg: *mut *mut c_char, message: &str) {
    if error_msg.is_null() {
        return;
    }
    if let Ok(text) = CString::new(message.replace('\0', "\u{fffd}")) {
        *error_msg = text.into_raw();
    }
}

unsafe fn fail(error_msg: *mut *mut c_char, status: LimbDarkStatus, message: &str) -> i32 {
    set_error_message(error_msg, message);
    status.into()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: unknown payload".to_string()
    }
}

/// Borrow a host descriptor as an [`InputBuffer`]
///
/// # Safety
/// Non-null pointers in `array` must be valid for the sizes it declares.
unsafe fn input_buffer(array: &LimbDarkArray) -> Result<InputBuffer<'_>, OpError> {
    let dtype = DType::from_code(array.dtype)
        .ok_or_else(|| OpError::InvalidView(format!("unknown dtype code {}", array.dtype)))?;

    let shape: &[usize] = match (array.ndim, array.shape.is_null()) {
        (0, _) => &[],
        (_, true) => return Err(OpError::InvalidView("shape pointer is null".to_string())),
        (ndim, false) => std::slice::from_raw_parts(array.shape, ndim),
    };

    let data: &[u8] = match (array.len_bytes, array.data.is_null()) {
        (0, _) => &[],
        (_, true) => return Err(OpError::InvalidView("data pointer is null".to_string())),
        (len, false) => std::slice::from_raw_parts(array.data, len),
    };

    Ok(InputBuffer::new(data, shape, dtype))
}

/// ABI version of this library
#[no_mangle]
pub extern "C" fn limbdark_abi_version() -> u32 {
    LIMBDARK_ABI_VERSION
}

/// Write the compiled `UMAX`, `NLU` and `N`. Null outputs are skipped.
///
/// # Safety
/// Non-null pointers must be valid for a `usize` write.
#[no_mangle]
pub unsafe extern "C" fn limbdark_op_shape(umax_out: *mut usize, nlu_out: *mut usize, n_out: *mut usize) -> i32 {
    if !umax_out.is_null() {
        *umax_out = BUILD_SHAPE.umax();
    }
    if !nlu_out.is_null() {
        *nlu_out = BUILD_SHAPE.nlu();
    }
    if !n_out.is_null() {
        *n_out = BUILD_SHAPE.n();
    }
    LimbDarkStatus::Ok.into()
}

/// Create an operator. The engine is built lazily on first use.
#[no_mangle]
pub extern "C" fn limbdark_op_new() -> LimbDarkOpHandle {
    Box::into_raw(Box::new(BuildOp::new())) as LimbDarkOpHandle
}

/// Destroy an operator, releasing its engine.
///
/// # Safety
/// `op` must be a handle returned by `limbdark_op_new`, or null, and must
/// not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn limbdark_op_free(op: LimbDarkOpHandle) {
    if !op.is_null() {
        drop(Box::from_raw(op as *mut BuildOp));
    }
}

/// 1 if the operator's engine has been constructed, 0 if not, -1 for null
///
/// # Safety
/// `op` must be a live handle returned by `limbdark_op_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn limbdark_op_engine_ready(op: LimbDarkOpHandle) -> i32 {
    if op.is_null() {
        return -1;
    }
    let op = &*(op as *const BuildOp);
    match op.engine_state() {
        EngineState::Ready => 1,
        EngineState::Uninitialized => 0,
    }
}

/// Compute the design matrix for `input` into a host-allocated buffer
///
/// `*output` receives the host handle produced by `alloc`, or null when the
/// call failed before allocation. On a non-zero status the buffer contents
/// are undefined and `*error_msg` (if requested) holds a message to be
/// released with `limbdark_string_free`.
///
/// # Safety
/// `op` must be a live handle from `limbdark_op_new`. `input` must point to
/// a valid descriptor. `output` must be valid for a pointer write.
/// `error_msg` may be null. `alloc` must honor [`LimbDarkAllocFn`].
#[no_mangle]
pub unsafe extern "C" fn limbdark_op_perform(
    op: LimbDarkOpHandle,
    input: *const LimbDarkArray,
    alloc: Option<LimbDarkAllocFn>,
    alloc_ctx: *mut c_void,
    output: *mut *mut c_void,
    error_msg: *mut *mut c_char,
) -> i32 {
    if !error_msg.is_null() {
        *error_msg = ptr::null_mut();
    }
    if !output.is_null() {
        *output = ptr::null_mut();
    }

    let alloc = match alloc {
        Some(alloc) if !op.is_null() && !input.is_null() && !output.is_null() => alloc,
        _ => {
            return fail(
                error_msg,
                LimbDarkStatus::InvalidArgument,
                "operator, input, output and allocator must be non-null",
            )
        }
    };

    perform_guarded(&*(op as *const BuildOp), &*input, alloc, alloc_ctx, output, error_msg)
}

/// Run one operator call behind `catch_unwind`
///
/// Whatever the outcome, `*output` receives the handle the host allocated
/// during the call (null if it never did).
///
/// # Safety
/// Same contract as [`limbdark_op_perform`], with every pointer non-null
/// except `error_msg`.
unsafe fn perform_guarded<E: DesignMatrixEngine>(
    op: &LimbDarkOp<E>,
    input: &LimbDarkArray,
    alloc: LimbDarkAllocFn,
    alloc_ctx: *mut c_void,
    output: *mut *mut c_void,
    error_msg: *mut *mut c_char,
) -> i32 {
    let host = CallbackHost::new(alloc, alloc_ctx);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let input = input_buffer(input)?;
        op.perform_into(&host, &input, &mut None)
    }));
    *output = host.allocated.get();

    match outcome {
        Ok(Ok(())) => LimbDarkStatus::Ok.into(),
        Ok(Err(err)) => fail(error_msg, err.status(), &err.to_string()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "limbdark_perform_panicked");
            fail(error_msg, LimbDarkStatus::Panic, &message)
        }
    }
}

/// Release a message returned through `error_msg`
///
/// # Safety
/// `s` must come from this library's `error_msg`, or be null.
#[no_mangle]
pub unsafe extern "C" fn limbdark_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Install a global subscriber from `LIMBDARK_TRACING_*` variables
///
/// Returns 1 if installed, 0 if a subscriber was already set.
#[no_mangle]
pub extern "C" fn limbdark_tracing_init() -> i32 {
    i32::from(limbdark_tracing::init_from_env())
}
