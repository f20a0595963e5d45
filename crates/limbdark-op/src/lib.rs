//! # limbdark-op
//!
//! Binds the limb-darkening design-matrix engine to a host array runtime.
//!
//! A call takes a rank-1 coefficient vector `u` of length `UMAX + 1`, asks
//! the host for a fresh `NLU × N` output buffer, lazily constructs the
//! operator's engine, and has the engine write the design matrix directly
//! into host memory.
//!
//! ## Layout
//!
//! - [`host`] - the [`HostRuntime`] seam plus the in-process [`NativeHost`]
//! - [`validate`] - rank, dtype, length and layout checks
//! - [`view`] - zero-copy `ndarray` views over host bytes
//! - [`op`] - [`LimbDarkOp`], the operator itself
//! - [`ffi`] - C ABI for embedding hosts
//!
//! ## Example
//!
//! ```
//! use limbdark_core::LimbDark;
//! use limbdark_op::{HostArray, LimbDarkOp, NativeHost};
//!
//! let op = LimbDarkOp::<LimbDark<f64, 2, 3>>::new();
//! let host = NativeHost::new();
//! let u = HostArray::vector(&[-1.0, 0.4, 0.26]);
//!
//! let out = op.perform(&host, &u.as_input())?;
//! assert_eq!(out.shape(), &[36, 16]);
//! # Ok::<(), limbdark_op::OpError>(())
//! ```

pub mod error;
pub mod ffi;
pub mod host;
pub mod op;
mod slot;
pub mod status;
pub mod validate;
pub mod view;

pub use error::{OpError, Result};
pub use host::{HostAllocError, HostArray, HostRuntime, InputBuffer, NativeHost, OutputBuffer};
pub use op::LimbDarkOp;
pub use slot::EngineState;
pub use status::LimbDarkStatus;
