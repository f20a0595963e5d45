//! # limbdark-core
//!
//! Numerics and shared types behind the limb-darkening design-matrix
//! operator.
//!
//! Given coefficients `u` (length `UMAX + 1`), the engine produces the
//! `NLU × N` matrix that maps the coefficients of a degree-`ydeg` surface
//! map onto the coefficients of the same map multiplied by the
//! limb-darkening profile, flux-normalized. Light-curve code downstream
//! multiplies this matrix into its rotation and flux-integral operators.
//!
//! ## Layout
//!
//! - [`shape`] - the build-time (UMAX, NLU, N) contract
//! - [`element`] - host dtype tags and the `f32`/`f64` element trait
//! - [`basis`] - polynomial map basis and `z`-power products
//! - [`engine`] - the [`DesignMatrixEngine`] seam and the [`LimbDark`] engine
//! - [`instrumentation`] - per-instance counters and call metrics
//!
//! ## Example
//!
//! ```
//! use limbdark_core::{DesignMatrixEngine, LimbDark};
//! use ndarray::{arr1, Array2};
//!
//! let engine = LimbDark::<f64, 2, 1>::construct()?;
//! let [rows, cols] = LimbDark::<f64, 2, 1>::SHAPE.output_shape();
//! let mut out = Array2::<f64>::zeros((rows, cols));
//! engine.compute_design_matrix(arr1(&[-1.0, 0.4, 0.26]).view(), out.view_mut())?;
//! assert_eq!(out.dim(), (16, 4));
//! # Ok::<(), limbdark_core::Error>(())
//! ```

pub mod basis;
pub mod element;
pub mod engine;
pub mod error;
pub mod instrumentation;
pub mod shape;

pub use element::{DType, Element};
pub use engine::{DesignMatrixEngine, LimbDark};
pub use error::{Error, Result};
pub use instrumentation::{CallMetrics, MetricsSnapshot, OpMetrics};
pub use shape::ShapeContract;
