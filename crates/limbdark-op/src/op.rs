//! The operator: validation, allocation, lazy engine, delegation

use crate::error::{OpError, Result};
use crate::host::{HostRuntime, InputBuffer, OutputBuffer};
use crate::slot::{EngineSlot, EngineState};
use crate::{validate, view};
use limbdark_core::{CallMetrics, DType, DesignMatrixEngine, Element, MetricsSnapshot, OpMetrics, ShapeContract};
use limbdark_tracing::perf_span;
use parking_lot::Mutex;
use std::fmt;
use std::time::Instant;

/// Limb-darkening design-matrix operator bound to engine `E`
///
/// Each instance owns at most one engine, built on the first call that gets
/// past validation and allocation, and released when the instance is
/// dropped. Instances are `Sync`; concurrent calls on the same instance are
/// serialized on the engine slot.
pub struct LimbDarkOp<E: DesignMatrixEngine> {
    slot: Mutex<EngineSlot<E>>,
    metrics: OpMetrics,
}

impl<E: DesignMatrixEngine> LimbDarkOp<E> {
    /// New operator with an uninitialized engine. Never fails.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(EngineSlot::new()),
            metrics: OpMetrics::new(),
        }
    }

    /// Shape contract this operator was built for
    pub fn shape(&self) -> ShapeContract {
        E::SHAPE
    }

    /// `[NLU, N]`
    pub fn output_shape(&self) -> [usize; 2] {
        E::SHAPE.output_shape()
    }

    /// Element type accepted and produced
    pub fn dtype(&self) -> DType {
        <E::Elem as Element>::DTYPE
    }

    pub fn engine_state(&self) -> EngineState {
        self.slot.lock().state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Compute the design matrix for `input` into a fresh host buffer
    pub fn perform<H: HostRuntime>(&self, host: &H, input: &InputBuffer<'_>) -> Result<H::Output> {
        let mut output = None;
        self.perform_into(host, input, &mut output)?;
        output.ok_or_else(|| OpError::Allocation("no output buffer was produced".to_string()))
    }

    /// Compute the design matrix for `input`, publishing the buffer into `output`
    ///
    /// `output` is cleared first. It stays `None` when the call fails before
    /// allocation; once the host has allocated, the buffer is published even
    /// if a later step fails, so the host can reclaim it. Its contents are
    /// only meaningful on `Ok`.
    pub fn perform_into<H: HostRuntime>(
        &self,
        host: &H,
        input: &InputBuffer<'_>,
        output: &mut Option<H::Output>,
    ) -> Result<()> {
        *output = None;
        self.metrics.record_call();

        let _span = perf_span!("limbdark_perform", nlu = E::SHAPE.nlu(), n = E::SHAPE.n());
        let result = self.run(host, input, output);

        match &result {
            Ok(()) => self.metrics.record_success(),
            Err(err) => {
                self.metrics.record_failure();
                if err.is_input_error() {
                    tracing::warn!(error = %err, status = ?err.status(), "limbdark_perform_rejected");
                } else {
                    tracing::error!(error = %err, status = ?err.status(), "limbdark_perform_failed");
                }
            }
        }
        result
    }

    fn run<H: HostRuntime>(&self, host: &H, input: &InputBuffer<'_>, output: &mut Option<H::Output>) -> Result<()> {
        let contract = E::SHAPE;
        let start = Instant::now();

        validate::validate_input::<E::Elem>(input, contract)?;

        let buffer = host
            .allocate_output(contract.output_shape(), <E::Elem as Element>::DTYPE)
            .map_err(|err| OpError::Allocation(err.to_string()))?;
        let buffer = output.insert(buffer);
        validate::validate_output::<E::Elem, _>(&mut *buffer, contract)?;

        let mut slot = self.slot.lock();
        let engine = slot.get_or_construct(&self.metrics)?;

        let u = view::input_view::<E::Elem>(input.bytes(), contract.coefficients())?;
        let out = view::output_view::<E::Elem>(buffer.bytes_mut(), contract.output_shape())?;
        engine.compute_design_matrix(u, out)?;
        drop(slot);

        CallMetrics::new(contract, start).log();
        Ok(())
    }
}

impl<E: DesignMatrixEngine> Default for LimbDarkOp<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DesignMatrixEngine> Drop for LimbDarkOp<E> {
    fn drop(&mut self) {
        self.slot.get_mut().release(&self.metrics);
        self.metrics.snapshot().log();
    }
}

impl<E: DesignMatrixEngine> fmt::Debug for LimbDarkOp<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimbDarkOp")
            .field("shape", &E::SHAPE)
            .field("dtype", &self.dtype())
            .field("engine", &self.engine_state())
            .finish()
    }
}
