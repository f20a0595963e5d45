//! Lazily constructed engine owned by one operator instance

use crate::error::{OpError, Result};
use limbdark_core::{DesignMatrixEngine, Element, OpMetrics};
use limbdark_tracing::perf_event;

/// Observable lifecycle of an operator's engine
///
/// `Uninitialized -> Ready` on the first successful construction; the
/// engine is released exactly once when the operator is dropped. A failed
/// construction leaves the slot `Uninitialized` so the next call retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Ready,
}

/// Holds at most one engine. Callers serialize access through a mutex.
pub(crate) struct EngineSlot<E> {
    engine: Option<E>,
}

impl<E: DesignMatrixEngine> EngineSlot<E> {
    pub(crate) const fn new() -> Self {
        Self { engine: None }
    }

    pub(crate) fn state(&self) -> EngineState {
        match self.engine {
            Some(_) => EngineState::Ready,
            None => EngineState::Uninitialized,
        }
    }

    /// The engine, constructing it on first use
    pub(crate) fn get_or_construct(&mut self, metrics: &OpMetrics) -> Result<&E> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                let engine = E::construct().map_err(|err| OpError::EngineConstruction(err.to_string()))?;
                metrics.record_construction();
                perf_event!(
                    "engine_constructed",
                    nlu = E::SHAPE.nlu(),
                    n = E::SHAPE.n(),
                    dtype = <E::Elem as Element>::DTYPE.name()
                );
                engine
            }
        };
        Ok(self.engine.insert(engine))
    }

    /// Drop the engine if present. Returns whether anything was released.
    pub(crate) fn release(&mut self, metrics: &OpMetrics) -> bool {
        match self.engine.take() {
            Some(engine) => {
                drop(engine);
                metrics.record_release();
                tracing::debug!(nlu = E::SHAPE.nlu(), n = E::SHAPE.n(), "engine_released");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use limbdark_core::{Error, LimbDark, ShapeContract};
    use ndarray::{ArrayView1, ArrayViewMut2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FLAKY_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    /// Fails its first construction, then succeeds
    struct Flaky;

    impl DesignMatrixEngine for Flaky {
        type Elem = f64;
        const SHAPE: ShapeContract = ShapeContract::from_degrees(0, 0);

        fn construct() -> limbdark_core::Result<Self> {
            if FLAKY_ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Construction("out of memory".into()))
            } else {
                Ok(Flaky)
            }
        }

        fn compute_design_matrix(&self, _u: ArrayView1<'_, f64>, _out: ArrayViewMut2<'_, f64>) -> limbdark_core::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_constructs_once_and_releases_once() {
        let metrics = OpMetrics::new();
        let mut slot = EngineSlot::<LimbDark<f64, 1, 1>>::new();
        assert_eq!(slot.state(), EngineState::Uninitialized);

        slot.get_or_construct(&metrics).unwrap();
        slot.get_or_construct(&metrics).unwrap();
        assert_eq!(slot.state(), EngineState::Ready);
        assert_eq!(metrics.snapshot().engine_constructions, 1);

        assert!(slot.release(&metrics));
        assert!(!slot.release(&metrics));
        assert_eq!(metrics.snapshot().engine_releases, 1);
    }

    #[test]
    fn test_failed_construction_leaves_slot_uninitialized() {
        let metrics = OpMetrics::new();
        let mut slot = EngineSlot::<Flaky>::new();

        let err = slot.get_or_construct(&metrics).err().unwrap();
        assert!(matches!(err, OpError::EngineConstruction(_)));
        assert_eq!(slot.state(), EngineState::Uninitialized);
        assert_eq!(metrics.snapshot().engine_constructions, 0);

        slot.get_or_construct(&metrics).unwrap();
        assert_eq!(slot.state(), EngineState::Ready);
        assert_eq!(metrics.snapshot().engine_constructions, 1);
    }
}
