//! Call-level behavior of the operator against the native host

use limbdark_core::{DType, LimbDark};
use limbdark_op::{EngineState, HostArray, InputBuffer, LimbDarkOp, NativeHost, OpError};

type QuadraticOp = LimbDarkOp<LimbDark<f64, 2, 2>>;

const U_SOLAR: [f64; 3] = [-1.0, 0.4, 0.26];
const U_FLAT: [f64; 3] = [-1.0, 0.0, 0.0];

fn run(op: &QuadraticOp, host: &NativeHost, u: &[f64]) -> HostArray {
    op.perform(host, &HostArray::vector(u).as_input()).unwrap()
}

#[test]
fn test_rank_and_length_errors_precede_allocation() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();

    let matrix = HostArray::from_elements(&[3, 1], &U_SOLAR);
    let err = op.perform(&host, &matrix.as_input()).unwrap_err();
    assert!(matches!(err, OpError::Shape(ref msg) if msg.contains("must be a vector")));

    let scalar = HostArray::from_elements(&[], &[1.0f64]);
    assert!(matches!(op.perform(&host, &scalar.as_input()), Err(OpError::Shape(_))));

    let short = HostArray::vector(&[-1.0f64, 0.4]);
    assert!(matches!(op.perform(&host, &short.as_input()), Err(OpError::Shape(_))));

    assert_eq!(host.allocations(), 0);
    assert_eq!(op.engine_state(), EngineState::Uninitialized);
}

#[test]
fn test_type_error_precedes_allocation() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();
    let u = HostArray::vector(&[-1.0f32, 0.4, 0.26]);

    let err = op.perform(&host, &u.as_input()).unwrap_err();
    assert!(matches!(
        err,
        OpError::Type {
            expected: DType::F64,
            actual: DType::F32
        }
    ));
    assert_eq!(host.allocations(), 0);
    assert_eq!(op.engine_state(), EngineState::Uninitialized);
}

#[test]
fn test_allocation_failure_leaves_engine_untouched() {
    let op = QuadraticOp::new();
    let host = NativeHost::with_byte_limit(64);
    let u = HostArray::vector(&U_SOLAR);

    let mut output = None;
    let err = op.perform_into(&host, &u.as_input(), &mut output).unwrap_err();
    assert!(matches!(err, OpError::Allocation(_)));
    assert!(output.is_none());
    assert_eq!(op.engine_state(), EngineState::Uninitialized);
    assert_eq!(op.metrics().engine_constructions, 0);
}

#[test]
fn test_engine_constructed_once_across_calls() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();

    let outputs: Vec<HostArray> = (0..10).map(|_| run(&op, &host, &U_SOLAR)).collect();

    let metrics = op.metrics();
    assert_eq!(metrics.calls, 10);
    assert_eq!(metrics.successes, 10);
    assert_eq!(metrics.engine_constructions, 1);
    assert_eq!(host.allocations(), 10);

    // every call received its own buffer
    let mut addresses: Vec<usize> = outputs.iter().map(|o| o.bytes().as_ptr() as usize).collect();
    addresses.sort_unstable();
    addresses.dedup();
    assert_eq!(addresses.len(), 10);
}

#[test]
fn test_instances_agree_bitwise() {
    let host = NativeHost::new();
    let a = run(&QuadraticOp::new(), &host, &U_SOLAR);
    let b = run(&QuadraticOp::new(), &host, &U_SOLAR);
    assert_eq!(a.bytes(), b.bytes());
}

#[test]
fn test_calls_do_not_leak_state() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();

    let first = run(&op, &host, &U_SOLAR);
    let other = run(&op, &host, &U_FLAT);
    let again = run(&op, &host, &U_SOLAR);

    assert_eq!(first.bytes(), again.bytes());
    assert_ne!(first.bytes(), other.bytes());
}

#[test]
fn test_earlier_outputs_survive_later_calls() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();

    let first = run(&op, &host, &U_SOLAR);
    let snapshot = first.clone();
    let _ = run(&op, &host, &U_FLAT);
    let _ = op.perform(&host, &HostArray::vector(&[f64::NAN, 0.0, 0.0]).as_input());

    assert_eq!(first, snapshot);
}

#[test]
fn test_zero_coefficients_give_finite_matrix() {
    let op = QuadraticOp::new();
    let out = run(&op, &NativeHost::new(), &[0.0, 0.0, 0.0]);
    let matrix = out.view2::<f64>().unwrap();
    assert_eq!(matrix.dim(), (25, 9));
    assert!(matrix.iter().all(|v| v.is_finite()));
    assert!(matrix.iter().all(|&v| v == 0.0));
}

#[test]
fn test_scalar_configuration_returns_one() {
    let op = LimbDarkOp::<LimbDark<f64, 0, 0>>::new();
    let out = op
        .perform(&NativeHost::new(), &HostArray::vector(&[1.0f64]).as_input())
        .unwrap();
    assert_eq!(out.shape(), &[1, 1]);
    assert_eq!(out.to_vec::<f64>().unwrap(), vec![1.0]);
}

#[test]
fn test_flat_profile_is_identity_on_map_block() {
    let op = QuadraticOp::new();
    let out = run(&op, &NativeHost::new(), &U_FLAT);
    let matrix = out.view2::<f64>().unwrap();
    for ((row, col), &value) in matrix.indexed_iter() {
        let expected = if row == col { 1.0 } else { 0.0 };
        assert!((value - expected).abs() < 1e-12, "L[{row}, {col}] = {value}");
    }
}

#[test]
fn test_computation_error_then_recovery() {
    let op = QuadraticOp::new();
    let host = NativeHost::new();

    let bad = HostArray::vector(&[-1.0, f64::NAN, 0.26]);
    let err = op.perform(&host, &bad.as_input()).unwrap_err();
    assert!(matches!(err, OpError::Computation(limbdark_core::Error::NonFiniteCoefficient { index: 1 })));
    assert_eq!(op.engine_state(), EngineState::Ready);

    let good = run(&op, &host, &U_SOLAR);
    assert!(good.view2::<f64>().unwrap().iter().all(|v| v.is_finite()));

    let metrics = op.metrics();
    assert_eq!(metrics.failures, 1);
    assert_eq!(metrics.successes, 1);
    assert_eq!(metrics.engine_constructions, 1);
}

#[test]
fn test_single_precision_operator() {
    let op = LimbDarkOp::<LimbDark<f32, 2, 2>>::new();
    let host = NativeHost::new();
    let u = [-1.0f32, 0.4, 0.26];

    let out = op.perform(&host, &InputBuffer::vector(&u)).unwrap();
    assert_eq!(out.dtype(), DType::F32);

    let reference = run(&QuadraticOp::new(), &host, &U_SOLAR);
    let single = out.view2::<f32>().unwrap();
    let double = reference.view2::<f64>().unwrap();
    for (s, d) in single.iter().zip(double.iter()) {
        assert!((*s as f64 - d).abs() < 1e-5);
    }
}
