//! Host-side driver: validate, plan, transfer, dispatch, verify, report.
//!
//! Each entry point runs one operation end to end against a device context
//! and checks the downloaded result against the sequential oracle. A failed
//! verification is a normal, reportable outcome (`RunReport::passed ==
//! false`); only infrastructure problems surface as errors. Device buffers
//! are scoped to the operation and released on every exit path.

use crate::buffer::OperationScope;
use crate::device::{BufferRole, DeviceContext, LaunchArgs};
use crate::dispatch::dispatch;
use crate::ops::KernelOp;
use crate::plan::{Dim2, Geometry};
use crate::reference::{matmul_ref, matrix_add_ref, vector_add_ref};
use crate::verify::{verify, Mismatch, Verification};
use gridcheck_common::{Element, GridError, MatmulProblem, MatrixProblem, Result, VectorProblem};

/// Outcome of one harness run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Operation name (`vector_add`, `matrix_add`, `matmul`).
    pub op: &'static str,
    /// Device the kernel ran on.
    pub device: String,
    /// Planned launch geometry.
    pub geometry: Geometry,
    /// Output element count.
    pub elements: usize,
    /// Whether the device result matched the oracle.
    pub passed: bool,
    /// First mismatch when verification failed.
    pub mismatch: Option<Mismatch>,
}

fn extent_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| GridError::InvalidDimension(format!("{what} {len} exceeds u32 range")))
}

fn check_operand_len(actual: usize, expected: usize, what: &str) -> Result<()> {
    if actual != expected {
        return Err(GridError::InvalidDimension(format!(
            "{what} holds {actual} elements, shape requires {expected}"
        )));
    }
    Ok(())
}

/// Shared transfer/dispatch/verify path once the problem and geometry are
/// validated.
fn run_op<E: Element>(
    device: &dyn DeviceContext,
    op: KernelOp,
    geometry: Geometry,
    a: &[E],
    b: &[E],
    expected: &[E],
    tolerance: f64,
) -> Result<RunReport> {
    let mut scope = OperationScope::new(device);

    let buf_a = scope.acquire_for::<E>(a.len(), BufferRole::OperandA)?;
    let buf_b = scope.acquire_for::<E>(b.len(), BufferRole::OperandB)?;
    let buf_out = scope.acquire_for::<E>(expected.len(), BufferRole::Result)?;

    scope.upload(&buf_a, a)?;
    scope.upload(&buf_b, b)?;

    dispatch(
        device,
        op,
        geometry,
        LaunchArgs { a: buf_a.id, b: buf_b.id, out: buf_out.id, dtype: E::ELEMENT_TYPE },
    )?;

    let mut computed = vec![E::ZERO; expected.len()];
    scope.download(&buf_out, &mut computed)?;
    // Last consumer is done; release the operation's buffers.
    drop(scope);

    let verification = verify(&computed, expected, tolerance);
    let (passed, mismatch) = match verification {
        Verification::Pass => (true, None),
        Verification::Fail(m) => (false, Some(m)),
    };
    if passed {
        log::info!("{} on {}: verification passed", op.name(), device.name());
    } else {
        log::warn!("{} on {}: verification FAILED", op.name(), device.name());
    }

    Ok(RunReport {
        op: op.name(),
        device: device.name().to_string(),
        geometry,
        elements: expected.len(),
        passed,
        mismatch,
    })
}

/// Run parallel vector addition and verify against the host oracle.
///
/// Any positive `group_size` is accepted.
///
/// # Errors
///
/// `InvalidDimension` for empty or mismatched operands, plus any device
/// error from the transfer/dispatch path.
pub fn run_vector_add<E: Element>(
    device: &dyn DeviceContext,
    a: &[E],
    b: &[E],
    group_size: u32,
    tolerance: f64,
) -> Result<RunReport> {
    let problem = VectorProblem::new(a.len())?;
    check_operand_len(b.len(), problem.len(), "operand B")?;
    let len = extent_u32(problem.len(), "vector length")?;
    let geometry = Geometry::plan_1d(len, group_size)?;

    let expected = vector_add_ref(a, b);
    run_op(device, KernelOp::VectorAdd { len }, geometry, a, b, &expected, tolerance)
}

/// Run parallel elementwise matrix addition and verify against the host
/// oracle.
///
/// # Errors
///
/// `InvalidDimension` for operand/shape mismatches, plus any device error.
pub fn run_matrix_add<E: Element>(
    device: &dyn DeviceContext,
    a: &[E],
    b: &[E],
    shape: MatrixProblem,
    group_side: u32,
    tolerance: f64,
) -> Result<RunReport> {
    check_operand_len(a.len(), shape.len(), "operand A")?;
    check_operand_len(b.len(), shape.len(), "operand B")?;
    let rows = extent_u32(shape.rows(), "matrix rows")?;
    let cols = extent_u32(shape.cols(), "matrix cols")?;
    let geometry = Geometry::plan_2d(Dim2::new(cols, rows), group_side)?;

    let expected = matrix_add_ref(a, b);
    run_op(device, KernelOp::MatrixAdd { rows, cols }, geometry, a, b, &expected, tolerance)
}

/// Run parallel matrix multiplication and verify against the host oracle.
///
/// The group side must be a power of two. Operand shape compatibility is
/// checked before any allocation.
///
/// # Errors
///
/// `InvalidDimension` if `a_shape.cols() != b_shape.rows()` or operand
/// lengths disagree with their shapes, `InvalidGroupShape` for a
/// non-power-of-two group side, plus any device error.
pub fn run_matmul<E: Element>(
    device: &dyn DeviceContext,
    a: &[E],
    a_shape: MatrixProblem,
    b: &[E],
    b_shape: MatrixProblem,
    group_side: u32,
    tolerance: f64,
) -> Result<RunReport> {
    let problem = MatmulProblem::from_operands(a_shape, b_shape)?;
    check_operand_len(a.len(), problem.a_shape().len(), "operand A")?;
    check_operand_len(b.len(), problem.b_shape().len(), "operand B")?;

    let m = extent_u32(problem.m(), "output rows")?;
    let n = extent_u32(problem.n(), "output cols")?;
    let k = extent_u32(problem.k(), "reduction dimension")?;
    let geometry = Geometry::plan_2d_pow2(Dim2::new(n, m), group_side)?;

    let expected = matmul_ref(a, b, problem);
    run_op(device, KernelOp::MatMul { m, n, k }, geometry, a, b, &expected, tolerance)
}
