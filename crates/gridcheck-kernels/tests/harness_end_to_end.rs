//! End-to-end harness tests on the CPU-simulated device.
//!
//! Covers the full transfer/dispatch/verify lifecycle, the buffer cleanup
//! invariant on every exit path, and fault injection that forces a
//! verification failure without an infrastructure error.

use gridcheck_common::{ElementType, GridError, MatrixProblem};
use gridcheck_kernels::{
    run_matmul, run_matrix_add, run_vector_add, BufferId, BufferRole, CpuDevice, DeviceContext,
    DeviceLimits, Geometry, KernelOp, LaunchArgs,
};

const TOLERANCE: f64 = 1e-5;

#[test]
fn vector_add_i32_exact() {
    let device = CpuDevice::new();
    let a = [1i32; 8];
    let b = [2i32; 8];
    let report = run_vector_add(&device, &a, &b, 4, 0.0).unwrap();
    assert!(report.passed);
    assert!(report.mismatch.is_none());
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn vector_add_f32_within_tolerance() {
    let device = CpuDevice::new();
    let a = [1.0f32; 8];
    let b = [2.0f32; 8];
    let report = run_vector_add(&device, &a, &b, 3, TOLERANCE).unwrap();
    assert!(report.passed);
    // 8 elements in groups of 3: three groups, one unit of overshoot.
    assert_eq!(report.geometry.groups.x, 3);
}

#[test]
fn vector_add_f64_large_uneven() {
    let device = CpuDevice::new();
    let a: Vec<f64> = (0..1000).map(f64::from).collect();
    let b: Vec<f64> = (0..1000).map(|i| f64::from(i) * 0.5).collect();
    let report = run_vector_add(&device, &a, &b, 256, 1e-9).unwrap();
    assert!(report.passed);
    assert_eq!(report.geometry.groups.x, 4);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn matrix_add_rectangular_f32() {
    let device = CpuDevice::new();
    let shape = MatrixProblem::new(7, 13).unwrap();
    let a: Vec<f32> = (0..shape.len()).map(|i| i as f32).collect();
    let b: Vec<f32> = (0..shape.len()).map(|i| (i * 2) as f32).collect();
    let report = run_matrix_add(&device, &a, &b, shape, 4, TOLERANCE).unwrap();
    assert!(report.passed);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn matmul_identity_returns_b_exactly() {
    let device = CpuDevice::new();
    let identity = [1.0f32, 0.0, 0.0, 1.0];
    let b = [5.0f32, 6.0, 7.0, 8.0];
    let shape = MatrixProblem::new(2, 2).unwrap();
    // Exact equality: tolerance zero.
    let report = run_matmul(&device, &identity, shape, &b, shape, 2, 0.0).unwrap();
    assert!(report.passed);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn matmul_rectangular_i32() {
    let device = CpuDevice::new();
    let a_shape = MatrixProblem::new(3, 4).unwrap();
    let b_shape = MatrixProblem::new(4, 5).unwrap();
    let a: Vec<i32> = (0..12).collect();
    let b: Vec<i32> = (0..20).map(|i| i - 10).collect();
    let report = run_matmul(&device, &a, a_shape, &b, b_shape, 2, 0.0).unwrap();
    assert!(report.passed);
    assert_eq!(report.elements, 15);
}

#[test]
fn matmul_dimension_mismatch_allocates_nothing() {
    let device = CpuDevice::new();
    let a_shape = MatrixProblem::new(2, 3).unwrap();
    let b_shape = MatrixProblem::new(2, 2).unwrap();
    let a = vec![0.0f32; 6];
    let b = vec![0.0f32; 4];
    let err = run_matmul(&device, &a, a_shape, &b, b_shape, 2, TOLERANCE).unwrap_err();
    assert!(matches!(err, GridError::InvalidDimension(_)));
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn cleanup_after_mid_operation_allocation_failure() {
    // Operands fit, the result allocation does not.
    let device = CpuDevice::with_memory_limit(80);
    let a = [1.0f32; 8];
    let b = [2.0f32; 8];
    let err = run_vector_add(&device, &a, &b, 4, TOLERANCE).unwrap_err();
    assert!(matches!(err, GridError::AllocationFailure(_)));
    assert_eq!(device.live_buffers(), 0);
}

/// Delegates to an inner [`CpuDevice`] but corrupts the result buffer after
/// every launch, so verification fails while the run itself succeeds.
struct CorruptingDevice {
    inner: CpuDevice,
}

impl DeviceContext for CorruptingDevice {
    fn name(&self) -> &str {
        "cpu-corrupting"
    }

    fn limits(&self) -> DeviceLimits {
        self.inner.limits()
    }

    fn alloc(&self, byte_len: usize, role: BufferRole) -> gridcheck_common::Result<BufferId> {
        self.inner.alloc(byte_len, role)
    }

    fn upload(&self, id: BufferId, bytes: &[u8]) -> gridcheck_common::Result<()> {
        self.inner.upload(id, bytes)
    }

    fn download(&self, id: BufferId, out: &mut [u8]) -> gridcheck_common::Result<()> {
        self.inner.download(id, out)
    }

    fn free(&self, id: BufferId) {
        self.inner.free(id);
    }

    fn launch(
        &self,
        op: KernelOp,
        geometry: Geometry,
        args: LaunchArgs,
    ) -> gridcheck_common::Result<()> {
        self.inner.launch(op, geometry, args)?;
        // Flip one bit of the first result element.
        let (_, _, out_len) = op.operand_lens();
        let mut bytes = vec![0u8; out_len * args.dtype.byte_size()];
        self.inner.download(args.out, &mut bytes)?;
        bytes[0] ^= 0x01;
        self.inner.upload(args.out, &bytes)
    }

    fn synchronize(&self) -> gridcheck_common::Result<()> {
        self.inner.synchronize()
    }

    fn live_buffers(&self) -> usize {
        self.inner.live_buffers()
    }
}

#[test]
fn verification_failure_is_reported_not_raised() {
    let device = CorruptingDevice { inner: CpuDevice::new() };
    let a = [10i32; 16];
    let b = [20i32; 16];
    let report = run_vector_add(&device, &a, &b, 8, 0.0).unwrap();
    assert!(!report.passed);
    let mismatch = report.mismatch.expect("first mismatch recorded");
    assert_eq!(mismatch.index, 0);
    assert_eq!(mismatch.expected, "30");
    // Buffers released even though verification failed.
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn reports_carry_geometry_and_device_name() {
    let device = CpuDevice::new();
    let a = [1.0f64; 10];
    let b = [2.0f64; 10];
    let report = run_vector_add(&device, &a, &b, 4, 1e-9).unwrap();
    assert_eq!(report.op, "vector_add");
    assert_eq!(report.device, "cpu");
    assert_eq!(report.geometry.group.x, 4);
    assert_eq!(report.geometry.groups.x, 3);
    assert_eq!(report.elements, 10);
}

#[test]
fn element_type_tags_match_launches() {
    // Sanity check that the dtype travelling with launch args round-trips
    // through the byte-oriented device interface for all three types.
    let device = CpuDevice::new();

    let ra = run_vector_add(&device, &[1.0f32; 4], &[2.0f32; 4], 2, 0.0).unwrap();
    let rb = run_vector_add(&device, &[1.0f64; 4], &[2.0f64; 4], 2, 0.0).unwrap();
    let rc = run_vector_add(&device, &[1i32; 4], &[2i32; 4], 2, 0.0).unwrap();
    assert!(ra.passed && rb.passed && rc.passed);
    assert_eq!(ElementType::F64.byte_size(), 8);
    assert_eq!(device.live_buffers(), 0);
}
