//! CUDA backend using cudarc 0.17.
//!
//! Implements [`DeviceContext`] on top of a CUDA context and its default
//! stream. Kernel source is embedded and compiled to PTX at initialisation;
//! one function per operation and element type. Stream copies may complete
//! asynchronously; the dispatcher's pre-download [`synchronize`] call is
//! what makes results observable, per the ordering contract.
//!
//! [`synchronize`]: DeviceContext::synchronize

use crate::device::{BufferId, BufferRole, DeviceContext, DeviceLimits, LaunchArgs};
use crate::ops::KernelOp;
use crate::plan::{Dim2, Geometry};
use gridcheck_common::{ElementType, GridError, Result};
use cudarc::driver::{CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg};
use cudarc::nvrtc::compile_ptx;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const KERNEL_SOURCE: &str = include_str!("kernels/gridcheck.cu");

const KERNEL_NAMES: [&str; 9] = [
    "vector_add_f32",
    "vector_add_f64",
    "vector_add_i32",
    "matrix_add_f32",
    "matrix_add_f64",
    "matrix_add_i32",
    "matmul_f32",
    "matmul_f64",
    "matmul_i32",
];

fn kernel_name(op: KernelOp, dtype: ElementType) -> &'static str {
    match (op, dtype) {
        (KernelOp::VectorAdd { .. }, ElementType::F32) => "vector_add_f32",
        (KernelOp::VectorAdd { .. }, ElementType::F64) => "vector_add_f64",
        (KernelOp::VectorAdd { .. }, ElementType::I32) => "vector_add_i32",
        (KernelOp::MatrixAdd { .. }, ElementType::F32) => "matrix_add_f32",
        (KernelOp::MatrixAdd { .. }, ElementType::F64) => "matrix_add_f64",
        (KernelOp::MatrixAdd { .. }, ElementType::I32) => "matrix_add_i32",
        (KernelOp::MatMul { .. }, ElementType::F32) => "matmul_f32",
        (KernelOp::MatMul { .. }, ElementType::F64) => "matmul_f64",
        (KernelOp::MatMul { .. }, ElementType::I32) => "matmul_i32",
    }
}

struct Buffers {
    slots: HashMap<u64, CudaSlice<u8>>,
    next_id: u64,
}

/// CUDA accelerator device.
pub struct CudaDevice {
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    _module: Arc<CudaModule>,
    functions: HashMap<&'static str, CudaFunction>,
    buffers: Mutex<Buffers>,
    name: String,
}

impl CudaDevice {
    /// Initialise device 0.
    ///
    /// # Errors
    ///
    /// `DispatchFailure` when no CUDA context can be created or the kernels
    /// fail to compile.
    pub fn new() -> Result<Self> {
        Self::with_device(0)
    }

    /// Initialise a specific CUDA device.
    pub fn with_device(device_id: usize) -> Result<Self> {
        log::info!("initialising CUDA backend on device {device_id}");

        let ctx = CudaContext::new(device_id).map_err(|e| {
            GridError::DispatchFailure(format!(
                "failed to create CUDA context for device {device_id}: {e:?}"
            ))
        })?;
        let stream = ctx.default_stream();

        let ptx = compile_ptx(KERNEL_SOURCE).map_err(|e| {
            GridError::DispatchFailure(format!("failed to compile kernels to PTX: {e:?}"))
        })?;
        let module = ctx.load_module(ptx).map_err(|e| {
            GridError::DispatchFailure(format!("failed to load CUDA module: {e:?}"))
        })?;

        let mut functions = HashMap::new();
        for name in KERNEL_NAMES {
            let function = module.load_function(name).map_err(|e| {
                GridError::DispatchFailure(format!("failed to load kernel {name}: {e:?}"))
            })?;
            functions.insert(name, function);
        }

        Ok(Self {
            _ctx: ctx,
            stream,
            _module: module,
            functions,
            buffers: Mutex::new(Buffers { slots: HashMap::new(), next_id: 0 }),
            name: format!("cuda:{device_id}"),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceContext for CudaDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn limits(&self) -> DeviceLimits {
        // Conservative limits valid on every CUDA device this backend
        // targets (compute capability 3.0+).
        DeviceLimits {
            max_groups: Dim2::new(65_535, 65_535),
            max_group: Dim2::new(1024, 1024),
            max_units_per_group: 1024,
            total_memory: usize::MAX,
        }
    }

    fn alloc(&self, byte_len: usize, role: BufferRole) -> Result<BufferId> {
        let slice = self.stream.alloc_zeros::<u8>(byte_len).map_err(|e| {
            GridError::AllocationFailure(format!("device alloc of {byte_len} bytes ({role:?}): {e:?}"))
        })?;
        let mut buffers = self.lock();
        let id = buffers.next_id;
        buffers.next_id += 1;
        buffers.slots.insert(id, slice);
        Ok(BufferId(id))
    }

    fn upload(&self, id: BufferId, bytes: &[u8]) -> Result<()> {
        let mut buffers = self.lock();
        let slot = buffers
            .slots
            .get_mut(&id.0)
            .ok_or_else(|| GridError::TransferFailure(format!("unknown buffer {id:?}")))?;
        if bytes.len() != slot.len() {
            return Err(GridError::SizeMismatch { expected: slot.len(), actual: bytes.len() });
        }
        // Fresh device slice for the uploaded contents; the handle stays
        // stable.
        *slot = self
            .stream
            .memcpy_stod(bytes)
            .map_err(|e| GridError::TransferFailure(format!("host-to-device copy: {e:?}")))?;
        Ok(())
    }

    fn download(&self, id: BufferId, out: &mut [u8]) -> Result<()> {
        let buffers = self.lock();
        let slot = buffers
            .slots
            .get(&id.0)
            .ok_or_else(|| GridError::TransferFailure(format!("unknown buffer {id:?}")))?;
        if out.len() != slot.len() {
            return Err(GridError::SizeMismatch { expected: slot.len(), actual: out.len() });
        }
        let host: Vec<u8> = self
            .stream
            .memcpy_dtov(slot)
            .map_err(|e| GridError::TransferFailure(format!("device-to-host copy: {e:?}")))?;
        out.copy_from_slice(&host);
        Ok(())
    }

    fn free(&self, id: BufferId) {
        self.lock().slots.remove(&id.0);
    }

    fn launch(&self, op: KernelOp, geometry: Geometry, args: LaunchArgs) -> Result<()> {
        let name = kernel_name(op, args.dtype);
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| GridError::DispatchFailure(format!("kernel {name} not loaded")))?;

        if args.a == args.out || args.b == args.out {
            return Err(GridError::DispatchFailure(
                "output buffer must not alias an operand".into(),
            ));
        }
        let mut buffers = self.lock();
        let mut out = buffers
            .slots
            .remove(&args.out.0)
            .ok_or_else(|| GridError::DispatchFailure("missing result buffer".into()))?;
        let result = self.launch_inner(&buffers, op, geometry, args, function, name, &mut out);
        buffers.slots.insert(args.out.0, out);
        result
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| GridError::DispatchFailure(format!("stream synchronize: {e:?}")))
    }

    fn live_buffers(&self) -> usize {
        self.lock().slots.len()
    }
}

impl CudaDevice {
    #[allow(clippy::too_many_arguments)]
    fn launch_inner(
        &self,
        buffers: &Buffers,
        op: KernelOp,
        geometry: Geometry,
        args: LaunchArgs,
        function: &CudaFunction,
        name: &str,
        out: &mut CudaSlice<u8>,
    ) -> Result<()> {
        let a = buffers
            .slots
            .get(&args.a.0)
            .ok_or_else(|| GridError::DispatchFailure("missing operand A buffer".into()))?;
        let b = buffers
            .slots
            .get(&args.b.0)
            .ok_or_else(|| GridError::DispatchFailure("missing operand B buffer".into()))?;

        let cfg = LaunchConfig {
            grid_dim: (geometry.groups.x, geometry.groups.y, 1),
            block_dim: (geometry.group.x, geometry.group.y, 1),
            shared_mem_bytes: 0,
        };

        let mut builder = self.stream.launch_builder(function);
        builder.arg(a);
        builder.arg(b);
        builder.arg(out);
        match op {
            KernelOp::VectorAdd { len } => {
                let len = len as i32;
                builder.arg(&len);
                unsafe { builder.launch(cfg) }
            }
            KernelOp::MatrixAdd { rows, cols } => {
                let rows = rows as i32;
                let cols = cols as i32;
                builder.arg(&rows);
                builder.arg(&cols);
                unsafe { builder.launch(cfg) }
            }
            KernelOp::MatMul { m, n, k } => {
                let m = m as i32;
                let n = n as i32;
                let k = k as i32;
                builder.arg(&m);
                builder.arg(&n);
                builder.arg(&k);
                unsafe { builder.launch(cfg) }
            }
        }
        .map_err(|e| GridError::DispatchFailure(format!("kernel {name} launch: {e:?}")))?;

        log::debug!("cuda launch: {name} grid={:?} block={:?}", cfg.grid_dim, cfg.block_dim);
        Ok(())
    }
}

/// Whether a CUDA context can be created on this host.
pub fn cuda_available() -> bool {
    CudaContext::new(0).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::run_vector_add;

    #[test]
    fn kernel_names_cover_all_ops_and_dtypes() {
        for op in [
            KernelOp::VectorAdd { len: 1 },
            KernelOp::MatrixAdd { rows: 1, cols: 1 },
            KernelOp::MatMul { m: 1, n: 1, k: 1 },
        ] {
            for dtype in [ElementType::F32, ElementType::F64, ElementType::I32] {
                let name = kernel_name(op, dtype);
                assert!(KERNEL_NAMES.contains(&name));
                assert!(KERNEL_SOURCE.contains(name));
            }
        }
    }

    #[test]
    #[ignore = "requires a CUDA device - run manually with --ignored"]
    fn cuda_vector_add_end_to_end() {
        let device = CudaDevice::new().expect("CUDA backend init");
        let a = vec![1.0f32; 1024];
        let b = vec![2.0f32; 1024];
        let report = run_vector_add(&device, &a, &b, 256, 1e-5).unwrap();
        assert!(report.passed, "mismatch: {:?}", report.mismatch);
        assert_eq!(device.live_buffers(), 0);
    }
}
