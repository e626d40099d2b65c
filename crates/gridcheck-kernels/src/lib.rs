//! Kernel engine for gridcheck.
//!
//! The pieces compose in a fixed order: the planner turns a problem extent
//! into an execution [`Geometry`], an [`OperationScope`] acquires and owns
//! the device buffers, the dispatcher validates the geometry against device
//! limits and launches the compute function, and the verifier checks the
//! downloaded result against a sequential host oracle. All of it runs
//! against an explicit [`DeviceContext`]: the CPU-simulated device by
//! default, a CUDA device behind the `cuda` feature.

pub mod buffer;
pub mod cpu;
pub mod device;
pub mod dispatch;
pub mod harness;
pub mod ops;
pub mod plan;
pub mod probe;
pub mod reference;
pub mod verify;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use buffer::{DeviceBuffer, OperationScope};
pub use cpu::CpuDevice;
pub use device::{BufferId, BufferRole, DeviceContext, DeviceLimits, LaunchArgs};
pub use dispatch::{dispatch, validate_geometry};
pub use harness::{run_matmul, run_matrix_add, run_vector_add, RunReport};
pub use ops::KernelOp;
pub use plan::{Dim2, Geometry};
pub use verify::{verify, Mismatch, Verification};

use gridcheck_common::Result;

/// Requested execution device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    /// The CPU-simulated accelerator, always available.
    Cpu,
    /// A CUDA accelerator; fails when support is not compiled in or no
    /// device answers.
    Cuda,
    /// CUDA when usable, otherwise the CPU device.
    #[default]
    Auto,
}

/// Construct the device context for `choice`.
///
/// # Errors
///
/// `DispatchFailure` when `Cuda` is requested but unusable.
pub fn select_device(choice: DeviceChoice) -> Result<Box<dyn DeviceContext>> {
    match choice {
        DeviceChoice::Cpu => Ok(Box::new(CpuDevice::new())),
        DeviceChoice::Cuda => {
            #[cfg(feature = "cuda")]
            {
                Ok(Box::new(cuda::CudaDevice::new()?))
            }
            #[cfg(not(feature = "cuda"))]
            {
                Err(gridcheck_common::GridError::DispatchFailure(
                    "CUDA requested but this binary was built without the `cuda` feature".into(),
                ))
            }
        }
        DeviceChoice::Auto => {
            #[cfg(feature = "cuda")]
            {
                if probe::detect().usable() {
                    match cuda::CudaDevice::new() {
                        Ok(device) => return Ok(Box::new(device)),
                        Err(e) => log::debug!("CUDA probe succeeded but init failed: {e}"),
                    }
                }
            }
            Ok(Box::new(CpuDevice::new()))
        }
    }
}
