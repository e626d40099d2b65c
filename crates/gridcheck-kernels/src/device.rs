//! The device-context seam.
//!
//! Every component that touches accelerator resources receives an explicit
//! [`DeviceContext`] value; there is no process-wide "current device". A
//! context owns its buffers, executes launches, and reports the capability
//! limits the dispatcher validates geometry against.

use crate::ops::KernelOp;
use crate::plan::{Dim2, Geometry};
use gridcheck_common::{ElementType, Result};

/// Opaque handle to a device-resident buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u64);

/// Logical role of a buffer within one operation.
///
/// A buffer is never aliased across roles and never outlives its owning
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    OperandA,
    OperandB,
    Result,
}

/// Queried device capabilities used to validate geometry before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DeviceLimits {
    /// Maximum group count per axis.
    pub max_groups: Dim2,
    /// Maximum group size per axis.
    pub max_group: Dim2,
    /// Maximum total units in one group.
    pub max_units_per_group: u32,
    /// Total device memory in bytes.
    pub total_memory: usize,
}

/// Arguments for one kernel launch: buffer handles plus the element type
/// the bytes should be interpreted as. Problem dimensions travel inside
/// [`KernelOp`].
#[derive(Debug, Clone, Copy)]
pub struct LaunchArgs {
    pub a: BufferId,
    pub b: BufferId,
    pub out: BufferId,
    pub dtype: ElementType,
}

/// An accelerator execution-and-memory domain.
///
/// Ordering contract (enforced by callers via [`crate::dispatch`] and
/// [`crate::buffer::OperationScope`]): uploads complete before `launch`,
/// `synchronize` runs before any download of launch outputs, and `free`
/// happens only after the buffer's last consumer.
pub trait DeviceContext: Send + Sync {
    /// Backend name for logging and reports.
    fn name(&self) -> &str;

    /// Capability limits for geometry validation.
    fn limits(&self) -> DeviceLimits;

    /// Allocate `byte_len` bytes of device memory.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the device cannot satisfy the request.
    fn alloc(&self, byte_len: usize, role: BufferRole) -> Result<BufferId>;

    /// Copy `bytes` from host to device. The length must match the buffer's
    /// declared size exactly.
    fn upload(&self, id: BufferId, bytes: &[u8]) -> Result<()>;

    /// Copy the buffer's contents back to host. `out.len()` must match the
    /// buffer's declared size exactly.
    fn download(&self, id: BufferId, out: &mut [u8]) -> Result<()>;

    /// Release a buffer. Unknown handles are ignored so release stays safe
    /// on every exit path.
    fn free(&self, id: BufferId);

    /// Launch `op` across `geometry`. Fire-and-forget: completion is only
    /// guaranteed after [`DeviceContext::synchronize`].
    fn launch(&self, op: KernelOp, geometry: Geometry, args: LaunchArgs) -> Result<()>;

    /// Block until all previously launched work has completed.
    fn synchronize(&self) -> Result<()>;

    /// Number of currently outstanding buffers (diagnostics; the cleanup
    /// invariant says this returns to zero after every operation).
    fn live_buffers(&self) -> usize;
}
