//! Scoped device buffer management.
//!
//! All buffers for one operation are acquired through a single
//! [`OperationScope`], which releases everything it handed out when it is
//! dropped. That one rule gives both guarantees the lifecycle demands:
//! partial-acquisition rollback when an `alloc` fails midway, and release on
//! every exit path, including verification failure.

use crate::device::{BufferId, BufferRole, DeviceContext};
use gridcheck_common::{Element, GridError, Result};

/// A device buffer acquired through an [`OperationScope`]: the opaque
/// handle plus its declared size and logical role.
#[derive(Debug, Clone, Copy)]
pub struct DeviceBuffer {
    pub id: BufferId,
    pub byte_len: usize,
    pub role: BufferRole,
}

/// Owns every device buffer of one operation for the operation's lifetime.
pub struct OperationScope<'d> {
    device: &'d dyn DeviceContext,
    acquired: Vec<BufferId>,
}

impl<'d> OperationScope<'d> {
    pub fn new(device: &'d dyn DeviceContext) -> Self {
        Self { device, acquired: Vec::new() }
    }

    /// Acquire a raw byte buffer.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the device cannot satisfy the request. Buffers
    /// already acquired by this scope are released when the scope drops, so
    /// the caller can simply propagate the error.
    pub fn acquire(&mut self, byte_len: usize, role: BufferRole) -> Result<DeviceBuffer> {
        let id = self.device.alloc(byte_len, role)?;
        self.acquired.push(id);
        Ok(DeviceBuffer { id, byte_len, role })
    }

    /// Acquire a buffer sized for `len` elements of `E`.
    pub fn acquire_for<E: Element>(&mut self, len: usize, role: BufferRole) -> Result<DeviceBuffer> {
        self.acquire(len * std::mem::size_of::<E>(), role)
    }

    /// Byte-exact host-to-device copy.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if `data` does not match the buffer's declared size,
    /// `TransferFailure` if the copy itself fails.
    pub fn upload<E: Element>(&self, buffer: &DeviceBuffer, data: &[E]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() != buffer.byte_len {
            return Err(GridError::SizeMismatch {
                expected: buffer.byte_len,
                actual: bytes.len(),
            });
        }
        self.device.upload(buffer.id, bytes)
    }

    /// Byte-exact device-to-host copy.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if `out` does not match the buffer's declared size,
    /// `TransferFailure` if the copy itself fails.
    pub fn download<E: Element>(&self, buffer: &DeviceBuffer, out: &mut [E]) -> Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(out);
        if bytes.len() != buffer.byte_len {
            return Err(GridError::SizeMismatch {
                expected: buffer.byte_len,
                actual: bytes.len(),
            });
        }
        self.device.download(buffer.id, bytes)
    }

    /// The device this scope acquires from.
    pub fn device(&self) -> &'d dyn DeviceContext {
        self.device
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        for id in self.acquired.drain(..) {
            self.device.free(id);
        }
    }
}
