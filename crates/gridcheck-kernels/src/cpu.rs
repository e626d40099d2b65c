//! CPU-simulated accelerator.
//!
//! Executes launches by walking every (group, unit) coordinate of the
//! planned geometry and applying the per-unit compute function, including
//! the mandatory bounds check. Buffers live in host memory behind the same
//! byte-oriented interface the real backends use, so the whole orchestration
//! path is exercised without any accelerator present.
//!
//! An optional memory cap makes allocation failure (and the buffer-manager
//! rollback it triggers) reproducible in tests.

use crate::device::{BufferId, BufferRole, DeviceContext, DeviceLimits, LaunchArgs};
use crate::ops::{compute_unit, KernelOp};
use crate::plan::{Dim2, Geometry};
use gridcheck_common::{Element, ElementType, GridError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// One simulated device buffer. Backing storage is `u64` so the byte view
/// is always aligned for every supported element type.
struct Slot {
    storage: Vec<u64>,
    byte_len: usize,
    role: BufferRole,
    populated: bool,
}

impl Slot {
    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.storage)[..self.byte_len]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.storage)[..self.byte_len]
    }
}

struct State {
    slots: HashMap<u64, Slot>,
    next_id: u64,
    used_bytes: usize,
}

/// Simulated accelerator device.
pub struct CpuDevice {
    state: Mutex<State>,
    memory_limit: usize,
}

impl CpuDevice {
    /// Device with effectively unbounded memory.
    pub fn new() -> Self {
        Self::with_memory_limit(usize::MAX)
    }

    /// Device that fails allocation once `limit` bytes are outstanding.
    pub fn with_memory_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(State { slots: HashMap::new(), next_id: 0, used_bytes: 0 }),
            memory_limit: limit,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceContext for CpuDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    fn limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_groups: Dim2::new(65_535, 65_535),
            max_group: Dim2::new(1024, 1024),
            max_units_per_group: 1024,
            total_memory: self.memory_limit,
        }
    }

    fn alloc(&self, byte_len: usize, role: BufferRole) -> Result<BufferId> {
        let mut state = self.lock();
        let total = state.used_bytes.checked_add(byte_len);
        if total.map_or(true, |t| t > self.memory_limit) {
            return Err(GridError::AllocationFailure(format!(
                "requested {byte_len} bytes with {} of {} in use",
                state.used_bytes, self.memory_limit
            )));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.used_bytes += byte_len;
        state.slots.insert(
            id,
            Slot {
                storage: vec![0u64; byte_len.div_ceil(8)],
                byte_len,
                role,
                populated: false,
            },
        );
        log::trace!("cpu alloc: id={id} bytes={byte_len} role={role:?}");
        Ok(BufferId(id))
    }

    fn upload(&self, id: BufferId, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let slot = state
            .slots
            .get_mut(&id.0)
            .ok_or_else(|| GridError::TransferFailure(format!("unknown buffer {:?}", id)))?;
        if bytes.len() != slot.byte_len {
            return Err(GridError::SizeMismatch { expected: slot.byte_len, actual: bytes.len() });
        }
        slot.bytes_mut().copy_from_slice(bytes);
        slot.populated = true;
        Ok(())
    }

    fn download(&self, id: BufferId, out: &mut [u8]) -> Result<()> {
        let state = self.lock();
        let slot = state
            .slots
            .get(&id.0)
            .ok_or_else(|| GridError::TransferFailure(format!("unknown buffer {:?}", id)))?;
        if out.len() != slot.byte_len {
            return Err(GridError::SizeMismatch { expected: slot.byte_len, actual: out.len() });
        }
        out.copy_from_slice(slot.bytes());
        Ok(())
    }

    fn free(&self, id: BufferId) {
        let mut state = self.lock();
        if let Some(slot) = state.slots.remove(&id.0) {
            state.used_bytes -= slot.byte_len;
        }
    }

    fn launch(&self, op: KernelOp, geometry: Geometry, args: LaunchArgs) -> Result<()> {
        if args.a == args.out || args.b == args.out {
            return Err(GridError::DispatchFailure(
                "output buffer must not alias an operand".into(),
            ));
        }
        log::debug!(
            "cpu launch: op={} geometry={:?} dtype={}",
            op.name(),
            geometry,
            args.dtype
        );

        let mut state = self.lock();

        let mut out_slot = state
            .slots
            .remove(&args.out.0)
            .ok_or_else(|| GridError::DispatchFailure("missing result buffer".into()))?;
        let run = (|| {
            let a_slot = state
                .slots
                .get(&args.a.0)
                .ok_or_else(|| GridError::DispatchFailure("missing operand A buffer".into()))?;
            let b_slot = state
                .slots
                .get(&args.b.0)
                .ok_or_else(|| GridError::DispatchFailure("missing operand B buffer".into()))?;
            if !a_slot.populated || !b_slot.populated {
                return Err(GridError::DispatchFailure(
                    "operand buffer read before upload".into(),
                ));
            }

            let (a_len, b_len, out_len) = op.operand_lens();
            let elem = args.dtype.byte_size();
            for (label, slot_bytes, want) in [
                ("A", a_slot.byte_len, a_len * elem),
                ("B", b_slot.byte_len, b_len * elem),
                ("result", out_slot.byte_len, out_len * elem),
            ] {
                if slot_bytes != want {
                    return Err(GridError::DispatchFailure(format!(
                        "{label} buffer holds {slot_bytes} bytes, kernel expects {want}"
                    )));
                }
            }

            match args.dtype {
                ElementType::F32 => {
                    run_grid::<f32>(op, geometry, a_slot.bytes(), b_slot.bytes(), out_slot.bytes_mut())
                }
                ElementType::F64 => {
                    run_grid::<f64>(op, geometry, a_slot.bytes(), b_slot.bytes(), out_slot.bytes_mut())
                }
                ElementType::I32 => {
                    run_grid::<i32>(op, geometry, a_slot.bytes(), b_slot.bytes(), out_slot.bytes_mut())
                }
            }
            Ok(())
        })();

        if run.is_ok() {
            out_slot.populated = true;
        }
        state.slots.insert(args.out.0, out_slot);
        run
    }

    fn synchronize(&self) -> Result<()> {
        // Launches execute to completion under the state lock.
        Ok(())
    }

    fn live_buffers(&self) -> usize {
        self.lock().slots.len()
    }
}

/// Walk every unit of the grid and apply the compute function at its global
/// coordinate.
fn run_grid<E: Element>(op: KernelOp, geometry: Geometry, a: &[u8], b: &[u8], out: &mut [u8]) {
    let a: &[E] = bytemuck::cast_slice(a);
    let b: &[E] = bytemuck::cast_slice(b);
    let out: &mut [E] = bytemuck::cast_slice_mut(out);

    for gy in 0..geometry.groups.y {
        for gx in 0..geometry.groups.x {
            for uy in 0..geometry.group.y {
                for ux in 0..geometry.group.x {
                    let pos = Dim2::new(
                        gx * geometry.group.x + ux,
                        gy * geometry.group.y + uy,
                    );
                    compute_unit(op, pos, a, b, out);
                }
            }
        }
    }
}
