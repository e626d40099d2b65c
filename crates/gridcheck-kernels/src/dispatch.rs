//! Kernel dispatcher.
//!
//! One uniform entry point launches any [`KernelOp`] across a planned
//! geometry. Device limits are checked *before* the launch, not discovered
//! after it, and the dispatcher synchronises before returning so a
//! subsequent download observes completed results.

use crate::device::{DeviceContext, DeviceLimits, LaunchArgs};
use crate::ops::KernelOp;
use crate::plan::Geometry;
use gridcheck_common::{GridError, Result};

/// Validate `geometry` against the device's queried capabilities.
///
/// # Errors
///
/// `GeometryExceedsDeviceLimits` naming the offending axis.
pub fn validate_geometry(geometry: Geometry, limits: &DeviceLimits) -> Result<()> {
    if geometry.groups.x > limits.max_groups.x || geometry.groups.y > limits.max_groups.y {
        return Err(GridError::GeometryExceedsDeviceLimits(format!(
            "group count {}x{} exceeds device maximum {}x{}",
            geometry.groups.x, geometry.groups.y, limits.max_groups.x, limits.max_groups.y
        )));
    }
    if geometry.group.x > limits.max_group.x || geometry.group.y > limits.max_group.y {
        return Err(GridError::GeometryExceedsDeviceLimits(format!(
            "group size {}x{} exceeds device maximum {}x{}",
            geometry.group.x, geometry.group.y, limits.max_group.x, limits.max_group.y
        )));
    }
    if geometry.group.area() > u64::from(limits.max_units_per_group) {
        return Err(GridError::GeometryExceedsDeviceLimits(format!(
            "{} units per group exceeds device maximum {}",
            geometry.group.area(),
            limits.max_units_per_group
        )));
    }
    Ok(())
}

/// Launch `op` across `geometry` on `device` and wait for completion.
///
/// The caller must have uploaded every operand before dispatching; buffer
/// release stays with the owning [`crate::buffer::OperationScope`].
///
/// # Errors
///
/// `GeometryExceedsDeviceLimits` before any launch attempt, or
/// `DispatchFailure` from the device.
pub fn dispatch(
    device: &dyn DeviceContext,
    op: KernelOp,
    geometry: Geometry,
    args: LaunchArgs,
) -> Result<()> {
    validate_geometry(geometry, &device.limits())?;
    debug_assert!(geometry.covers(op.extent()));

    log::debug!(
        "dispatch {} on {}: groups={}x{} group={}x{}",
        op.name(),
        device.name(),
        geometry.groups.x,
        geometry.groups.y,
        geometry.group.x,
        geometry.group.y
    );

    device.launch(op, geometry, args)?;
    // Downloads must not observe partial results.
    device.synchronize()
}
