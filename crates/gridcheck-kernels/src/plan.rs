//! Dimension planner: grid/group geometry for 1-D and 2-D launches.
//!
//! A launch is partitioned into a grid of fixed-size execution groups. The
//! planner computes the minimal group count covering the problem extent per
//! axis (ceiling division), independently in x and y, so non-square matrices
//! can use a square group shape.
//!
//! Planning is a pure function of its inputs: no device is needed, and the
//! same inputs always produce the same geometry.

use gridcheck_common::{ceil_div, is_power_of_two, GridError, Result};

/// A two-axis extent. 1-D launches use `y == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim2 {
    pub x: u32,
    pub y: u32,
}

impl Dim2 {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Convenience constructor for 1-D extents.
    pub const fn linear(x: u32) -> Self {
        Self { x, y: 1 }
    }

    /// Total size across both axes.
    pub fn area(self) -> u64 {
        u64::from(self.x) * u64::from(self.y)
    }
}

/// Execution geometry: units per group and groups per grid.
///
/// Invariant, per axis: `groups * group >= extent`, and `groups` is minimal
/// (`(groups - 1) * group < extent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Units per group ("block" in the source terminology).
    pub group: Dim2,
    /// Groups per grid.
    pub groups: Dim2,
}

impl Geometry {
    /// Plan a 1-D launch over `extent` elements with `group_size` units per
    /// group.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` if `extent` or `group_size` is zero.
    pub fn plan_1d(extent: u32, group_size: u32) -> Result<Self> {
        if extent == 0 {
            return Err(GridError::InvalidDimension("extent must be >= 1".into()));
        }
        if group_size == 0 {
            return Err(GridError::InvalidDimension("group size must be >= 1".into()));
        }
        Ok(Self {
            group: Dim2::linear(group_size),
            groups: Dim2::linear(ceil_div(extent, group_size)),
        })
    }

    /// Plan a 2-D launch over `extent` with a square `group_side` ×
    /// `group_side` group, each axis covered independently.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` if any extent or the group side is zero.
    pub fn plan_2d(extent: Dim2, group_side: u32) -> Result<Self> {
        if extent.x == 0 || extent.y == 0 {
            return Err(GridError::InvalidDimension(format!(
                "extents must be >= 1, got {}x{}",
                extent.x, extent.y
            )));
        }
        if group_side == 0 {
            return Err(GridError::InvalidDimension("group size must be >= 1".into()));
        }
        Ok(Self {
            group: Dim2::new(group_side, group_side),
            groups: Dim2::new(ceil_div(extent.x, group_side), ceil_div(extent.y, group_side)),
        })
    }

    /// Plan a 2-D launch whose group side must be a power of two.
    ///
    /// Matrix multiply requires this group shape; elementwise operations
    /// accept any positive group size.
    ///
    /// # Errors
    ///
    /// `InvalidDimension` for zero extents or group side,
    /// `InvalidGroupShape` if `group_side` is not a power of two.
    pub fn plan_2d_pow2(extent: Dim2, group_side: u32) -> Result<Self> {
        if group_side != 0 && !is_power_of_two(group_side) {
            return Err(GridError::InvalidGroupShape(format!(
                "group side must be a power of two, got {group_side}"
            )));
        }
        Self::plan_2d(extent, group_side)
    }

    /// Total number of units launched, including overshoot beyond the
    /// problem extent.
    pub fn total_units(&self) -> u64 {
        self.group.area() * self.groups.area()
    }

    /// Whether this geometry covers `extent` in both axes.
    pub fn covers(&self, extent: Dim2) -> bool {
        u64::from(self.groups.x) * u64::from(self.group.x) >= u64::from(extent.x)
            && u64::from(self.groups.y) * u64::from(self.group.y) >= u64::from(extent.y)
    }
}
