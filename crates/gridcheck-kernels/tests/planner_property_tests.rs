//! Property tests for geometry planning and boundary safety.
//!
//! 1. **Coverage**: planned geometry always covers the extent per axis.
//! 2. **Minimality**: one fewer group per axis would not cover it.
//! 3. **Boundary safety**: overshoot units never produce an observable
//!    out-of-bounds effect: results match the oracle for every extent and
//!    group size combination.

use gridcheck_common::MatrixProblem;
use gridcheck_kernels::{run_matrix_add, run_vector_add, CpuDevice, DeviceContext, Dim2, Geometry};
use proptest::prelude::*;

proptest! {
    /// `groups * group >= extent` and `(groups - 1) * group < extent`.
    #[test]
    fn prop_1d_geometry_is_minimal_cover(
        extent in 1u32..10_000,
        group in 1u32..1024,
    ) {
        let g = Geometry::plan_1d(extent, group).unwrap();
        prop_assert!(g.covers(Dim2::linear(extent)));
        prop_assert!(
            u64::from(g.groups.x - 1) * u64::from(group) < u64::from(extent),
            "group count {} is not minimal for extent {} group {}",
            g.groups.x, extent, group
        );
    }

    /// Both axes of a 2-D plan satisfy cover and minimality independently.
    #[test]
    fn prop_2d_geometry_is_minimal_cover_per_axis(
        x in 1u32..512,
        y in 1u32..512,
        group in 1u32..64,
    ) {
        let g = Geometry::plan_2d(Dim2::new(x, y), group).unwrap();
        prop_assert!(g.covers(Dim2::new(x, y)));
        prop_assert!(u64::from(g.groups.x - 1) * u64::from(group) < u64::from(x));
        prop_assert!(u64::from(g.groups.y - 1) * u64::from(group) < u64::from(y));
    }

    /// Planning never depends on anything but its inputs.
    #[test]
    fn prop_planning_is_deterministic(extent in 1u32..100_000, group in 1u32..2048) {
        let a = Geometry::plan_1d(extent, group);
        let b = Geometry::plan_1d(extent, group);
        prop_assert_eq!(a.unwrap(), b.unwrap());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Overshooting geometries leave no out-of-bounds trace: the dispatched
    /// result equals the oracle for arbitrary extent/group combinations.
    #[test]
    fn prop_vector_add_boundary_safe(
        len in 1usize..300,
        group in 1u32..64,
    ) {
        let device = CpuDevice::new();
        let a: Vec<i32> = (0..len as i32).collect();
        let b: Vec<i32> = (0..len as i32).map(|i| i * 3).collect();
        let report = run_vector_add(&device, &a, &b, group, 0.0).unwrap();
        prop_assert!(report.passed, "mismatch: {:?}", report.mismatch);
        prop_assert_eq!(device.live_buffers(), 0);
    }

    /// Same property for the 2-D elementwise kernel with non-square shapes.
    #[test]
    fn prop_matrix_add_boundary_safe(
        rows in 1usize..40,
        cols in 1usize..40,
        group in 1u32..17,
    ) {
        let device = CpuDevice::new();
        let shape = MatrixProblem::new(rows, cols).unwrap();
        let a: Vec<i32> = (0..shape.len() as i32).collect();
        let b: Vec<i32> = (0..shape.len() as i32).map(|i| -i).collect();
        let report = run_matrix_add(&device, &a, &b, shape, group, 0.0).unwrap();
        prop_assert!(report.passed, "mismatch: {:?}", report.mismatch);
        prop_assert_eq!(device.live_buffers(), 0);
    }
}
