//! Kernel operations and their per-unit compute functions.
//!
//! Each launched unit owns at most one output coordinate and performs no
//! inter-unit communication. The bounds check against the problem extent is
//! mandatory for every operation: group-count × group-size may overshoot
//! the extent, and overshoot units must have no observable effect.

use crate::plan::Dim2;
use gridcheck_common::Element;

/// A kernel operation together with its problem dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelOp {
    /// `out[i] = a[i] + b[i]` for `i < len`.
    VectorAdd { len: u32 },
    /// `out[y*cols+x] = a[y*cols+x] + b[y*cols+x]` for `x < cols`, `y < rows`.
    MatrixAdd { rows: u32, cols: u32 },
    /// Row-major `C[m×n] = A[m×k] · B[k×n]`; unit `(x, y)` computes
    /// `out[y*n+x] = sum_l a[y*k+l] * b[l*n+x]`.
    MatMul { m: u32, n: u32, k: u32 },
}

impl KernelOp {
    /// Problem extent in units (one unit per output element).
    pub fn extent(&self) -> Dim2 {
        match *self {
            KernelOp::VectorAdd { len } => Dim2::linear(len),
            KernelOp::MatrixAdd { rows, cols } => Dim2::new(cols, rows),
            KernelOp::MatMul { m, n, .. } => Dim2::new(n, m),
        }
    }

    /// Required element counts for (a, b, out).
    pub fn operand_lens(&self) -> (usize, usize, usize) {
        match *self {
            KernelOp::VectorAdd { len } => (len as usize, len as usize, len as usize),
            KernelOp::MatrixAdd { rows, cols } => {
                let n = rows as usize * cols as usize;
                (n, n, n)
            }
            KernelOp::MatMul { m, n, k } => (
                m as usize * k as usize,
                k as usize * n as usize,
                m as usize * n as usize,
            ),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            KernelOp::VectorAdd { .. } => "vector_add",
            KernelOp::MatrixAdd { .. } => "matrix_add",
            KernelOp::MatMul { .. } => "matmul",
        }
    }
}

/// Compute function for one unit at global coordinate `pos`.
///
/// Writes at most one element of `out`; out-of-extent coordinates return
/// without writing.
pub fn compute_unit<E: Element>(op: KernelOp, pos: Dim2, a: &[E], b: &[E], out: &mut [E]) {
    match op {
        KernelOp::VectorAdd { len } => {
            if pos.x < len && pos.y == 0 {
                let i = pos.x as usize;
                out[i] = a[i].add(b[i]);
            }
        }
        KernelOp::MatrixAdd { rows, cols } => {
            if pos.x < cols && pos.y < rows {
                let i = pos.y as usize * cols as usize + pos.x as usize;
                out[i] = a[i].add(b[i]);
            }
        }
        KernelOp::MatMul { m, n, k } => {
            if pos.x < n && pos.y < m {
                let (x, y, n, k) = (pos.x as usize, pos.y as usize, n as usize, k as usize);
                let mut acc = E::ZERO;
                for l in 0..k {
                    acc = acc.add(a[y * k + l].mul(b[l * n + x]));
                }
                out[y * n + x] = acc;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_maps_cols_to_x_rows_to_y() {
        let op = KernelOp::MatrixAdd { rows: 3, cols: 7 };
        assert_eq!(op.extent(), Dim2::new(7, 3));
        let op = KernelOp::MatMul { m: 2, n: 5, k: 9 };
        assert_eq!(op.extent(), Dim2::new(5, 2));
    }

    #[test]
    fn operand_lens_for_matmul() {
        let op = KernelOp::MatMul { m: 2, n: 4, k: 3 };
        assert_eq!(op.operand_lens(), (6, 12, 8));
    }

    #[test]
    fn out_of_extent_unit_writes_nothing() {
        let a = [1.0f32; 4];
        let b = [2.0f32; 4];
        let mut out = [f32::NAN; 4];
        compute_unit(KernelOp::VectorAdd { len: 4 }, Dim2::linear(4), &a, &b, &mut out);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn matmul_unit_computes_inner_product() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]]
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [5.0f32, 6.0, 7.0, 8.0];
        let mut out = [0.0f32; 4];
        let op = KernelOp::MatMul { m: 2, n: 2, k: 2 };
        compute_unit(op, Dim2::new(0, 1), &a, &b, &mut out);
        // C[1][0] = 3*5 + 4*7 = 43
        assert_eq!(out, [0.0, 0.0, 43.0, 0.0]);
    }
}
