//! Validated, immutable problem descriptors.
//!
//! Constructors reject degenerate shapes with `InvalidDimension` before any
//! device resource is touched. Descriptors are plain value types and never
//! mutated after construction.

use crate::error::{GridError, Result};

/// A 1-D vector problem of `len` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorProblem {
    len: usize,
}

impl VectorProblem {
    /// # Errors
    ///
    /// Returns `InvalidDimension` if `len` is zero.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(GridError::InvalidDimension("vector length must be >= 1".into()));
        }
        Ok(Self { len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A 2-D row-major matrix of `rows` × `cols` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixProblem {
    rows: usize,
    cols: usize,
}

impl MatrixProblem {
    /// # Errors
    ///
    /// Returns `InvalidDimension` if either extent is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidDimension(format!(
                "matrix extents must be >= 1, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A matrix-multiply problem: `C[m×n] = A[m×k] · B[k×n]`, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulProblem {
    m: usize,
    n: usize,
    k: usize,
}

impl MatmulProblem {
    /// # Errors
    ///
    /// Returns `InvalidDimension` if any dimension is zero.
    pub fn new(m: usize, n: usize, k: usize) -> Result<Self> {
        if m == 0 || n == 0 || k == 0 {
            return Err(GridError::InvalidDimension(format!(
                "matmul dimensions must be >= 1, got m={m}, n={n}, k={k}"
            )));
        }
        Ok(Self { m, n, k })
    }

    /// Build from two operand shapes, rejecting incompatible operands.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` if `a.cols() != b.rows()`. This check runs
    /// before any allocation, so no device resource exists when it fails.
    pub fn from_operands(a: MatrixProblem, b: MatrixProblem) -> Result<Self> {
        if a.cols() != b.rows() {
            return Err(GridError::InvalidDimension(format!(
                "matmul operand mismatch: A is {}x{}, B is {}x{}",
                a.rows(),
                a.cols(),
                b.rows(),
                b.cols()
            )));
        }
        Self::new(a.rows(), b.cols(), a.cols())
    }

    /// Output rows.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Output columns.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Reduction dimension.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Shape of the A operand.
    pub fn a_shape(&self) -> MatrixProblem {
        MatrixProblem { rows: self.m, cols: self.k }
    }

    /// Shape of the B operand.
    pub fn b_shape(&self) -> MatrixProblem {
        MatrixProblem { rows: self.k, cols: self.n }
    }

    /// Shape of the output.
    pub fn out_shape(&self) -> MatrixProblem {
        MatrixProblem { rows: self.m, cols: self.n }
    }
}
